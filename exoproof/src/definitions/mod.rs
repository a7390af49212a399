use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    civilization::Civilization,
    errors::ExoproofStepError,
    parser::parse_segments,
    segments::{ExoproofSegments, SegmentArgs},
};

pub mod browser;
mod debugging;
mod exosphere;
mod local_storage;

pub use debugging::wait_for_breakpoint;

/// A step handler, generally starting with "I ..."
#[async_trait]
pub trait ExoproofInstruction: Sync {
    fn segments(&self) -> &'static str;
    async fn run(
        &self,
        args: &SegmentArgs<'_>,
        civ: &mut Civilization,
    ) -> Result<(), ExoproofStepError>;
}

fn builtin_instructions() -> impl Iterator<Item = &'static dyn ExoproofInstruction> {
    exosphere::INSTRUCTIONS
        .iter()
        .chain(local_storage::INSTRUCTIONS)
        .chain(debugging::INSTRUCTIONS)
        .copied()
}

/// Builds the table the runner matches scenario steps against.
pub fn register_instructions() -> HashMap<ExoproofSegments, &'static dyn ExoproofInstruction> {
    let mut table = HashMap::new();

    for instruction in builtin_instructions() {
        let segments =
            parse_segments(instruction.segments()).expect("builtin instructions should be parseable");
        let existing = table.insert(segments, instruction);
        assert!(
            existing.is_none(),
            "builtin instruction \"{}\" collides with another instruction",
            instruction.segments()
        );
    }

    table
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_every_builtin_is_registered() {
        let all_instructions = register_instructions();
        assert_eq!(all_instructions.len(), builtin_instructions().count());
    }

    #[test]
    fn test_getting_an_instruction() {
        let all_instructions = register_instructions();

        for (phrase, expected) in [
            ("I go to Exosphere", "I go to Exosphere"),
            ("I click the \"Create\" button", "I click the {label} button"),
            ("I click the last 'Delete' button", "I click the last {label} button"),
            ("I click the \"m3.tiny\" radio button", "I click the {label} radio button"),
            ("I click the \"Public\" checkbox", "I click the {label} checkbox"),
            (
                "I fill input labeled \"Name\" with {name}",
                "I fill input labeled {label} with {value}",
            ),
            (
                "i delete \"session\" browser local storage item file",
                "I delete {item} browser local storage item file",
            ),
        ] {
            let users_instruction = parse_segments(phrase).expect("Valid instruction");
            let matching_instruction = all_instructions
                .get(&users_instruction)
                .unwrap_or_else(|| panic!("should be able to retrieve {phrase}"));

            assert_eq!(matching_instruction.segments(), expected);
        }
    }

    #[test]
    fn test_unknown_instruction() {
        let all_instructions = register_instructions();
        let users_instruction =
            parse_segments("I double click the \"Create\" button").expect("Valid instruction");

        assert!(all_instructions.get(&users_instruction).is_none());
    }
}
