use std::{collections::HashMap, path::PathBuf};

use path_slash::PathExt;
use serde_json::{Map, Value};

use crate::{
    errors::ExoproofInputError,
    segments::{ExoproofSegment, ExoproofSegments},
    ExoproofTestFile, ExoproofTestStep, ExoproofTestStepState,
};

struct ExoproofTestInput {
    parsed: RawExoproofTestFile,
    file_path: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct RawExoproofTestFile {
    name: String,
    steps: Vec<RawExoproofTestStep>,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum RawExoproofTestStep {
    BareStep(String),
    StepWithParams {
        step: String,
        #[serde(flatten)]
        other: Map<String, Value>,
    },
}

impl TryFrom<ExoproofTestInput> for ExoproofTestFile {
    type Error = ExoproofInputError;

    fn try_from(value: ExoproofTestInput) -> Result<Self, Self::Error> {
        let mut steps = Vec::with_capacity(value.parsed.steps.len());
        for step in value.parsed.steps {
            steps.push(step.try_into()?);
        }

        Ok(ExoproofTestFile {
            name: value.parsed.name,
            steps,
            file_path: value.file_path,
            failure_screenshot: None,
        })
    }
}

impl TryFrom<RawExoproofTestStep> for ExoproofTestStep {
    type Error = ExoproofInputError;

    fn try_from(value: RawExoproofTestStep) -> Result<Self, Self::Error> {
        match value {
            RawExoproofTestStep::BareStep(step) => parse_step(step, HashMap::new()),
            RawExoproofTestStep::StepWithParams { step, other } => {
                parse_step(step, HashMap::from_iter(other.into_iter()))
            }
        }
    }
}

pub fn parse_step(
    step: String,
    args: HashMap<String, Value>,
) -> Result<ExoproofTestStep, ExoproofInputError> {
    Ok(ExoproofTestStep {
        step: parse_segments(&step)?,
        args,
        orig: step,
        state: ExoproofTestStepState::Dormant,
    })
}

pub fn parse_file(s: &str, p: PathBuf) -> Result<ExoproofTestFile, ExoproofInputError> {
    let raw_test = serde_yaml::from_str::<RawExoproofTestFile>(s)?;

    ExoproofTestInput {
        parsed: raw_test,
        file_path: p.to_slash_lossy().into_owned(),
    }
    .try_into()
}

/// Splits a phrase into lowercased literals, quoted values, and `{variables}`.
/// Phrases compare equal when their literals match, see [`ExoproofSegments`].
pub fn parse_segments(s: &str) -> Result<ExoproofSegments, ExoproofInputError> {
    let mut segments = vec![];
    use ExoproofSegment::*;

    enum InstMode {
        None(usize),
        InQuote(usize, char),
        InCurly(usize),
    }

    let mut mode = InstMode::None(0);

    for (i, c) in s.char_indices() {
        match &mut mode {
            InstMode::None(start) => match c {
                '"' => {
                    segments.push(Literal(s[*start..i].to_lowercase()));
                    mode = InstMode::InQuote(i, '"');
                }
                '\'' => {
                    segments.push(Literal(s[*start..i].to_lowercase()));
                    mode = InstMode::InQuote(i, '\'');
                }
                '{' => {
                    segments.push(Literal(s[*start..i].to_lowercase()));
                    mode = InstMode::InCurly(i);
                }
                _ => {}
            },
            InstMode::InQuote(start, quote) => {
                if c == *quote {
                    let inner_start = *start + 1;
                    segments.push(Value(serde_json::Value::String(
                        s[inner_start..i].to_string(),
                    )));
                    mode = InstMode::None(i + 1);
                }
            }
            InstMode::InCurly(start) => {
                if c == '}' {
                    let inner_start = *start + 1;
                    segments.push(Variable(s[inner_start..i].to_string()));
                    mode = InstMode::None(i + 1);
                }
            }
        }
    }

    match mode {
        InstMode::None(start) => {
            if start < s.len() {
                segments.push(Literal(s[start..].to_lowercase()));
            }
        }
        InstMode::InQuote(_, q) => return Err(ExoproofInputError::UnclosedValue { expected: q }),
        InstMode::InCurly(_) => return Err(ExoproofInputError::UnclosedValue { expected: '}' }),
    }

    Ok(ExoproofSegments { segments })
}
