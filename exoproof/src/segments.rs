use std::{collections::HashMap, hash::Hash};

use crate::{civilization::Civilization, errors::ExoproofInputError};

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ExoproofSegment {
    Literal(String),
    Value(serde_json::Value),
    Variable(String),
}

#[derive(Debug, Clone)]
pub struct ExoproofSegments {
    pub segments: Vec<ExoproofSegment>,
}

impl Hash for ExoproofSegments {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use ExoproofSegment::*;

        for seg in &self.segments {
            match seg {
                Literal(lit) => lit.hash(state),
                Value(_) | Variable(_) => 0.hash(state),
            }
        }
    }
}

impl PartialEq for ExoproofSegments {
    fn eq(&self, other: &Self) -> bool {
        use ExoproofSegment::*;

        if self.segments.len() != other.segments.len() {
            return false;
        }

        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| match a {
                Literal(_) => a == b,
                Value(_) | Variable(_) => matches!(b, Value(_) | Variable(_)),
            })
    }
}

impl Eq for ExoproofSegments {}

impl ExoproofSegments {
    pub fn get_comparison_string(&self) -> String {
        use ExoproofSegment::*;

        self.segments
            .iter()
            .map(|s| match s {
                Literal(l) => l,
                Value(_) | Variable(_) => "{___}",
            })
            .collect()
    }
}

fn has_args_string<V>(args: &HashMap<String, V>) -> String {
    if args.is_empty() {
        "no arguments".to_string()
    } else {
        args.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

pub struct SegmentArgs<'a> {
    args: HashMap<String, &'a serde_json::Value>,
    placeholder_delim: String,
    placeholders: HashMap<String, String>,
}

impl<'a> SegmentArgs<'a> {
    pub fn build(
        reference_instruction: &ExoproofSegments,
        supplied_instruction: &'a ExoproofSegments,
        supplied_args: &'a HashMap<String, serde_json::Value>,
        civ: Option<&Civilization>,
    ) -> Result<SegmentArgs<'a>, ExoproofInputError> {
        let mut args = HashMap::new();

        for (reference, supplied) in reference_instruction
            .segments
            .iter()
            .zip(supplied_instruction.segments.iter())
        {
            let ExoproofSegment::Variable(inst_key) = reference else {
                continue;
            };

            match supplied {
                ExoproofSegment::Value(val) => {
                    args.insert(inst_key.to_owned(), val);
                }
                ExoproofSegment::Variable(var) => {
                    let Some(var_val) = supplied_args.get(var) else {
                        return Err(ExoproofInputError::NonexistentArgument {
                            arg: var.to_string(),
                            has: has_args_string(supplied_args),
                        });
                    };
                    args.insert(inst_key.to_owned(), var_val);
                }
                // Literals line up with literals once the phrases compare equal
                ExoproofSegment::Literal(_) => {}
            }
        }

        let mut placeholders = civ
            .map(|c| c.universe.ctx.params.placeholders.clone())
            .unwrap_or_default();

        if let Some(civ) = civ {
            placeholders.insert(
                "exoproof_process_directory".to_string(),
                civ.universe
                    .ctx
                    .working_directory
                    .to_string_lossy()
                    .into_owned(),
            );
            placeholders.insert(
                "exosphere_base_url".to_string(),
                civ.universe.ctx.params.base_url.clone(),
            );
        }

        Ok(Self {
            args,
            placeholders,
            placeholder_delim: civ
                .map(|c| c.universe.ctx.params.placeholder_delimiter.clone())
                .unwrap_or_default(),
        })
    }

    pub fn get_string(&self, k: impl AsRef<str>) -> Result<String, ExoproofInputError> {
        let Some(value) = self.args.get(k.as_ref()) else {
            return Err(ExoproofInputError::NonexistentArgument {
                arg: k.as_ref().to_string(),
                has: has_args_string(&self.args),
            });
        };

        let mut value = (*value).clone();
        replace_inside_value(&mut value, &self.placeholder_delim, &self.placeholders);

        let found = match value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
            Value::String(st) => return Ok(st),
        };

        Err(ExoproofInputError::IncorrectArgumentType {
            arg: k.as_ref().to_string(),
            was: found.to_string(),
            expected: "string".to_string(),
        })
    }

    /// Like [`SegmentArgs::get_string`], but rejects an empty string.
    pub fn get_required_string(&self, k: impl AsRef<str>) -> Result<String, ExoproofInputError> {
        let value = self.get_string(k.as_ref())?;
        if value.is_empty() {
            return Err(ExoproofInputError::ArgumentRequiresValue {
                arg: k.as_ref().to_string(),
            });
        }
        Ok(value)
    }
}

fn replace_inside_value(value: &mut Value, delim: &str, placeholders: &HashMap<String, String>) {
    use Value::*;

    if delim.is_empty() {
        return;
    }

    match value {
        Null | Bool(_) | Number(_) => {}
        Value::String(s) => {
            if s.contains(delim) {
                for (placeholder, value) in placeholders.iter() {
                    let matcher = format!("{delim}{placeholder}{delim}");

                    if s.contains(&matcher) {
                        *s = s.replace(&matcher, value);
                    }
                }
            }
        }
        Value::Array(vals) => {
            vals.iter_mut().for_each(|v| {
                replace_inside_value(v, delim, placeholders);
            });
        }
        Value::Object(o) => {
            o.values_mut().for_each(|v| {
                replace_inside_value(v, delim, placeholders);
            });
        }
    }
}
