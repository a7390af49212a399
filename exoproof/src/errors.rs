use std::fmt::Display;

use chromiumoxide::error::CdpError;
use thiserror::Error;

use crate::ExoproofTestStep;

#[derive(Error, Debug)]
pub enum ExoproofInputError {
    #[error("Failed to parse scenario file: {inner}")]
    ParseError {
        #[from]
        inner: serde_yaml::Error,
    },
    #[error("Path {input} is not valid")]
    InvalidPath { input: String },
    #[error("Unclosed value, expected a closing {expected}")]
    UnclosedValue { expected: char },
    #[error("Step does not exist")]
    NonexistentStep,
    #[error("Argument \"{arg}\" was not supplied. This step has {has}")]
    NonexistentArgument { arg: String, has: String },
    #[error("Argument \"{arg}\" expected a value of type {expected} but was {was}")]
    IncorrectArgumentType {
        arg: String,
        was: String,
        expected: String,
    },
    #[error("Argument \"{arg}\" requires a value")]
    ArgumentRequiresValue { arg: String },
    #[error("Scenario name \"{name}\" is used by both {path_one} and {path_two}")]
    DuplicateName {
        path_one: String,
        path_two: String,
        name: String,
    },
    #[error("Step requirements were not met: {reason}")]
    StepRequirementsNotMet { reason: String },
}

#[derive(Error, Debug)]
pub enum ExoproofInternalError {
    #[error("{msg}")]
    Custom { msg: String },
    #[error("Browser error: {0}")]
    Chrome(#[from] CdpError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExoproofTestFailure {
    #[error("{msg}")]
    Custom { msg: String },
    #[error("No element found for {descriptor}")]
    ElementNotFound { descriptor: String },
}

#[derive(Error, Debug)]
pub enum ExoproofStepError {
    #[error("{0}")]
    External(#[from] ExoproofInputError),
    #[error("{0}")]
    Internal(#[from] ExoproofInternalError),
    #[error("{0}")]
    Assertion(#[from] ExoproofTestFailure),
}

impl From<CdpError> for ExoproofStepError {
    fn from(e: CdpError) -> Self {
        ExoproofStepError::Internal(e.into())
    }
}

#[derive(Debug)]
pub struct ExoproofTestError {
    pub err: ExoproofStepError,
    pub step: ExoproofTestStep,
    pub arg_str: String,
}

impl Display for ExoproofTestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.arg_str.is_empty() {
            write!(f, "Failed step: {}\n{}", self.step, self.err)
        } else {
            write!(
                f,
                "Failed step: {}\nArguments:\n{}\n{}",
                self.step,
                self.arg_str.trim_end(),
                self.err
            )
        }
    }
}

impl std::error::Error for ExoproofTestError {}
