use async_trait::async_trait;
use console::style;

use crate::civilization::Civilization;
use crate::errors::{ExoproofInternalError, ExoproofStepError};

use super::{ExoproofInstruction, SegmentArgs};

pub const INSTRUCTIONS: &[&dyn ExoproofInstruction] = &[&PauseForBreakpoint, &EnableBreakpoints];

/// Blocks until Enter is pressed, so the page can be inspected mid-scenario.
pub async fn wait_for_breakpoint(reason: &str) -> Result<(), ExoproofStepError> {
    println!(
        "{}",
        style(format!("----\nPaused {reason}\nPress Enter to continue\n----"))
            .yellow()
            .bold()
    );

    tokio::task::spawn_blocking(|| console::Term::stdout().read_line())
        .await
        .map_err(|e| ExoproofInternalError::Custom {
            msg: format!("Breakpoint was interrupted: {e}"),
        })?
        .map_err(ExoproofInternalError::from)?;

    Ok(())
}

pub struct PauseForBreakpoint;

#[async_trait]
impl ExoproofInstruction for PauseForBreakpoint {
    fn segments(&self) -> &'static str {
        "I pause for a breakpoint"
    }

    async fn run(
        &self,
        _args: &SegmentArgs<'_>,
        _civ: &mut Civilization,
    ) -> Result<(), ExoproofStepError> {
        wait_for_breakpoint("for a breakpoint").await
    }
}

pub struct EnableBreakpoints;

#[async_trait]
impl ExoproofInstruction for EnableBreakpoints {
    fn segments(&self) -> &'static str {
        "I enable breakpoints"
    }

    async fn run(
        &self,
        _args: &SegmentArgs<'_>,
        civ: &mut Civilization,
    ) -> Result<(), ExoproofStepError> {
        civ.breakpoints = true;
        Ok(())
    }
}
