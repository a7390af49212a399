use console::style;

use crate::{ExoproofTestStep, ExoproofTestStepState};

pub fn log_step_runs(steps: &[ExoproofTestStep]) {
    for step in steps {
        use ExoproofTestStepState::*;

        println!(
            "{}",
            match step.state {
                Dormant => style(format!("⦸ {step}")).dim(),
                Failed => style(format!("✘ {step}")).red(),
                Passed => style(format!("✓ {step}")).green(),
            }
        );
    }
}
