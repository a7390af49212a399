use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use console::style;

use crate::{
    civilization::Civilization,
    definitions::wait_for_breakpoint,
    errors::{ExoproofInputError, ExoproofStepError, ExoproofTestError},
    segments::SegmentArgs,
    universe::Universe,
    ExoproofTestFile, ExoproofTestStep, ExoproofTestStepState,
};

/// Runs one scenario in its own browser window.
pub async fn run_exoproof_scenario(
    input: &mut ExoproofTestFile,
    universe: Arc<Universe>,
) -> Result<(), ExoproofTestError> {
    run_scenario_with(input, Civilization::new(universe)).await
}

async fn run_scenario_with(
    input: &mut ExoproofTestFile,
    mut civ: Civilization,
) -> Result<(), ExoproofTestError> {
    let res = run_exoproof_steps(&mut input.steps, &mut civ).await;

    if res.is_err() {
        if let (Some(window), Some(screenshot_target)) = (
            civ.window.as_ref(),
            &civ.universe.ctx.params.failure_screenshot_location,
        ) {
            let filename = format!(
                "{}-{}.webp",
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default(),
                input.file_path.replace(|c: char| !c.is_alphanumeric(), "-")
            );
            let abs_screenshot_target = civ.universe.ctx.working_directory.join(screenshot_target);
            let filepath = abs_screenshot_target.join(filename);
            if std::fs::create_dir_all(&abs_screenshot_target).is_ok()
                && window.screenshot(filepath.clone()).await.is_ok()
            {
                input.failure_screenshot = Some(filepath);
            }
        }
    }

    civ.shutdown().await;

    res
}

pub async fn run_exoproof_steps(
    steps: &mut [ExoproofTestStep],
    civ: &mut Civilization,
) -> Result<(), ExoproofTestError> {
    for cur_step in steps.iter_mut() {
        let marked_base_step = cur_step.clone();
        let marked_base_args = cur_step.args_pretty();

        let mark_and_return_step_error =
            |e: ExoproofStepError, state: &mut ExoproofTestStepState| {
                *state = ExoproofTestStepState::Failed;
                ExoproofTestError {
                    err: e,
                    step: marked_base_step.clone(),
                    arg_str: marked_base_args.clone(),
                }
            };

        let ExoproofTestStep {
            step, args, state, ..
        } = cur_step;

        let Some((reference_segments, instruction)) =
            civ.universe.instructions.get_key_value(&*step)
        else {
            return Err(mark_and_return_step_error(
                ExoproofStepError::External(ExoproofInputError::NonexistentStep),
                state,
            ));
        };
        let instruction = *instruction;

        let instruction_args = SegmentArgs::build(reference_segments, &*step, &*args, Some(&*civ))
            .map_err(|e| mark_and_return_step_error(e.into(), state))?;

        if civ.breakpoints {
            wait_for_breakpoint(&format!("before: {marked_base_step}"))
                .await
                .map_err(|e| mark_and_return_step_error(e, state))?;
        }

        if civ.universe.ctx.params.verbose {
            println!("{}", style(format!("  ↳ {marked_base_step}")).dim());
        }

        instruction
            .run(&instruction_args, civ)
            .await
            .map_err(|e| mark_and_return_step_error(e, state))?;

        *state = ExoproofTestStepState::Passed;
    }

    Ok(())
}

/// Parses and runs a single phrase, as if it were a one-step scenario.
#[cfg(test)]
pub async fn run_phrase(phrase: &str, civ: &mut Civilization) -> Result<(), ExoproofTestError> {
    let mut steps = vec![crate::parser::parse_step(
        phrase.to_string(),
        std::collections::HashMap::new(),
    )
    .map_err(|e| {
        ExoproofTestError {
            err: e.into(),
            step: ExoproofTestStep::unparsed(phrase),
            arg_str: String::new(),
        }
    })?];

    run_exoproof_steps(&mut steps, civ).await
}

#[cfg(test)]
mod test {
    use std::collections::{BTreeMap, HashMap};
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    use crate::definitions::browser::fake::fake_civilization;
    use crate::definitions::browser::resolver::role_and_label_xpath;
    use crate::options::{ExoproofContext, ExoproofParams};
    use crate::parser::parse_file;

    use super::*;

    const SCENARIO: &str = r#"
name: Create an instance
steps:
  - I go to Exosphere
  - I click the "Create" button
  - step: I click the {which} button
    which: Instance
"#;

    #[tokio::test]
    async fn test_running_steps_marks_state() {
        let (mut civ, window) = fake_civilization(ExoproofParams::default());
        let create = window.add_element(&role_and_label_xpath("button", "Create"), "Create");
        let instance = window.add_element(&role_and_label_xpath("button", "Instance"), "Instance");

        let mut file = parse_file(SCENARIO, PathBuf::from("create.exoproof.yml")).unwrap();
        run_exoproof_steps(&mut file.steps, &mut civ)
            .await
            .expect("scenario passes");

        assert!(file
            .steps
            .iter()
            .all(|s| s.state == ExoproofTestStepState::Passed));
        assert_eq!(create.clicks.load(Ordering::SeqCst), 1);
        assert_eq!(instance.clicks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_step_stops_the_scenario() {
        let (mut civ, window) = fake_civilization(ExoproofParams::default());
        let instance = window.add_element(&role_and_label_xpath("button", "Instance"), "Instance");

        let mut file = parse_file(SCENARIO, PathBuf::from("create.exoproof.yml")).unwrap();
        let err = run_exoproof_steps(&mut file.steps, &mut civ)
            .await
            .expect_err("scenario fails");

        assert_eq!(err.step.orig, "I click the \"Create\" button");
        assert_eq!(file.steps[0].state, ExoproofTestStepState::Passed);
        assert_eq!(file.steps[1].state, ExoproofTestStepState::Failed);
        assert_eq!(file.steps[2].state, ExoproofTestStepState::Dormant);
        assert_eq!(instance.clicks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_steps() {
        let (mut civ, _window) = fake_civilization(ExoproofParams::default());

        let err = run_phrase("I double click the \"Create\" button", &mut civ)
            .await
            .expect_err("step fails");

        assert!(matches!(
            err.err,
            ExoproofStepError::External(ExoproofInputError::NonexistentStep)
        ));
    }

    #[tokio::test]
    async fn test_missing_step_arguments() {
        let (mut civ, _window) = fake_civilization(ExoproofParams::default());

        let err = run_phrase("I click the {label} button", &mut civ)
            .await
            .expect_err("step fails");

        assert!(matches!(
            err.err,
            ExoproofStepError::External(ExoproofInputError::NonexistentArgument { .. })
        ));
        assert_eq!(err.step.state, ExoproofTestStepState::Dormant);
    }

    #[tokio::test]
    async fn test_failed_scenario_screenshots_and_closes_its_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = ExoproofParams::default();
        params.failure_screenshot_location = Some(dir.path().to_path_buf());
        let (civ, window) = fake_civilization(params);

        let mut file = parse_file(
            "name: Broken\nsteps:\n  - I click the \"Missing\" button\n",
            PathBuf::from("broken.exoproof.yml"),
        )
        .unwrap();

        let res = run_scenario_with(&mut file, civ).await;
        assert!(res.is_err());

        let screenshot = file.failure_screenshot.expect("screenshot was taken");
        assert!(screenshot.starts_with(dir.path()));
        assert!(screenshot.exists());
        assert_eq!(window.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_passing_scenario_closes_its_window() {
        let (civ, window) = fake_civilization(ExoproofParams::default());

        let mut file = parse_file(
            "name: Enable\nsteps:\n  - I enable breakpoints\n",
            PathBuf::from("enable.exoproof.yml"),
        )
        .unwrap();
        // Breakpoints only pause before later steps, so this does not block.
        run_scenario_with(&mut file, civ).await.expect("scenario passes");

        assert!(file.failure_screenshot.is_none());
        assert_eq!(window.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scenario_without_a_window_skips_the_screenshot() {
        let ctx = ExoproofContext::load(ExoproofParams::default()).unwrap();
        let universe = Arc::new(Universe::new(BTreeMap::new(), HashMap::new(), ctx));

        let mut file = parse_file(
            "name: Unknown\nsteps:\n  - I do something unusual\n",
            PathBuf::from("unknown.exoproof.yml"),
        )
        .unwrap();

        let err = run_exoproof_scenario(&mut file, universe)
            .await
            .expect_err("scenario fails");
        assert!(matches!(
            err.err,
            ExoproofStepError::External(ExoproofInputError::NonexistentStep)
        ));
        assert!(file.failure_screenshot.is_none());
    }
}
