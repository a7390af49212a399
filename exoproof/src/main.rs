use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use console::style;
use futures::future::join_all;
use normalize_path::NormalizePath;
use similar_string::compare_similarity;
use tokio::fs::read_to_string;
use wax::Glob;

use crate::definitions::register_instructions;
use crate::errors::{ExoproofInputError, ExoproofStepError, ExoproofTestError};
use crate::logging::log_step_runs;
use crate::options::configure;
use crate::parser::parse_file;
use crate::runner::run_exoproof_scenario;
use crate::segments::ExoproofSegments;
use crate::universe::Universe;

mod civilization;
mod definitions;
mod errors;
mod local_storage;
mod logging;
mod options;
mod parser;
mod runner;
mod segments;
mod universe;

#[derive(Debug, Clone)]
pub struct ExoproofTestFile {
    pub name: String,
    pub steps: Vec<ExoproofTestStep>,
    pub file_path: String,
    pub failure_screenshot: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExoproofTestStepState {
    Dormant,
    Failed,
    Passed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExoproofTestStep {
    pub step: ExoproofSegments,
    pub args: HashMap<String, serde_json::Value>,
    pub orig: String,
    pub state: ExoproofTestStepState,
}

impl Display for ExoproofTestStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.orig)
    }
}

impl ExoproofTestStep {
    /// Stands in for a phrase that failed to parse, for error reporting.
    #[cfg(test)]
    pub fn unparsed(orig: &str) -> Self {
        Self {
            step: ExoproofSegments { segments: vec![] },
            args: HashMap::new(),
            orig: orig.to_string(),
            state: ExoproofTestStepState::Dormant,
        }
    }

    pub fn args_pretty(&self) -> String {
        if self.args.is_empty() {
            return String::new();
        }

        serde_yaml::to_string(&self.args).unwrap_or_default()
    }
}

fn closest_strings<'o>(target: &str, options: &'o [String]) -> Vec<(&'o String, f64)> {
    let mut scores = options
        .iter()
        .map(|s| (s, compare_similarity(target, s)))
        .collect::<Vec<_>>();

    scores.sort_by(|a, b| b.1.total_cmp(&a.1));

    scores
}

fn log_closest_instructions(universe: &Universe, step: &ExoproofTestStep) {
    let comparator = step.step.get_comparison_string();

    eprintln!(
        "Unable to resolve: \"{}\"\nInstruction \"{}\" was not found.",
        style(&step.orig).red(),
        style(&comparator).yellow(),
    );

    let matches = closest_strings(&comparator, &universe.instruction_comparisons)
        .into_iter()
        .enumerate()
        .filter(|(i, (_, score))| !((*i > 5 && *score < 0.6) || (*i > 0 && *score < 0.4)))
        .filter_map(|(_, (s, _))| {
            universe
                .instructions
                .iter()
                .find(|(segments, _)| segments.get_comparison_string() == *s)
                .map(|(_, instruction)| format!("• {}", style(instruction.segments()).cyan()))
        })
        .collect::<Vec<_>>();

    if matches.is_empty() {
        eprintln!("{}", style("No similar instructions found").red());
    } else {
        eprintln!("Closest instructions:\n{}", matches.join("\n"));
    }
}

fn log_result(
    universe: &Universe,
    file: &ExoproofTestFile,
    res: &Result<(), ExoproofTestError>,
    started_at: Instant,
) {
    let dur = if universe.ctx.params.porcelain {
        "".to_string()
    } else {
        let e = started_at.elapsed();
        format!("[{}.{:03}s] ", e.as_secs(), e.subsec_millis())
    };

    let Err(e) = res else {
        println!("{}", style(format!("✓ {dur}{}", file.name)).green());
        return;
    };

    println!("{}", style(format!("✘ {dur}{}", file.name)).red().bold());
    println!("{}", style("--- STEPS ---").on_yellow().bold());
    log_step_runs(&file.steps);
    println!("{}", style("--- ERROR ---").on_yellow().bold());

    match &e.err {
        ExoproofStepError::External(ExoproofInputError::NonexistentStep) => {
            log_closest_instructions(universe, &e.step);
        }
        _ => println!("{}", style(e).red()),
    }

    if let Some(screenshot) = &file.failure_screenshot {
        println!(
            "{}",
            style(format!("Screenshot saved to {}", screenshot.display())).yellow()
        );
    }
}

async fn main_inner() -> Result<(), ()> {
    let ctx = configure();

    let start = Instant::now();

    let glob = Glob::new("**/*.exoproof.yml").expect("Valid glob");
    let walker = glob
        .walk(ctx.params.root.clone().unwrap_or(".".into()))
        .flatten();

    let loaded_files = walker
        .map(|entry| {
            let file = entry.path().to_path_buf();
            async { (file.clone(), read_to_string(file).await) }
        })
        .collect::<Vec<_>>();

    let files = join_all(loaded_files).await;

    let mut names_thus_far: Vec<(String, String)> = vec![];

    let mut errors = vec![];
    let all_tests: BTreeMap<_, _> = files
        .into_iter()
        .filter_map(|(p, i)| {
            let contents = match i {
                Ok(contents) => contents,
                Err(e) => {
                    eprintln!("Failed to read {}: {e}", p.display());
                    errors.push(ExoproofInputError::InvalidPath {
                        input: p.to_string_lossy().to_string(),
                    });
                    return None;
                }
            };
            let test_file = match parse_file(&contents, p.clone()) {
                Ok(f) => {
                    if let Some((_, other_path)) = names_thus_far.iter().find(|(n, _)| *n == f.name)
                    {
                        errors.push(ExoproofInputError::DuplicateName {
                            path_one: other_path.to_string(),
                            path_two: p.to_string_lossy().to_string(),
                            name: f.name.clone(),
                        });
                        return None;
                    }
                    names_thus_far.push((f.name.clone(), p.to_string_lossy().to_string()));
                    f
                }
                Err(e) => {
                    errors.push(e);
                    return None;
                }
            };
            Some((p.normalize().to_string_lossy().into_owned(), test_file))
        })
        .collect();

    if !errors.is_empty() {
        eprintln!("Exoproof failed to parse some files:");
        for e in errors {
            eprintln!("  • {e}");
        }
        return Err(());
    }

    let universe = Arc::new(Universe::new(all_tests, register_instructions(), ctx));

    let selected: Vec<ExoproofTestFile> = match &universe.ctx.params.run_name {
        Some(name) => universe
            .tests
            .values()
            .filter(|t| &t.name == name)
            .cloned()
            .collect(),
        None => universe.tests.values().cloned().collect(),
    };

    if let (Some(name), true) = (&universe.ctx.params.run_name, selected.is_empty()) {
        eprintln!("{}", style(format!("No scenario named \"{name}\" was found")).red());
        return Err(());
    }

    println!("\n{}\n", style("Running scenarios").bold());

    let mut passing = 0;
    let mut failing = 0;

    // Scenarios share the local storage directory, so they run one at a time.
    for mut test in selected {
        let started_at = Instant::now();
        let res = run_exoproof_scenario(&mut test, Arc::clone(&universe)).await;
        log_result(&universe, &test, &res, started_at);

        match res {
            Ok(()) => passing += 1,
            Err(_) => failing += 1,
        }
    }

    println!("\n{}\n", style("Finished running scenarios").bold());

    let duration = start.elapsed();
    let duration = if universe.ctx.params.porcelain {
        "".to_string()
    } else {
        format!(
            " in {}.{:03} seconds",
            duration.as_secs(),
            duration.subsec_millis()
        )
    };

    println!(
        "{}\n{}",
        style(format!("Passing scenarios: {}", passing)).cyan(),
        style(format!("Failing scenarios: {}", failing)).cyan(),
    );

    if failing > 0 {
        println!(
            "{}",
            style(format!("\nSome scenarios failed{}", duration)).red()
        );
        return Err(());
    }

    println!(
        "{}",
        style(format!("\nAll scenarios passed{}", duration)).green()
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    match main_inner().await {
        Ok(_) => std::process::exit(0),
        Err(_) => std::process::exit(1),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_closest_strings_are_sorted() {
        let options = vec![
            "i save the {___} item in browser local storage".to_string(),
            "i click the {___} button".to_string(),
            "i click the last {___} button".to_string(),
        ];

        let scores = closest_strings("i clik the {___} button", &options);

        assert_eq!(scores[0].0, "i click the {___} button");
        assert!(scores.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_args_pretty() {
        let step = parser::parse_step("I click the {label} button".to_string(), HashMap::new())
            .expect("Valid step");
        assert_eq!(step.args_pretty(), "");

        let step = parser::parse_step(
            "I click the {label} button".to_string(),
            HashMap::from([("label".to_string(), serde_json::json!("Create"))]),
        )
        .expect("Valid step");
        assert_eq!(step.args_pretty().trim(), "label: Create");
    }
}
