use std::collections::{BTreeMap, HashMap};

use tokio::sync::OnceCell;

use crate::{
    definitions::{browser::BrowserTester, ExoproofInstruction},
    options::ExoproofContext,
    segments::ExoproofSegments,
    ExoproofTestFile,
};

/// Everything shared by every scenario in a run.
pub struct Universe {
    pub browser: OnceCell<BrowserTester>,
    pub tests: BTreeMap<String, ExoproofTestFile>,
    pub instructions: HashMap<ExoproofSegments, &'static dyn ExoproofInstruction>,
    pub instruction_comparisons: Vec<String>,
    pub ctx: ExoproofContext,
}

impl Universe {
    pub fn new(
        tests: BTreeMap<String, ExoproofTestFile>,
        instructions: HashMap<ExoproofSegments, &'static dyn ExoproofInstruction>,
        ctx: ExoproofContext,
    ) -> Self {
        let instruction_comparisons = instructions
            .keys()
            .map(|k| k.get_comparison_string())
            .collect();

        Self {
            browser: OnceCell::new(),
            tests,
            instructions,
            instruction_comparisons,
            ctx,
        }
    }
}
