use std::sync::Arc;

use console::style;

use crate::{
    definitions::browser::{BrowserHandle, BrowserTester},
    errors::{ExoproofInputError, ExoproofStepError},
    local_storage::LocalStorageBridge,
    universe::Universe,
};

/// State for a single running scenario.
pub struct Civilization {
    pub window: Option<Arc<dyn BrowserHandle>>,
    /// Pause before each remaining step of the scenario
    pub breakpoints: bool,
    pub universe: Arc<Universe>,
}

impl Civilization {
    pub fn new(universe: Arc<Universe>) -> Self {
        Self {
            window: None,
            breakpoints: false,
            universe,
        }
    }

    /// The page opened by an earlier step.
    pub fn window(&self) -> Result<Arc<dyn BrowserHandle>, ExoproofStepError> {
        self.window.clone().ok_or_else(|| {
            ExoproofStepError::External(ExoproofInputError::StepRequirementsNotMet {
                reason: "no page has been loaded into the browser for this scenario".into(),
            })
        })
    }

    /// The scenario's page, launching the browser and opening a window if needed.
    pub async fn ensure_window(&mut self) -> Result<Arc<dyn BrowserHandle>, ExoproofStepError> {
        if let Some(window) = &self.window {
            return Ok(Arc::clone(window));
        }

        let params = &self.universe.ctx.params;
        let browser = self
            .universe
            .browser
            .get_or_try_init(|| BrowserTester::initialize(params))
            .await?;

        let window: Arc<dyn BrowserHandle> = Arc::new(browser.get_window().await?);
        self.window = Some(Arc::clone(&window));
        Ok(window)
    }

    pub fn local_storage(&self) -> LocalStorageBridge {
        LocalStorageBridge::new(self.universe.ctx.local_storage_dir.clone())
    }

    pub async fn shutdown(&mut self) {
        if let Some(window) = self.window.take() {
            if let Err(e) = window.close().await {
                eprintln!("{}", style(format!("Failed to close browser window: {e}")).yellow());
            }
        }
    }
}
