//! An in-memory page for exercising steps without launching Chrome.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{BrowserElement, BrowserHandle, ElementList};
use crate::civilization::Civilization;
use crate::definitions::register_instructions;
use crate::errors::{ExoproofInternalError, ExoproofStepError};
use crate::options::{ExoproofContext, ExoproofParams};
use crate::universe::Universe;

#[derive(Default)]
pub struct FakeNode {
    pub text: String,
    pub clicks: AtomicUsize,
    pub value: Mutex<String>,
}

impl FakeNode {
    pub fn value(&self) -> String {
        self.value.lock().unwrap().clone()
    }
}

struct FakeElement(Arc<FakeNode>);

#[async_trait]
impl BrowserElement for FakeElement {
    async fn text(&self) -> Result<String, ExoproofStepError> {
        Ok(self.0.text.clone())
    }

    async fn click(&self) -> Result<(), ExoproofStepError> {
        self.0.clicks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fill(&self, value: &str) -> Result<(), ExoproofStepError> {
        *self.0.value.lock().unwrap() = value.to_string();
        Ok(())
    }
}

/// Elements are registered against the exact XPath a step will query.
#[derive(Default)]
pub struct FakeWindow {
    elements: Mutex<HashMap<String, Vec<Arc<FakeNode>>>>,
    rejected: Mutex<HashMap<String, String>>,
    pub local_storage: Mutex<HashMap<String, String>>,
    pub visited: Mutex<Vec<String>>,
    pub scripts: Mutex<Vec<String>>,
    pub reloads: AtomicUsize,
    pub closed: AtomicUsize,
}

impl FakeWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&self, xpath: &str, text: &str) -> Arc<FakeNode> {
        let node = Arc::new(FakeNode {
            text: text.to_string(),
            ..FakeNode::default()
        });
        self.elements
            .lock()
            .unwrap()
            .entry(xpath.to_string())
            .or_default()
            .push(Arc::clone(&node));
        node
    }

    /// Makes queries for `xpath` fail the way the browser's evaluator would.
    pub fn reject_xpath(&self, xpath: &str, message: &str) {
        self.rejected
            .lock()
            .unwrap()
            .insert(xpath.to_string(), message.to_string());
    }

    pub fn set_local_storage(&self, key: &str, value: &str) {
        self.local_storage
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn get_local_storage(&self, key: &str) -> Option<String> {
        self.local_storage.lock().unwrap().get(key).cloned()
    }
}

/// Reads the JSON-literal arguments out of `localStorage.<method>(...)`.
fn storage_call_args(js: &str, method: &str) -> Option<Vec<String>> {
    let inner = js
        .trim()
        .strip_prefix(&format!("localStorage.{method}("))?
        .strip_suffix(')')?;
    serde_json::from_str(&format!("[{inner}]")).ok()
}

#[async_trait]
impl BrowserHandle for FakeWindow {
    async fn navigate(&self, url: &str) -> Result<(), ExoproofStepError> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn find_by_xpath(
        &self,
        xpath: &str,
        _wait_time: Option<Duration>,
    ) -> Result<ElementList, ExoproofStepError> {
        if let Some(message) = self.rejected.lock().unwrap().get(xpath) {
            return Err(ExoproofStepError::Internal(ExoproofInternalError::Custom {
                msg: message.clone(),
            }));
        }

        let nodes = self
            .elements
            .lock()
            .unwrap()
            .get(xpath)
            .cloned()
            .unwrap_or_default();

        Ok(ElementList::new(
            xpath,
            nodes
                .into_iter()
                .map(|n| Box::new(FakeElement(n)) as Box<dyn BrowserElement>)
                .collect(),
        ))
    }

    async fn evaluate_script(&self, js: &str) -> Result<serde_json::Value, ExoproofStepError> {
        self.scripts.lock().unwrap().push(js.to_string());

        if let Some(args) = storage_call_args(js, "getItem") {
            return Ok(self
                .get_local_storage(&args[0])
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null));
        }

        if let Some(args) = storage_call_args(js, "setItem") {
            self.set_local_storage(&args[0], &args[1]);
            return Ok(serde_json::Value::Null);
        }

        Err(ExoproofStepError::Internal(ExoproofInternalError::Custom {
            msg: format!("fake window cannot evaluate {js}"),
        }))
    }

    async fn reload(&self) -> Result<(), ExoproofStepError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn screenshot(&self, filepath: PathBuf) -> Result<(), ExoproofStepError> {
        std::fs::write(filepath, b"").map_err(ExoproofInternalError::from)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ExoproofStepError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A scenario context with a fake page already open.
pub fn fake_civilization(params: ExoproofParams) -> (Civilization, Arc<FakeWindow>) {
    let ctx = ExoproofContext::load(params).expect("context loads");
    let universe = Universe::new(Default::default(), register_instructions(), ctx);

    let window = Arc::new(FakeWindow::new());
    let mut civ = Civilization::new(Arc::new(universe));
    civ.window = Some(Arc::clone(&window) as Arc<dyn BrowserHandle>);

    (civ, window)
}
