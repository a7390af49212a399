use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use crate::errors::{
    ExoproofInternalError, ExoproofStepError, ExoproofTestFailure,
};
use crate::options::ExoproofParams;

mod browser_specific;
#[cfg(test)]
pub mod fake;
pub mod resolver;

/// A live page that steps can query and drive.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ExoproofStepError>;

    /// Runs `xpath` against the current DOM, polling until something matches
    /// or `wait_time` elapses. `None` uses the window's default wait.
    /// An empty list is not an error, but a malformed expression is.
    async fn find_by_xpath(
        &self,
        xpath: &str,
        wait_time: Option<Duration>,
    ) -> Result<ElementList, ExoproofStepError>;

    async fn evaluate_script(&self, js: &str) -> Result<serde_json::Value, ExoproofStepError>;

    async fn reload(&self) -> Result<(), ExoproofStepError>;

    async fn screenshot(&self, filepath: PathBuf) -> Result<(), ExoproofStepError>;

    async fn close(&self) -> Result<(), ExoproofStepError>;
}

#[async_trait]
pub trait BrowserElement: Send + Sync {
    /// Rendered text of the element, trimmed.
    async fn text(&self) -> Result<String, ExoproofStepError>;

    async fn click(&self) -> Result<(), ExoproofStepError>;

    /// Replaces the element's current value with `value`.
    async fn fill(&self, value: &str) -> Result<(), ExoproofStepError>;
}

/// The elements matched by one XPath query, in document order.
pub struct ElementList {
    pub xpath: String,
    pub elements: Vec<Box<dyn BrowserElement>>,
}

impl ElementList {
    pub fn new(xpath: impl Into<String>, elements: Vec<Box<dyn BrowserElement>>) -> Self {
        Self {
            xpath: xpath.into(),
            elements,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn get(&self, index: usize) -> Option<&dyn BrowserElement> {
        self.elements.get(index).map(|e| e.as_ref())
    }

    pub fn first(&self) -> Result<&dyn BrowserElement, ExoproofStepError> {
        self.get(0).ok_or_else(|| self.not_found())
    }

    pub fn last(&self) -> Result<&dyn BrowserElement, ExoproofStepError> {
        self.len()
            .checked_sub(1)
            .and_then(|i| self.get(i))
            .ok_or_else(|| self.not_found())
    }

    fn not_found(&self) -> ExoproofStepError {
        ExoproofTestFailure::ElementNotFound {
            descriptor: format!("xpath {}", self.xpath),
        }
        .into()
    }
}

/// Quotes `s` as an XPath string literal.
pub fn escape_xpath_string(s: &str) -> String {
    if s.contains('\'') {
        // If string contains single quotes, split on them and wrap with xpath's concat()
        let parts: Vec<_> = s.split('\'').collect();
        format!("concat('{}')", parts.join("',\"'\",'"))
    } else {
        format!("'{}'", s)
    }
}

/// Quotes `s` as a JavaScript string literal.
pub fn escape_js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// The shared Chrome process. Each scenario gets its own browser context.
pub struct BrowserTester {
    browser: Arc<Browser>,
    element_wait: Duration,
    _event_thread: JoinHandle<()>,
    _profile_dir: TempDir,
}

async fn try_launch_browser(
    params: &ExoproofParams,
    profile_dir: &TempDir,
    mut max: usize,
) -> Result<(Browser, chromiumoxide::Handler), ExoproofStepError> {
    let mut launch = Err(CdpError::NotFound);
    while launch.is_err() && max > 0 {
        max -= 1;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir.path())
            .viewport(Some(Viewport {
                width: 1600,
                height: 900,
                device_scale_factor: Some(2.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            }));
        builder = if params.headed {
            builder.with_head()
        } else {
            builder.headless_mode(HeadlessMode::New)
        };

        let config = builder.build().map_err(|msg| {
            ExoproofStepError::Internal(ExoproofInternalError::Custom {
                msg: format!("Invalid browser configuration: {msg}"),
            })
        })?;

        launch = Browser::launch(config).await;
    }

    launch.map_err(|e| {
        ExoproofStepError::Internal(ExoproofInternalError::Custom {
            msg: format!("Failed to launch browser due to error: {e}"),
        })
    })
}

impl BrowserTester {
    pub async fn initialize(params: &ExoproofParams) -> Result<Self, ExoproofStepError> {
        let profile_dir = tempfile::tempdir().map_err(ExoproofInternalError::from)?;
        let (browser, mut handler) = try_launch_browser(params, &profile_dir, 3).await?;

        Ok(BrowserTester {
            browser: Arc::new(browser),
            element_wait: Duration::from_secs(params.timeout),
            _event_thread: tokio::task::spawn(async move {
                while handler.next().await.is_some() {}
            }),
            _profile_dir: profile_dir,
        })
    }

    pub async fn get_window(&self) -> Result<ChromeWindow, ExoproofStepError> {
        let context = self
            .browser
            .create_browser_context(CreateBrowserContextParams {
                dispose_on_detach: Some(true),
                proxy_server: None,
                proxy_bypass_list: None,
                origins_with_universal_network_access: None,
            })
            .await?;
        let page = self
            .browser
            .new_page(CreateTargetParams {
                url: "about:blank".to_string(),
                for_tab: None,
                width: None,
                height: None,
                browser_context_id: Some(context),
                enable_begin_frame_control: None,
                new_window: None,
                background: None,
            })
            .await?;

        Ok(ChromeWindow {
            page,
            element_wait: self.element_wait,
        })
    }
}

pub struct ChromeWindow {
    page: chromiumoxide::Page,
    element_wait: Duration,
}

#[async_trait]
impl BrowserHandle for ChromeWindow {
    async fn navigate(&self, url: &str) -> Result<(), ExoproofStepError> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn find_by_xpath(
        &self,
        xpath: &str,
        wait_time: Option<Duration>,
    ) -> Result<ElementList, ExoproofStepError> {
        let elements = browser_specific::wait_for_chrome_xpath_selectors(
            &self.page,
            xpath,
            wait_time.unwrap_or(self.element_wait),
        )
        .await?;

        Ok(ElementList::new(
            xpath,
            elements
                .into_iter()
                .map(|element| Box::new(ChromeElement { element }) as Box<dyn BrowserElement>)
                .collect(),
        ))
    }

    async fn evaluate_script(&self, js: &str) -> Result<serde_json::Value, ExoproofStepError> {
        let res = self.page.evaluate(js.to_string()).await?;
        Ok(res.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn reload(&self) -> Result<(), ExoproofStepError> {
        self.page.reload().await?;
        Ok(())
    }

    async fn screenshot(&self, filepath: PathBuf) -> Result<(), ExoproofStepError> {
        let image_format = browser_specific::chrome_image_format(&filepath)?;

        self.page
            .save_screenshot(
                ScreenshotParams {
                    cdp_params: CaptureScreenshotParams {
                        format: Some(image_format),
                        ..CaptureScreenshotParams::default()
                    },
                    full_page: Some(false),
                    omit_background: Some(false),
                },
                filepath,
            )
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ExoproofStepError> {
        self.page.clone().close().await?;
        Ok(())
    }
}

// Clearing fires `input` so listeners such as Elm's onInput see the empty value.
const CLEAR_VALUE_JS: &str =
    "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }";

pub struct ChromeElement {
    element: chromiumoxide::element::Element,
}

#[async_trait]
impl BrowserElement for ChromeElement {
    async fn text(&self) -> Result<String, ExoproofStepError> {
        let text = self.element.inner_text().await?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn click(&self) -> Result<(), ExoproofStepError> {
        self.element.click().await.map_err(|e| {
            ExoproofStepError::Assertion(ExoproofTestFailure::Custom {
                msg: format!("Element could not be clicked: {e}"),
            })
        })?;
        Ok(())
    }

    async fn fill(&self, value: &str) -> Result<(), ExoproofStepError> {
        self.click().await?;
        self.element.call_js_fn(CLEAR_VALUE_JS, false).await?;
        self.element.type_str(value).await.map_err(|e| {
            ExoproofStepError::Assertion(ExoproofTestFailure::Custom {
                msg: format!("Element could not be filled: {e}"),
            })
        })?;
        Ok(())
    }
}
