use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;

use super::escape_js_string;
use crate::errors::{ExoproofInputError, ExoproofStepError};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn chrome_image_format(filepath: &Path) -> Result<CaptureScreenshotFormat, ExoproofStepError> {
    match filepath.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            match ext.as_str() {
                "png" => Ok(CaptureScreenshotFormat::Png),
                "webp" => Ok(CaptureScreenshotFormat::Webp),
                "jpg" | "jpeg" => Ok(CaptureScreenshotFormat::Jpeg),
                _ => Err(ExoproofStepError::External(
                    ExoproofInputError::StepRequirementsNotMet {
                        reason: "Image file extension must be png, webp, jpeg, or jpg".to_string(),
                    },
                )),
            }
        }
        None => Err(ExoproofStepError::External(
            ExoproofInputError::StepRequirementsNotMet {
                reason: "Image file path must have an extension".to_string(),
            },
        )),
    }
}

/// Polls `xpath` until it matches something or `wait` runs out.
/// Whatever matched on the final attempt is returned, possibly nothing.
///
/// A malformed expression fails straight away with Chrome's own error.
pub async fn wait_for_chrome_xpath_selectors(
    page: &chromiumoxide::Page,
    xpath: &str,
    wait: Duration,
) -> Result<Vec<chromiumoxide::element::Element>, ExoproofStepError> {
    page.evaluate(format!(
        "void document.createExpression({})",
        escape_js_string(xpath)
    ))
    .await?;

    Ok(poll_for_matches(wait, || page.find_xpaths(xpath)).await)
}

async fn poll_for_matches<T, E, F, Fut>(wait: Duration, mut attempt: F) -> Vec<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let start = Instant::now();
    loop {
        if let Ok(found) = attempt().await {
            if !found.is_empty() {
                return found;
            }
        }
        if start.elapsed() >= wait {
            return vec![];
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
