//! Turns human-readable labels into the elements a step acts on.
//!
//! Lookups match label text as a substring, so "Create" also finds
//! "Create Server". [`select_labelled`] narrows a candidate list back down:
//! exact text beats case-insensitive text, which beats any substring match.

use std::time::Duration;

use super::{escape_xpath_string, BrowserElement, BrowserHandle, ElementList};
use crate::errors::{ExoproofStepError, ExoproofTestFailure};

/// Which end of the document-ordered candidates to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    First,
    Last,
}

pub fn label_xpath(label: &str, element_type: &str) -> String {
    format!(
        "//label[contains(string(),{})]//{element_type}",
        escape_xpath_string(label)
    )
}

pub fn role_and_label_xpath(role: &str, label: &str) -> String {
    format!(
        "//div[@role={}]//div[contains(string(), {})]",
        escape_xpath_string(role),
        escape_xpath_string(label)
    )
}

// The checkbox sits inside a label holding the text, while the radio holds
// the text itself.
pub fn checkbox_xpath(label: &str) -> String {
    format!(
        "//label[contains(string(), {})]//div[@role='checkbox']",
        escape_xpath_string(label)
    )
}

pub fn radio_xpath(label: &str) -> String {
    format!(
        "//div[@role='radio' and contains(string(), {})]",
        escape_xpath_string(label)
    )
}

pub async fn find_by_label(
    window: &dyn BrowserHandle,
    label: &str,
    element_type: &str,
    wait_time: Option<Duration>,
) -> Result<ElementList, ExoproofStepError> {
    window
        .find_by_xpath(&label_xpath(label, element_type), wait_time)
        .await
}

pub async fn find_input_by_label(
    window: &dyn BrowserHandle,
    label: &str,
    wait_time: Option<Duration>,
) -> Result<ElementList, ExoproofStepError> {
    find_by_label(window, label, "input", wait_time).await
}

pub async fn find_element_with_role_and_label(
    window: &dyn BrowserHandle,
    role: &str,
    label: &str,
    wait_time: Option<Duration>,
) -> Result<ElementList, ExoproofStepError> {
    window
        .find_by_xpath(&role_and_label_xpath(role, label), wait_time)
        .await
}

pub async fn find_button_with_label(
    window: &dyn BrowserHandle,
    label: &str,
    wait_time: Option<Duration>,
) -> Result<ElementList, ExoproofStepError> {
    find_element_with_role_and_label(window, "button", label, wait_time).await
}

pub async fn find_checkbox_with_label(
    window: &dyn BrowserHandle,
    label: &str,
    wait_time: Option<Duration>,
) -> Result<ElementList, ExoproofStepError> {
    window.find_by_xpath(&checkbox_xpath(label), wait_time).await
}

pub async fn find_radio_with_label(
    window: &dyn BrowserHandle,
    label: &str,
    wait_time: Option<Duration>,
) -> Result<ElementList, ExoproofStepError> {
    window.find_by_xpath(&radio_xpath(label), wait_time).await
}

/// Picks the index of the element whose text best matches `label`.
///
/// Returns `None` only when `texts` is empty.
pub fn disambiguate<S: AsRef<str>>(label: &str, texts: &[S], pick: Pick) -> Option<usize> {
    let upper_label = label.to_uppercase();

    let exact: Vec<usize> = texts
        .iter()
        .enumerate()
        .filter(|(_, t)| t.as_ref() == label)
        .map(|(i, _)| i)
        .collect();
    let case_insensitive: Vec<usize> = texts
        .iter()
        .enumerate()
        .filter(|(_, t)| t.as_ref().to_uppercase() == upper_label)
        .map(|(i, _)| i)
        .collect();

    let preferred = if exact.is_empty() {
        case_insensitive
    } else {
        exact
    };

    match (pick, preferred.is_empty()) {
        (Pick::First, false) => preferred.first().copied(),
        (Pick::Last, false) => preferred.last().copied(),
        (Pick::First, true) if !texts.is_empty() => Some(0),
        (Pick::Last, true) => texts.len().checked_sub(1),
        _ => None,
    }
}

/// Chooses one element of `candidates` for `label`, see [`disambiguate`].
pub async fn select_labelled<'c>(
    label: &str,
    candidates: &'c ElementList,
    pick: Pick,
) -> Result<&'c dyn BrowserElement, ExoproofStepError> {
    let mut texts = Vec::with_capacity(candidates.len());
    for element in &candidates.elements {
        texts.push(element.text().await?);
    }

    disambiguate(label, &texts, pick)
        .and_then(|i| candidates.get(i))
        .ok_or_else(|| {
            ExoproofTestFailure::ElementNotFound {
                descriptor: format!("label '{label}' ({})", candidates.xpath),
            }
            .into()
        })
}
