use async_trait::async_trait;

use crate::civilization::Civilization;
use crate::errors::{ExoproofStepError, ExoproofTestFailure};

use super::browser::escape_js_string;
use super::{ExoproofInstruction, SegmentArgs};

pub const INSTRUCTIONS: &[&dyn ExoproofInstruction] = &[
    &SaveLocalStorageItem,
    &LoadLocalStorageItem,
    &DeleteLocalStorageItemFile,
];

pub struct SaveLocalStorageItem;

#[async_trait]
impl ExoproofInstruction for SaveLocalStorageItem {
    fn segments(&self) -> &'static str {
        "I save the {item} item in browser local storage"
    }

    async fn run(
        &self,
        args: &SegmentArgs<'_>,
        civ: &mut Civilization,
    ) -> Result<(), ExoproofStepError> {
        let item = args.get_required_string("item")?;

        let value = civ
            .window()?
            .evaluate_script(&format!("localStorage.getItem({})", escape_js_string(&item)))
            .await?;

        let serde_json::Value::String(content) = value else {
            return Err(ExoproofTestFailure::Custom {
                msg: format!("Item '{item}' does not exist in browser local storage"),
            }
            .into());
        };

        civ.local_storage().save(&item, &content).await
    }
}

pub struct LoadLocalStorageItem;

#[async_trait]
impl ExoproofInstruction for LoadLocalStorageItem {
    fn segments(&self) -> &'static str {
        "I load the {item} item in browser local storage"
    }

    async fn run(
        &self,
        args: &SegmentArgs<'_>,
        civ: &mut Civilization,
    ) -> Result<(), ExoproofStepError> {
        let item = args.get_required_string("item")?;
        let content = civ.local_storage().load(&item).await?;

        let window = civ.window()?;
        window
            .evaluate_script(&format!(
                "localStorage.setItem({}, {})",
                escape_js_string(&item),
                escape_js_string(&content)
            ))
            .await?;
        window.reload().await
    }
}

pub struct DeleteLocalStorageItemFile;

#[async_trait]
impl ExoproofInstruction for DeleteLocalStorageItemFile {
    fn segments(&self) -> &'static str {
        "I delete {item} browser local storage item file"
    }

    async fn run(
        &self,
        args: &SegmentArgs<'_>,
        civ: &mut Civilization,
    ) -> Result<(), ExoproofStepError> {
        let item = args.get_required_string("item")?;

        civ.local_storage().delete(&item).await
    }
}
