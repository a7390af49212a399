use async_trait::async_trait;

use crate::civilization::Civilization;
use crate::errors::ExoproofStepError;

use super::browser::resolver::{self, Pick};
use super::browser::BrowserHandle;
use super::{ExoproofInstruction, SegmentArgs};

pub const INSTRUCTIONS: &[&dyn ExoproofInstruction] = &[
    &navigation::GoToExosphere,
    &forms::FillInputLabeled,
    &forms::EnterTaccCredentials,
    &buttons::ClickButton,
    &buttons::ClickLastButton,
    &buttons::PressLastXpath,
    &buttons::ClickCheckbox,
    &buttons::ClickRadio,
];

mod navigation {
    use super::*;

    pub struct GoToExosphere;

    #[async_trait]
    impl ExoproofInstruction for GoToExosphere {
        fn segments(&self) -> &'static str {
            "I go to Exosphere"
        }

        async fn run(
            &self,
            _args: &SegmentArgs<'_>,
            civ: &mut Civilization,
        ) -> Result<(), ExoproofStepError> {
            let window = civ.ensure_window().await?;

            window.navigate(&civ.universe.ctx.params.base_url).await
        }
    }
}

mod forms {
    use super::*;

    async fn fill_input_labeled(
        window: &dyn BrowserHandle,
        label: &str,
        value: &str,
    ) -> Result<(), ExoproofStepError> {
        resolver::find_input_by_label(window, label, None)
            .await?
            .first()?
            .fill(value)
            .await
    }

    pub struct FillInputLabeled;

    #[async_trait]
    impl ExoproofInstruction for FillInputLabeled {
        fn segments(&self) -> &'static str {
            "I fill input labeled {label} with {value}"
        }

        async fn run(
            &self,
            args: &SegmentArgs<'_>,
            civ: &mut Civilization,
        ) -> Result<(), ExoproofStepError> {
            let label = args.get_string("label")?;
            let value = args.get_string("value")?;

            fill_input_labeled(civ.window()?.as_ref(), &label, &value).await
        }
    }

    pub struct EnterTaccCredentials;

    #[async_trait]
    impl ExoproofInstruction for EnterTaccCredentials {
        fn segments(&self) -> &'static str {
            "I enter TACC credentials"
        }

        async fn run(
            &self,
            _args: &SegmentArgs<'_>,
            civ: &mut Civilization,
        ) -> Result<(), ExoproofStepError> {
            let params = &civ.universe.ctx.params;
            let username = params.tacc_username.clone().unwrap_or_default();
            let password = params.tacc_password.clone().unwrap_or_default();

            let window = civ.window()?;
            fill_input_labeled(window.as_ref(), "TACC Username", &username).await?;
            fill_input_labeled(window.as_ref(), "TACC Password", &password).await
        }
    }
}

mod buttons {
    use crate::errors::ExoproofTestFailure;

    use super::*;

    async fn click_labelled_button(
        window: &dyn BrowserHandle,
        label: &str,
        pick: Pick,
    ) -> Result<(), ExoproofStepError> {
        let candidates = resolver::find_button_with_label(window, label, None).await?;

        resolver::select_labelled(label, &candidates, pick)
            .await?
            .click()
            .await
    }

    pub struct ClickButton;

    #[async_trait]
    impl ExoproofInstruction for ClickButton {
        fn segments(&self) -> &'static str {
            "I click the {label} button"
        }

        async fn run(
            &self,
            args: &SegmentArgs<'_>,
            civ: &mut Civilization,
        ) -> Result<(), ExoproofStepError> {
            let label = args.get_string("label")?;

            click_labelled_button(civ.window()?.as_ref(), &label, Pick::First).await
        }
    }

    pub struct ClickLastButton;

    #[async_trait]
    impl ExoproofInstruction for ClickLastButton {
        fn segments(&self) -> &'static str {
            "I click the last {label} button"
        }

        async fn run(
            &self,
            args: &SegmentArgs<'_>,
            civ: &mut Civilization,
        ) -> Result<(), ExoproofStepError> {
            let label = args.get_string("label")?;

            click_labelled_button(civ.window()?.as_ref(), &label, Pick::Last).await
        }
    }

    pub struct PressLastXpath;

    #[async_trait]
    impl ExoproofInstruction for PressLastXpath {
        fn segments(&self) -> &'static str {
            "I press the last element with xpath {xpath}"
        }

        async fn run(
            &self,
            args: &SegmentArgs<'_>,
            civ: &mut Civilization,
        ) -> Result<(), ExoproofStepError> {
            let xpath = args.get_required_string("xpath")?;

            let window = civ.window()?;
            let elements = window.find_by_xpath(&xpath, None).await?;
            if elements.is_empty() {
                return Err(ExoproofTestFailure::Custom {
                    msg: "Element not found".to_string(),
                }
                .into());
            }

            elements.last()?.click().await
        }
    }

    pub struct ClickCheckbox;

    #[async_trait]
    impl ExoproofInstruction for ClickCheckbox {
        fn segments(&self) -> &'static str {
            "I click the {label} checkbox"
        }

        async fn run(
            &self,
            args: &SegmentArgs<'_>,
            civ: &mut Civilization,
        ) -> Result<(), ExoproofStepError> {
            let label = args.get_string("label")?;

            resolver::find_checkbox_with_label(civ.window()?.as_ref(), &label, None)
                .await?
                .first()?
                .click()
                .await
        }
    }

    pub struct ClickRadio;

    #[async_trait]
    impl ExoproofInstruction for ClickRadio {
        fn segments(&self) -> &'static str {
            "I click the {label} radio button"
        }

        async fn run(
            &self,
            args: &SegmentArgs<'_>,
            civ: &mut Civilization,
        ) -> Result<(), ExoproofStepError> {
            let label = args.get_string("label")?;

            resolver::find_radio_with_label(civ.window()?.as_ref(), &label, None)
                .await?
                .first()?
                .click()
                .await
        }
    }
}
