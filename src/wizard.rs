// src/wizard.rs
//! The four-step guided flow: pick a photo, pick a style, wait, view.

use crate::client::{StudioClient, encode_image, validate_image_file};
use crate::errors::StudioError;
use crate::models::{MakeupStyle, ProcessingResult};
use log::{info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Upload,
    Style,
    Processing,
    Result,
}

/// A local image that already passed type and size checks.
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub path: PathBuf,
    pub format: &'static str,
    pub bytes: Vec<u8>,
}

impl SelectedImage {
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<Self, StudioError> {
        let path = path.into();
        let format = validate_image_file(&path, bytes.len() as u64)?;
        Ok(Self {
            path,
            format,
            bytes,
        })
    }

    pub async fn load(path: &Path) -> Result<Self, StudioError> {
        let size = tokio::fs::metadata(path).await?.len();
        validate_image_file(path, size)?;
        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(path, bytes)
    }
}

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("cannot {action} during the {step:?} step")]
    InvalidTransition {
        action: &'static str,
        step: WizardStep,
    },

    #[error("{0} has not been selected")]
    Missing(&'static str),

    #[error(transparent)]
    Request(#[from] StudioError),
}

#[derive(Debug)]
pub struct Wizard {
    step: WizardStep,
    image: Option<SelectedImage>,
    style: Option<MakeupStyle>,
    result: Option<ProcessingResult>,
    error: Option<String>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Upload,
            image: None,
            style: None,
            result: None,
            error: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn image(&self) -> Option<&SelectedImage> {
        self.image.as_ref()
    }

    pub fn style(&self) -> Option<&MakeupStyle> {
        self.style.as_ref()
    }

    pub fn result(&self) -> Option<&ProcessingResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn expect_step(&self, expected: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WizardError::InvalidTransition {
                action,
                step: self.step,
            })
        }
    }

    pub fn select_image(&mut self, image: SelectedImage) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Upload, "select an image")?;
        self.image = Some(image);
        self.error = None;
        self.step = WizardStep::Style;
        Ok(())
    }

    pub fn remove_image(&mut self) -> Result<(), WizardError> {
        if self.step == WizardStep::Processing {
            return Err(WizardError::InvalidTransition {
                action: "remove the image",
                step: self.step,
            });
        }
        self.clear();
        Ok(())
    }

    pub fn select_style(&mut self, style: MakeupStyle) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Style, "select a style")?;
        self.style = Some(style);
        self.error = None;
        Ok(())
    }

    pub fn begin_processing(&mut self) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Style, "start processing")?;
        if self.image.is_none() {
            return Err(WizardError::Missing("An image"));
        }
        if self.style.is_none() {
            return Err(WizardError::Missing("A style"));
        }
        self.error = None;
        self.step = WizardStep::Processing;
        Ok(())
    }

    pub fn complete(&mut self, result: ProcessingResult) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Processing, "complete")?;
        self.result = Some(result);
        self.step = WizardStep::Result;
        Ok(())
    }

    /// Back to style selection, keeping the image and recording the error.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Processing, "fail")?;
        self.error = Some(error.into());
        self.step = WizardStep::Style;
        Ok(())
    }

    pub fn try_another_style(&mut self) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Result, "try another style")?;
        self.clear();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        *self = Self::new();
    }

    /// Uploads the selected image and applies the selected style.
    pub async fn run(&mut self, client: &StudioClient) -> Result<&ProcessingResult, WizardError> {
        self.begin_processing()?;
        let (Some(image), Some(style)) = (&self.image, &self.style) else {
            return Err(WizardError::Missing("An image and a style"));
        };

        info!("Uploading {} for style {}", image.path.display(), style.id);
        let outcome = async {
            let uploaded = client
                .upload_image(encode_image(&image.bytes), image.format)
                .await?;
            client.apply_style(&uploaded.id, &style.id).await
        }
        .await;

        match outcome {
            Ok(result) => {
                self.complete(result)?;
                self.result
                    .as_ref()
                    .ok_or(WizardError::Missing("A result"))
            }
            Err(e) => {
                warn!("Makeup application failed: {}", e);
                self.fail(format!("Failed to apply makeup. Please try again. ({})", e))?;
                Err(e.into())
            }
        }
    }
}
