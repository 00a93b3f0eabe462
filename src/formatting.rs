// src/formatting.rs

use crate::core::{Alert, AlertBatch, RenderedMessage};
use crate::errors::RenderError;
use std::fmt::Write;

/// A trait for rendering an alert batch into a single SMS body.
pub trait MessageFormatter: Send + Sync {
    fn render(&self, batch: &AlertBatch) -> Result<RenderedMessage, RenderError>;
}

/// The plain text layout used for SMS:
///
/// ```text
/// Status: firing
/// <summary>: <description>
/// ```
///
/// Text is copied verbatim, SMS bodies are not HTML.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmsTextFormatter;

impl SmsTextFormatter {
    fn format_line(&self, out: &mut String, alert: &Alert) -> std::fmt::Result {
        writeln!(
            out,
            "{}: {}",
            alert.annotations.summary, alert.annotations.description
        )
    }
}

impl MessageFormatter for SmsTextFormatter {
    fn render(&self, batch: &AlertBatch) -> Result<RenderedMessage, RenderError> {
        let mut out = String::new();
        writeln!(out, "Status: {}", batch.status).map_err(|e| RenderError(e.to_string()))?;
        for alert in &batch.alerts {
            self.format_line(&mut out, alert)
                .map_err(|e| RenderError(e.to_string()))?;
        }
        Ok(RenderedMessage::new(out))
    }
}
