//! The extraction client: narrative in, validated health record out.
//!
//! One chat round trip per call. The model gets the fixed extraction
//! instruction, the narrative, and exactly one declared callable; the
//! response must contain a matching tool invocation or the call fails.
//! No retries, no caching, no free-text fallback.

use serde_json::Value;

use crate::ollama::{
    ChatMessage, ChatRequest, ClientError, GenerationOptions, LlmClient, ToolCall,
};
use crate::record::{HealthRecord, MalformedArguments};
use crate::schema::{extraction_tool, EXTRACTION_SYSTEM_INSTRUCTION, EXTRACT_TOOL_NAME};

/// Errors raised by [`HealthExtractor::extract`]. No variant carries a
/// partial record; on failure the caller has nothing to display.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The model answered without invoking the declared callable.
    #[error("The model failed to structure the data correctly for saving.")]
    MissingToolCall,

    /// The model invoked the callable with arguments that were not a
    /// JSON object.
    #[error("The model returned unusable data for this narrative.")]
    MalformedToolArguments(#[from] MalformedArguments),

    /// The call to the model server could not complete. The underlying
    /// cause is logged and preserved as the source; the display message
    /// stays generic.
    #[error("Failed to communicate with the model to process data.")]
    TransportFailure(#[from] ClientError),
}

/// Single-shot extraction client. Holds the injected transport and the
/// model it drives; no other state survives between calls.
pub struct HealthExtractor {
    llm: Box<dyn LlmClient + Send + Sync>,
    model: String,
}

impl HealthExtractor {
    pub fn new(llm: Box<dyn LlmClient + Send + Sync>, model: &str) -> Self {
        Self {
            llm,
            model: model.to_string(),
        }
    }

    /// Extract a structured health record from one patient narrative.
    ///
    /// Exactly one outbound call. The first tool invocation named
    /// `extract_health_data` wins; any further calls are ignored. The
    /// winning arguments pass through the validating parse in
    /// [`crate::record`], which repairs field-level problems with
    /// sentinels and logs one warning per repair.
    pub fn extract(&self, narrative: &str) -> Result<HealthRecord, ExtractionError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(EXTRACTION_SYSTEM_INSTRUCTION),
                ChatMessage::user(format!("Patient Narrative: {narrative}")),
            ],
            tools: vec![extraction_tool()],
            stream: false,
            options: Some(GenerationOptions::deterministic()),
        };

        tracing::info!(
            model = %self.model,
            narrative_chars = narrative.len(),
            "Requesting extraction"
        );

        let response = self.llm.chat(&request).map_err(|e| {
            tracing::error!(error = %e, "Extraction call failed");
            ExtractionError::TransportFailure(e)
        })?;

        let arguments = first_matching_call(&response.message.tool_calls)
            .ok_or_else(|| {
                tracing::warn!(
                    tool_calls = response.message.tool_calls.len(),
                    content_chars = response.message.content.len(),
                    "Response carried no matching tool invocation"
                );
                ExtractionError::MissingToolCall
            })?;

        let parsed = HealthRecord::from_tool_args(arguments)?;
        for warning in &parsed.warnings {
            tracing::warn!(warning = %warning, "Repaired extraction field");
        }
        tracing::info!(
            meals = parsed.record.meals.len(),
            symptoms = parsed.record.symptoms.len(),
            repairs = parsed.warnings.len(),
            "Extraction complete"
        );

        Ok(parsed.record)
    }
}

/// First-match policy: the first invocation of the declared callable is
/// the candidate record; the rest are counted and ignored.
fn first_matching_call(calls: &[ToolCall]) -> Option<&Value> {
    let mut matching = calls
        .iter()
        .filter(|call| call.function.name == EXTRACT_TOOL_NAME);
    let first = matching.next()?;
    let ignored = matching.count();
    if ignored > 0 {
        tracing::debug!(ignored, "Ignoring extra tool invocations");
    }
    Some(&first.function.arguments)
}
