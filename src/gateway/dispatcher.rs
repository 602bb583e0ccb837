use std::sync::Arc;

use serde_json::Value;

use crate::gateway::{
    backend::{BackendCallError, GenerateOptions, GenerativeBackend, GroundingTool},
    sanitizer::InputSanitizer,
    types::{
        ActionKind, EstimateTimePayload, GenerateNotesPayload, GenerateTextPayload,
        GroundedTextPayload, ModelRoster, SummarizeDocumentPayload,
    },
};

/// Failure modes of a dispatch, before response normalization.
#[derive(Debug)]
pub enum DispatchError {
    /// The action validates but has no dispatcher behavior.
    NotImplemented(ActionKind),
    /// The payload did not match the action's typed shape.
    Payload(serde_json::Error),
    /// The backend call itself failed.
    Backend(BackendCallError),
}

/// Maps each implemented action to one backend call: typed payload parse,
/// sanitization of the designated fields, model tier selection, and
/// action-specific generation options.
pub struct ActionDispatcher {
    backend: Arc<dyn GenerativeBackend>,
    models: ModelRoster,
    sanitizer: InputSanitizer,
    thinking_budget: u32,
}

impl ActionDispatcher {
    pub fn new(backend: Arc<dyn GenerativeBackend>, models: ModelRoster, thinking_budget: u32) -> Self {
        Self {
            backend,
            models,
            sanitizer: InputSanitizer,
            thinking_budget,
        }
    }

    /// Dispatches one action and returns the backend's raw response. The
    /// match is exhaustive over the closed action set, so adding a variant
    /// forces a decision here.
    pub async fn invoke(&self, action: ActionKind, payload: Value) -> Result<Value, DispatchError> {
        match action {
            ActionKind::GenerateText => {
                let payload: GenerateTextPayload = parse(payload)?;
                let prompt = self.sanitizer.clean(&payload.prompt);
                self.generate(&self.models.fast, &prompt, GenerateOptions::default())
                    .await
            }
            ActionKind::SummarizeDocument => {
                let payload: SummarizeDocumentPayload = parse(payload)?;
                let content = self.sanitizer.clean(&payload.content);
                let contents = format!(
                    "Summarize the following document for a student. Capture the key \
                     points and main arguments.\n\n{content}"
                );
                self.generate(
                    &self.models.deep,
                    &contents,
                    self.thinking_options(payload.enable_thinking),
                )
                .await
            }
            ActionKind::GenerateNotes => {
                let payload: GenerateNotesPayload = parse(payload)?;
                let content = self.sanitizer.clean(&payload.content);
                let contents = format!(
                    "Create well-structured study notes from the following material. \
                     Use headings and bullet points.\n\n{content}"
                );
                self.generate(
                    &self.models.deep,
                    &contents,
                    self.thinking_options(payload.enable_thinking),
                )
                .await
            }
            ActionKind::EstimateTime => {
                // Fields are interpolated raw; nothing here reaches a chat
                // surface unframed.
                let payload: EstimateTimePayload = parse(payload)?;
                let contents = format!(
                    "Estimate how long the following assignment takes an average student \
                     to complete. Answer with a short duration estimate only, for example \
                     \"about 2 hours\".\n\nAssignment: {}\nDescription: {}\nPoints: {}",
                    payload.assignment_name, payload.description, payload.points
                );
                self.generate(&self.models.lite, &contents, GenerateOptions::default())
                    .await
            }
            ActionKind::GenerateGroundedText => {
                let payload: GroundedTextPayload = parse(payload)?;
                let prompt = self.sanitizer.clean(&payload.prompt);
                let options = GenerateOptions {
                    thinking_budget: None,
                    tools: vec![GroundingTool::WebSearch, GroundingTool::MapSearch],
                };
                self.generate(&self.models.fast, &prompt, options).await
            }
            ActionKind::GenerateStudyPlan
            | ActionKind::GenerateSummary
            | ActionKind::GetTutorResponse
            | ActionKind::AnalyzeImage
            | ActionKind::AnalyzeVideo => Err(DispatchError::NotImplemented(action)),
        }
    }

    fn thinking_options(&self, enable_thinking: bool) -> GenerateOptions {
        GenerateOptions {
            thinking_budget: enable_thinking.then_some(self.thinking_budget),
            tools: Vec::new(),
        }
    }

    async fn generate(
        &self,
        model: &str,
        contents: &str,
        options: GenerateOptions,
    ) -> Result<Value, DispatchError> {
        self.backend
            .generate(model, contents, &options)
            .await
            .map_err(DispatchError::Backend)
    }
}

fn parse<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, DispatchError> {
    serde_json::from_value(payload).map_err(DispatchError::Payload)
}
