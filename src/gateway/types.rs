use serde::{Deserialize, Serialize};

use crate::gateway::rate_limit::RateLimitSettings;

/// Closed set of actions a caller may request. Only the first five have
/// dispatcher behavior; the remainder pass validation and are rejected as
/// not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    GenerateText,
    SummarizeDocument,
    GenerateNotes,
    EstimateTime,
    GenerateGroundedText,
    GenerateStudyPlan,
    GenerateSummary,
    GetTutorResponse,
    AnalyzeImage,
    AnalyzeVideo,
}

impl ActionKind {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "generateText" => Some(Self::GenerateText),
            "summarizeDocument" => Some(Self::SummarizeDocument),
            "generateNotes" => Some(Self::GenerateNotes),
            "estimateTime" => Some(Self::EstimateTime),
            "generateGroundedText" => Some(Self::GenerateGroundedText),
            "generateStudyPlan" => Some(Self::GenerateStudyPlan),
            "generateSummary" => Some(Self::GenerateSummary),
            "getTutorResponse" => Some(Self::GetTutorResponse),
            "analyzeImage" => Some(Self::AnalyzeImage),
            "analyzeVideo" => Some(Self::AnalyzeVideo),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::GenerateText => "generateText",
            Self::SummarizeDocument => "summarizeDocument",
            Self::GenerateNotes => "generateNotes",
            Self::EstimateTime => "estimateTime",
            Self::GenerateGroundedText => "generateGroundedText",
            Self::GenerateStudyPlan => "generateStudyPlan",
            Self::GenerateSummary => "generateSummary",
            Self::GetTutorResponse => "getTutorResponse",
            Self::AnalyzeImage => "analyzeImage",
            Self::AnalyzeVideo => "analyzeVideo",
        }
    }
}

/// A validated action envelope. The payload is still opaque at this stage;
/// the dispatcher parses it against the action's typed shape.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub action: ActionKind,
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTextPayload {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeDocumentPayload {
    pub content: String,
    #[serde(default)]
    pub enable_thinking: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateNotesPayload {
    pub content: String,
    #[serde(default)]
    pub enable_thinking: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateTimePayload {
    pub assignment_name: String,
    pub description: String,
    pub points: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundedTextPayload {
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Web,
    Map,
}

/// A citation unit extracted from grounding metadata. Uniqueness key is
/// `uri`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub kind: SourceKind,
    pub uri: String,
    pub title: String,
}

/// The stable client-facing success shape. `text` is always non-empty: the
/// normalizer substitutes sentinel text when the backend response cannot be
/// interpreted. `sources` is present only for grounded actions.
#[derive(Debug, Clone, Serialize)]
pub struct ActionReply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    InlineToken { token: String },
    None,
}

impl Default for CredentialRef {
    fn default() -> Self {
        Self::Env {
            var: "GEMINI_API_KEY".to_string(),
        }
    }
}

impl CredentialRef {
    /// Resolves the reference to a usable key. `None` means the backend is
    /// unconfigured and every dispatch must be refused.
    pub fn resolve(&self) -> Option<String> {
        match self {
            Self::Env { var } => std::env::var(var).ok().filter(|key| !key.trim().is_empty()),
            Self::InlineToken { token } => {
                let token = token.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Self::None => None,
        }
    }
}

/// Model ids per capability tier. Which tier serves which action is the
/// dispatcher's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRoster {
    #[serde(default = "default_fast_model")]
    pub fast: String,
    #[serde(default = "default_deep_model")]
    pub deep: String,
    #[serde(default = "default_lite_model")]
    pub lite: String,
}

impl Default for ModelRoster {
    fn default() -> Self {
        Self {
            fast: default_fast_model(),
            deep: default_deep_model(),
            lite: default_lite_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default)]
    pub credential: CredentialRef,
    #[serde(default)]
    pub models: ModelRoster,
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: u32,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            credential: CredentialRef::default(),
            models: ModelRoster::default(),
            thinking_budget: default_thinking_budget(),
            request_timeout_ms: default_request_timeout_ms(),
            endpoint: default_endpoint(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

fn default_fast_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_deep_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_lite_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_thinking_budget() -> u32 {
    8_192
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
