use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::gateway::types::{Source, SourceKind};

pub const NO_RESPONSE_SENTINEL: &str = "[No response from AI]";
pub const NO_TEXT_SENTINEL: &str = "[No text in response]";
pub const MALFORMED_SENTINEL: &str = "[Error processing AI response]";

/// Finish reasons that override any partial text with a blocked sentinel.
const BLOCKED_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "OTHER"];

/// Lenient mirror of the backend response. Every field is optional: the
/// wire shape varies across backend schema versions and none of it is
/// trusted. A type mismatch anywhere fails the parse as a whole, which is
/// the malformed-response case.
#[derive(Debug, Default, Deserialize)]
struct RawGenerateResponse {
    candidates: Option<Vec<RawCandidate>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    finish_reason: Option<String>,
    content: Option<RawContent>,
    grounding_metadata: Option<RawGroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct RawContent {
    parts: Option<Vec<RawPart>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroundingMetadata {
    grounding_chunks: Option<Vec<RawGroundingChunk>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGroundingChunk {
    web: Option<RawCitation>,
    maps: Option<RawCitation>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCitation {
    uri: Option<String>,
    title: Option<String>,
}

/// Extracts display text from the raw response. Total: every malformed,
/// empty, or safety-blocked shape degrades to sentinel text instead of an
/// error, so the gateway still answers 200.
pub fn extract_text(raw: &Value) -> String {
    let Ok(parsed) = serde_json::from_value::<RawGenerateResponse>(raw.clone()) else {
        return MALFORMED_SENTINEL.to_string();
    };

    let candidates = match parsed.candidates {
        Some(candidates) if !candidates.is_empty() => candidates,
        _ => return NO_RESPONSE_SENTINEL.to_string(),
    };

    let first = &candidates[0];
    if let Some(reason) = first.finish_reason.as_deref() {
        // The block sentinel wins over any partial text.
        if BLOCKED_FINISH_REASONS.contains(&reason) {
            return format!("[Content generation blocked: {reason}]");
        }
    }

    let text = first
        .content
        .as_ref()
        .and_then(|content| content.parts.as_ref())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.is_empty() {
        NO_TEXT_SENTINEL.to_string()
    } else {
        text
    }
}

/// Extracts citation sources from the first candidate's grounding metadata.
/// Chunks without a recognized citation shape are dropped, then chunks with
/// an empty uri, then duplicates by uri: a later duplicate overwrites the
/// stored kind/title while the emitted position stays at the first
/// insertion.
pub fn extract_sources(raw: &Value) -> Vec<Source> {
    let Ok(parsed) = serde_json::from_value::<RawGenerateResponse>(raw.clone()) else {
        return Vec::new();
    };

    let chunks = parsed
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.grounding_metadata)
        .and_then(|metadata| metadata.grounding_chunks)
        .unwrap_or_default();

    let mapped = chunks.into_iter().filter_map(|chunk| {
        if let Some(web) = chunk.web {
            Some(Source {
                kind: SourceKind::Web,
                uri: web.uri.unwrap_or_default(),
                title: web.title.unwrap_or_else(|| "Untitled".to_string()),
            })
        } else if let Some(maps) = chunk.maps {
            Some(Source {
                kind: SourceKind::Map,
                uri: maps.uri.unwrap_or_default(),
                title: maps.title.unwrap_or_else(|| "Untitled Place".to_string()),
            })
        } else {
            None
        }
    });

    let mut order: Vec<String> = Vec::new();
    let mut by_uri: HashMap<String, Source> = HashMap::new();
    for source in mapped {
        if source.uri.is_empty() {
            continue;
        }
        if !by_uri.contains_key(&source.uri) {
            order.push(source.uri.clone());
        }
        by_uri.insert(source.uri.clone(), source);
    }

    order
        .into_iter()
        .filter_map(|uri| by_uri.remove(&uri))
        .collect()
}
