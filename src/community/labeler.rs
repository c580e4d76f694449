//! Community labeling via the text-generation collaborator.
//!
//! Detection and labeling are separate stages joined by the plain
//! [`Community`] value: detection stays deterministic and independently
//! testable, and labeling can be mocked without touching partitioning.
//!
//! Labeling is best-effort per community. A transport failure or a response
//! that survives neither the strict nor the lenient parse degrades that one
//! community to the generic `"Community <id>"` label; nothing here ever
//! fails a detection run.

use super::models::Community;
use crate::llm::{GenerationOptions, TextGenerator};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Representative members sent per community.
const MAX_REPRESENTATIVES: usize = 12;
/// Labels longer than this are truncated (the prompt asks for 2–4 words).
const MAX_LABEL_WORDS: usize = 6;

#[derive(Debug, Deserialize)]
struct LabelResponse {
    label: String,
    #[serde(default)]
    description: Option<String>,
}

pub struct CommunityLabeler {
    generator: Arc<dyn TextGenerator>,
    options: GenerationOptions,
}

impl CommunityLabeler {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            // Low temperature: labels should be stable across runs.
            options: GenerationOptions {
                temperature: 0.1,
                max_tokens: 200,
            },
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Assign a label and description to every community, in place.
    /// Failures are isolated per community.
    pub async fn label_communities(
        &self,
        communities: &mut [Community],
        names: &HashMap<String, String>,
    ) {
        for community in communities.iter_mut() {
            let prompt = self.build_prompt(community, names);
            match self.generator.generate(&prompt, &self.options).await {
                Ok(response) => match parse_label_response(&response) {
                    Some((label, description)) => {
                        community.label = Some(label);
                        community.description = description;
                    }
                    None => {
                        tracing::warn!(
                            community = community.id,
                            "unparseable label response, using generic label"
                        );
                        community.label = Some(format!("Community {}", community.id));
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        community = community.id,
                        "labeling request failed, using generic label: {e}"
                    );
                    community.label = Some(format!("Community {}", community.id));
                }
            }
        }
    }

    fn build_prompt(&self, community: &Community, names: &HashMap<String, String>) -> String {
        let representatives: Vec<&str> = community
            .members
            .iter()
            .take(MAX_REPRESENTATIVES)
            .map(|id| names.get(id).map(String::as_str).unwrap_or(id.as_str()))
            .collect();

        format!(
            "The following entities form one topical cluster in a knowledge graph:\n\
             {}\n\n\
             Reply with only a JSON object of the form \
             {{\"label\": \"<2-4 word topic label>\", \"description\": \"<one sentence>\"}}.",
            representatives.join(", ")
        )
    }
}

/// Parse a `{label, description}` object out of a generation response.
///
/// Strict JSON first; then JSON inside a fenced code block; then a lenient
/// regex over the raw text. Returns `None` when nothing usable is found.
pub fn parse_label_response(response: &str) -> Option<(String, Option<String>)> {
    let trimmed = response.trim();

    if let Some(parsed) = try_parse_json(trimmed) {
        return Some(parsed);
    }

    // Fenced code block (``` or ```json).
    let fence = Regex::new(r"```(?:json)?\s*([\s\S]*?)```").ok()?;
    if let Some(captures) = fence.captures(trimmed) {
        if let Some(parsed) = try_parse_json(captures.get(1)?.as_str().trim()) {
            return Some(parsed);
        }
    }

    // Lenient: pick the quoted values out of near-JSON text.
    let label_re = Regex::new(r#""label"\s*:\s*"([^"]+)""#).ok()?;
    let label = label_re.captures(trimmed)?.get(1)?.as_str().to_string();
    let description = Regex::new(r#""description"\s*:\s*"([^"]+)""#)
        .ok()
        .and_then(|re| re.captures(trimmed))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Some(normalize_parsed(label, description))
}

fn try_parse_json(text: &str) -> Option<(String, Option<String>)> {
    let parsed: LabelResponse = serde_json::from_str(text).ok()?;
    Some(normalize_parsed(parsed.label, parsed.description))
}

fn normalize_parsed(label: String, description: Option<String>) -> (String, Option<String>) {
    let label = label
        .split_whitespace()
        .take(MAX_LABEL_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    (label, description)
}
