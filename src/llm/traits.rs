//! TextGenerator trait definition.
//!
//! Abstract interface for the text-generation collaborator used by the
//! community labeler. Follows the project pattern (trait + HTTP impl +
//! mock): async trait, `Send + Sync`, consumed as `Arc<dyn TextGenerator>`.

use anyhow::Result;
use async_trait::async_trait;

/// Generation knobs passed with every request.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Sampling temperature; labeling uses a low value for determinism.
    pub temperature: f64,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 256,
        }
    }
}

/// Abstract interface for prompt → text generation.
///
/// Implementations must tolerate being called with prompts they cannot
/// fulfil by returning an error; callers (the labeler) treat any failure as
/// non-fatal and degrade per-item.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// The model identifier, for traceability in logs.
    fn model_name(&self) -> &str;
}
