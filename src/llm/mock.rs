//! Deterministic mock text generator for tests.

use super::traits::{GenerationOptions, TextGenerator};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock generator that replays a fixed sequence of responses.
///
/// When the scripted responses run out, the last one repeats. An empty
/// script makes every call fail (for transport-failure paths).
pub struct MockTextGenerator {
    responses: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl MockTextGenerator {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A generator whose every call fails.
    pub fn failing() -> Self {
        Self::new(vec![])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let responses = self.responses.lock().expect("mock generator poisoned");
        match responses.get(call).or_else(|| responses.last()) {
            Some(response) => Ok(response.clone()),
            None => Err(anyhow!("mock text generator has no scripted response")),
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_then_repeats_last() {
        let generator = MockTextGenerator::new(vec!["one", "two"]);
        let opts = GenerationOptions::default();
        assert_eq!(generator.generate("", &opts).await.unwrap(), "one");
        assert_eq!(generator.generate("", &opts).await.unwrap(), "two");
        assert_eq!(generator.generate("", &opts).await.unwrap(), "two");
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failing_generator() {
        let generator = MockTextGenerator::failing();
        assert!(generator
            .generate("", &GenerationOptions::default())
            .await
            .is_err());
    }
}
