//! Model invocation chain.
//!
//! Backends are declared in priority order (see [`catalog`]). Each one is called once,
//! with its own request/response adapter and a bounded timeout; the first backend whose
//! adapted answer clears the length floor wins. Backends are never raced.

pub mod adapters;
pub mod catalog;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::chain::{run_chain, AttemptError, ChainExhausted, ChainMember};
pub use adapters::ModelFamily;
pub use transport::ModelTransport;

/// Answers at or below this many characters are treated as empty.
pub const DEFAULT_MIN_RESPONSE_CHARS: usize = 100;
const DEFAULT_TEMPERATURE: f32 = 0.5;
/// Rough tokens-per-word ratio used for cost estimates.
const TOKENS_PER_WORD: f64 = 1.3;

/// One model request, independent of any backend schema.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub user: String,
    pub system: Option<String>,
    pub temperature: f32,
    /// Overrides the backend's default output budget.
    pub max_tokens: Option<u32>,
    pub min_response_chars: usize,
}

impl Prompt {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            system: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            min_response_chars: DEFAULT_MIN_RESPONSE_CHARS,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_min_response_chars(mut self, min: usize) -> Self {
        self.min_response_chars = min;
        self
    }
}

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostProfile {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl CostProfile {
    pub fn estimate(&self, prompt: &str, completion: &str) -> f64 {
        let input_tokens = estimate_tokens(prompt);
        let output_tokens = estimate_tokens(completion);
        (input_tokens * self.input_per_million + output_tokens * self.output_per_million)
            / 1_000_000.0
    }
}

fn estimate_tokens(text: &str) -> f64 {
    text.split_whitespace().count() as f64 * TOKENS_PER_WORD
}

/// Declarative description of one chain member.
#[derive(Clone)]
pub struct ModelBackend {
    pub id: String,
    pub name: String,
    pub family: ModelFamily,
    pub cost: CostProfile,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub transport: Arc<dyn ModelTransport>,
}

impl std::fmt::Debug for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBackend")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl ChainMember for ModelBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }
}

impl ModelBackend {
    /// Build request, call, adapt, check the floor. One attempt.
    async fn attempt(&self, prompt: &Prompt) -> Result<String, AttemptError> {
        let request = self.family.build_request(prompt, self.max_tokens);
        let response = self.transport.invoke(&self.id, &request).await?;
        let text = self.family.parse_response(&response)?;
        let length = text.trim().chars().count();
        if length <= prompt.min_response_chars {
            return Err(AttemptError::empty(format!(
                "response of {length} characters is below the {} character floor",
                prompt.min_response_chars
            )));
        }
        Ok(text)
    }
}

/// The winning backend's answer with provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResult {
    pub content: String,
    pub backend_used: String,
    pub backend_name: String,
    pub cost_estimate_usd: f64,
}

pub struct ModelChain {
    backends: Vec<ModelBackend>,
}

impl ModelChain {
    pub fn new(backends: Vec<ModelBackend>) -> Self {
        Self { backends }
    }

    pub fn backend_ids(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.id.as_str()).collect()
    }

    pub async fn invoke(&self, prompt: &Prompt) -> Result<ModelResult, ChainExhausted> {
        let success = run_chain("model", &self.backends, move |backend| backend.attempt(prompt)).await?;

        let backend = self
            .backends
            .iter()
            .find(|b| b.id == success.member)
            .map(|b| (b.name.clone(), b.cost));
        let (backend_name, cost_estimate_usd) = match backend {
            Some((name, cost)) => (name, cost.estimate(&prompt.user, &success.value)),
            None => (success.member.clone(), 0.0),
        };

        info!(
            backend = %success.member,
            fallbacks = success.skipped.len(),
            elapsed_ms = success.elapsed.as_millis() as u64,
            cost_estimate_usd,
            "Model invocation succeeded"
        );

        Ok(ModelResult {
            content: success.value,
            backend_used: success.member,
            backend_name,
            cost_estimate_usd,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Transport answering per model id from a script and recording every call.
    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<HashMap<String, Vec<Result<Value, AttemptError>>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Queues an Anthropic-shaped answer for `model_id`.
        pub fn with_text(self: &Arc<Self>, model_id: &str, text: &str) -> Arc<Self> {
            self.push(
                model_id,
                Ok(json!({"content": [{"type": "text", "text": text}], "stop_reason": "end_turn"})),
            )
        }

        pub fn with_error(self: &Arc<Self>, model_id: &str, error: AttemptError) -> Arc<Self> {
            self.push(model_id, Err(error))
        }

        fn push(self: &Arc<Self>, model_id: &str, outcome: Result<Value, AttemptError>) -> Arc<Self> {
            self.responses
                .lock()
                .unwrap()
                .entry(model_id.to_string())
                .or_default()
                .push(outcome);
            Arc::clone(self)
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelTransport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn invoke(&self, model_id: &str, _body: &Value) -> Result<Value, AttemptError> {
            self.calls.lock().unwrap().push(model_id.to_string());
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(model_id) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => Err(AttemptError::unexpected(format!("no scripted answer for {model_id}"))),
            }
        }
    }

    pub fn backend(id: &str, transport: &Arc<ScriptedTransport>) -> ModelBackend {
        ModelBackend {
            id: id.to_string(),
            name: id.to_uppercase(),
            family: ModelFamily::Anthropic,
            cost: CostProfile {
                input_per_million: 1.0,
                output_per_million: 2.0,
            },
            max_tokens: 4000,
            timeout: Duration::from_secs(5),
            transport: transport.clone(),
        }
    }
}
