//! Request and response adapters, one per model family.
//!
//! Each family speaks its own JSON schema on the wire. Adapters turn a [`Prompt`] into
//! that schema and pull plain text back out, flagging truncated output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};

use super::Prompt;
use crate::chain::AttemptError;

const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const DEFAULT_SYSTEM: &str =
    "You are an expert ATS resume optimizer that preserves document formatting.";
const TOP_P: f64 = 0.9;

static RE_THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Anthropic,
    DeepSeek,
    Nova,
    Titan,
    Llama,
    Mistral,
}

impl ModelFamily {
    /// Infers the family from a Bedrock model id. Unknown ids use the Anthropic schema.
    pub fn from_model_id(model_id: &str) -> Self {
        let id = model_id.to_ascii_lowercase();
        if id.contains("deepseek") {
            ModelFamily::DeepSeek
        } else if id.contains("nova") {
            ModelFamily::Nova
        } else if id.contains("titan") {
            ModelFamily::Titan
        } else if id.contains("meta.") || id.contains("llama") {
            ModelFamily::Llama
        } else if id.contains("mistral") {
            ModelFamily::Mistral
        } else {
            ModelFamily::Anthropic
        }
    }

    pub fn build_request(&self, prompt: &Prompt, max_tokens: u32) -> Value {
        let max_tokens = prompt.max_tokens.unwrap_or(max_tokens);
        let system = prompt.system.as_deref().unwrap_or(DEFAULT_SYSTEM);
        let user = prompt.user.as_str();

        match self {
            ModelFamily::Anthropic => {
                let mut body = json!({
                    "anthropic_version": BEDROCK_ANTHROPIC_VERSION,
                    "max_tokens": max_tokens,
                    "temperature": prompt.temperature,
                    "messages": [{ "role": "user", "content": user }],
                });
                if let Some(system) = prompt.system.as_deref() {
                    body["system"] = json!(system);
                }
                body
            }
            ModelFamily::DeepSeek => json!({
                "max_tokens": max_tokens,
                "temperature": prompt.temperature,
                "messages": [{
                    "role": "user",
                    "content": format!(
                        "<｜begin▁of▁sentence｜>{system}<｜User｜>{user}<｜Assistant｜><think>\n"
                    ),
                }],
            }),
            ModelFamily::Nova => json!({
                "system": [{ "text": system }],
                "messages": [{ "role": "user", "content": [{ "text": user }] }],
                "inferenceConfig": {
                    "maxTokens": max_tokens,
                    "temperature": prompt.temperature,
                },
            }),
            ModelFamily::Titan => json!({
                "inputText": format!("System: {system}\n\nHuman: {user}\n\nAssistant:"),
                "textGenerationConfig": {
                    "maxTokenCount": max_tokens,
                    "temperature": prompt.temperature,
                    "topP": TOP_P,
                },
            }),
            ModelFamily::Llama => json!({
                "prompt": format!(
                    "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{system}<|eot_id|>\
                     <|start_header_id|>user<|end_header_id|>\n\n{user}<|eot_id|>\
                     <|start_header_id|>assistant<|end_header_id|>\n\n"
                ),
                "max_gen_len": max_tokens,
                "temperature": prompt.temperature,
                "top_p": TOP_P,
            }),
            ModelFamily::Mistral => json!({
                "prompt": format!("<s>[INST] {system}\n\n{user} [/INST]"),
                "max_tokens": max_tokens,
                "temperature": prompt.temperature,
                "top_p": TOP_P,
                "top_k": 50,
            }),
        }
    }

    /// Extracts the completion text. Output cut off by the token limit is a validation
    /// failure so the chain can try a backend with more headroom.
    pub fn parse_response(&self, body: &Value) -> Result<String, AttemptError> {
        let (text, stop) = match self {
            ModelFamily::Anthropic => (
                body.pointer("/content/0/text").and_then(Value::as_str),
                body.get("stop_reason").and_then(Value::as_str),
            ),
            ModelFamily::DeepSeek => (
                body.pointer("/choices/0/message/content")
                    .or_else(|| body.pointer("/content/0/text"))
                    .or_else(|| body.get("output"))
                    .and_then(Value::as_str),
                body.pointer("/choices/0/stop_reason")
                    .or_else(|| body.pointer("/choices/0/finish_reason"))
                    .or_else(|| body.get("stop_reason"))
                    .and_then(Value::as_str),
            ),
            ModelFamily::Nova => (
                body.pointer("/output/message/content/0/text")
                    .and_then(Value::as_str),
                body.get("stopReason").and_then(Value::as_str),
            ),
            ModelFamily::Titan => (
                body.pointer("/results/0/outputText").and_then(Value::as_str),
                body.pointer("/results/0/completionReason")
                    .and_then(Value::as_str),
            ),
            ModelFamily::Llama => (
                body.get("generation").and_then(Value::as_str),
                body.get("stop_reason").and_then(Value::as_str),
            ),
            ModelFamily::Mistral => (
                body.pointer("/outputs/0/text").and_then(Value::as_str),
                body.pointer("/outputs/0/stop_reason").and_then(Value::as_str),
            ),
        };

        let text = text.ok_or_else(|| {
            AttemptError::validation(format!("{self:?} response has no completion text"))
        })?;

        if let Some(reason) = stop {
            if matches!(
                reason.to_ascii_lowercase().as_str(),
                "max_tokens" | "length" | "max_length"
            ) {
                return Err(AttemptError::validation(format!(
                    "response truncated (stop reason '{reason}')"
                )));
            }
        }

        Ok(match self {
            ModelFamily::DeepSeek => strip_reasoning(text),
            _ => text.trim().to_string(),
        })
    }
}

/// Removes `<think>` reasoning blocks, including an unterminated leading one closed only
/// by `</think>` (the request pre-opens the block).
fn strip_reasoning(text: &str) -> String {
    let without_blocks = RE_THINK_BLOCK.replace_all(text, "");
    let answer = match without_blocks.rfind("</think>") {
        Some(end) => &without_blocks[end + "</think>".len()..],
        None => &without_blocks,
    };
    answer.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Prompt {
        Prompt::new("Rewrite my resume")
    }

    #[test]
    fn test_family_from_model_id() {
        assert_eq!(
            ModelFamily::from_model_id("us.deepseek.r1-v1:0"),
            ModelFamily::DeepSeek
        );
        assert_eq!(
            ModelFamily::from_model_id("anthropic.claude-3-haiku-20240307-v1:0"),
            ModelFamily::Anthropic
        );
        assert_eq!(
            ModelFamily::from_model_id("amazon.nova-pro-v1:0"),
            ModelFamily::Nova
        );
        assert_eq!(
            ModelFamily::from_model_id("amazon.titan-text-express-v1"),
            ModelFamily::Titan
        );
        assert_eq!(
            ModelFamily::from_model_id("meta.llama3-70b-instruct-v1:0"),
            ModelFamily::Llama
        );
        assert_eq!(
            ModelFamily::from_model_id("mistral.mistral-large-2402-v1:0"),
            ModelFamily::Mistral
        );
    }

    #[test]
    fn test_anthropic_request_shape() {
        let body = ModelFamily::Anthropic.build_request(&prompt().with_system("Be terse"), 4000);
        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["system"], "Be terse");
        assert_eq!(body["messages"][0]["content"], "Rewrite my resume");
    }

    #[test]
    fn test_prompt_max_tokens_overrides_backend_default() {
        let body = ModelFamily::Titan.build_request(&prompt().with_max_tokens(200), 4000);
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 200);
        assert!(body["inputText"]
            .as_str()
            .unwrap()
            .ends_with("Human: Rewrite my resume\n\nAssistant:"));
    }

    #[test]
    fn test_parse_each_family() {
        let cases = [
            (ModelFamily::Anthropic, json!({"content": [{"type": "text", "text": " hi "}], "stop_reason": "end_turn"})),
            (ModelFamily::Nova, json!({"output": {"message": {"content": [{"text": "hi"}]}}, "stopReason": "end_turn"})),
            (ModelFamily::Titan, json!({"results": [{"outputText": "hi", "completionReason": "FINISH"}]})),
            (ModelFamily::Llama, json!({"generation": "hi", "stop_reason": "stop"})),
            (ModelFamily::Mistral, json!({"outputs": [{"text": "hi", "stop_reason": "stop"}]})),
            (ModelFamily::DeepSeek, json!({"choices": [{"message": {"content": "hi"}, "stop_reason": "stop"}]})),
        ];
        for (family, body) in cases {
            assert_eq!(family.parse_response(&body).unwrap(), "hi", "{family:?}");
        }
    }

    #[test]
    fn test_truncated_output_is_rejected() {
        let body = json!({"content": [{"text": "{\"full_name\": \"Ja"}], "stop_reason": "max_tokens"});
        let err = ModelFamily::Anthropic.parse_response(&body).unwrap_err();
        assert_eq!(err.class, crate::chain::FailureClass::Validation);
    }

    #[test]
    fn test_missing_text_is_rejected() {
        assert!(ModelFamily::Titan.parse_response(&json!({"results": []})).is_err());
    }

    #[test]
    fn test_deepseek_reasoning_is_stripped() {
        let body = json!({"choices": [{"message": {"content": "weighing {options}...</think>\n{\"a\": 1}"}}]});
        assert_eq!(ModelFamily::DeepSeek.parse_response(&body).unwrap(), "{\"a\": 1}");
        assert_eq!(strip_reasoning("<think>x</think> answer"), "answer");
    }
}
