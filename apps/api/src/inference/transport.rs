//! Wire transports for model backends. A transport moves one JSON request to a model and
//! returns the raw JSON response; it knows nothing about families or prompts.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError;
use aws_sdk_bedrockruntime::primitives::Blob;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::chain::{AttemptError, FailureClass};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[async_trait]
pub trait ModelTransport: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, model_id: &str, body: &Value) -> Result<Value, AttemptError>;
}

// ────────────────────────────────────────────────────────────────────────────
// AWS Bedrock
// ────────────────────────────────────────────────────────────────────────────

pub struct BedrockTransport {
    client: aws_sdk_bedrockruntime::Client,
}

impl BedrockTransport {
    pub fn new(client: aws_sdk_bedrockruntime::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ModelTransport for BedrockTransport {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn invoke(&self, model_id: &str, body: &Value) -> Result<Value, AttemptError> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| AttemptError::unexpected(format!("request encoding failed: {e}")))?;

        let output = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(payload))
            .send()
            .await
            .map_err(classify_bedrock_error)?;

        serde_json::from_slice(output.body().as_ref())
            .map_err(|e| AttemptError::validation(format!("response body is not JSON: {e}")))
    }
}

fn classify_bedrock_error<R: std::fmt::Debug>(err: SdkError<InvokeModelError, R>) -> AttemptError {
    let class = match &err {
        SdkError::TimeoutError(_) => FailureClass::Timeout,
        SdkError::DispatchFailure(_) => FailureClass::Network,
        SdkError::ServiceError(_) => err
            .as_service_error()
            .and_then(|e| e.code())
            .map(class_for_bedrock_code)
            .unwrap_or(FailureClass::Unexpected),
        _ => FailureClass::Unexpected,
    };
    AttemptError::new(class, DisplayErrorContext(&err).to_string())
}

fn class_for_bedrock_code(code: &str) -> FailureClass {
    match code {
        "ThrottlingException" | "TooManyRequestsException" | "ServiceQuotaExceededException" => {
            FailureClass::Throttled
        }
        "ModelNotReadyException" => FailureClass::ModelNotReady,
        "ValidationException" => FailureClass::Validation,
        "ModelTimeoutException" => FailureClass::Timeout,
        "ServiceUnavailableException" | "InternalServerException" | "ModelErrorException" => {
            FailureClass::Network
        }
        _ => FailureClass::Unexpected,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic Messages API
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Direct calls to the Anthropic Messages API. Accepts the Anthropic-family request
/// body, swapping the Bedrock version field for the API's `model` field.
#[derive(Clone)]
pub struct AnthropicApiTransport {
    client: Client,
    api_key: String,
}

impl AnthropicApiTransport {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
        })
    }
}

#[async_trait]
impl ModelTransport for AnthropicApiTransport {
    fn name(&self) -> &str {
        "anthropic-api"
    }

    async fn invoke(&self, model_id: &str, body: &Value) -> Result<Value, AttemptError> {
        let mut request_body = body.clone();
        if let Some(fields) = request_body.as_object_mut() {
            fields.remove("anthropic_version");
            fields.insert("model".to_string(), json!(model_id));
        }

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                let class = if e.is_timeout() {
                    FailureClass::Timeout
                } else {
                    FailureClass::Network
                };
                AttemptError::new(class, format!("HTTP error: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(classify_status(status.as_u16(), message));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| AttemptError::validation(format!("response body is not JSON: {e}")))?;
        let input_tokens = value.pointer("/usage/input_tokens").and_then(Value::as_u64);
        let output_tokens = value.pointer("/usage/output_tokens").and_then(Value::as_u64);
        debug!(
            model = model_id,
            input_tokens,
            output_tokens,
            "Anthropic API call succeeded"
        );
        Ok(value)
    }
}

fn classify_status(status: u16, message: String) -> AttemptError {
    let class = match status {
        429 | 529 => FailureClass::Throttled,
        408 => FailureClass::Timeout,
        400 | 413 | 422 => FailureClass::Validation,
        s if s >= 500 => FailureClass::Network,
        _ => FailureClass::Unexpected,
    };
    AttemptError::new(class, format!("API error (status {status}): {message}"))
}
