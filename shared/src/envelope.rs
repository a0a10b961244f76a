use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::ImagePayload;

const BODY_KEY: &str = "body";

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("stage input must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("envelope body must be JSON text or an object, got {0}")]
    UnsupportedBody(&'static str),
    #[error("invalid payload: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("inference at index {index} is not numeric: {value}")]
    NonNumericConfidence { index: usize, value: Value },
}

/// `{statusCode, body}` wrapper every stage hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<B> {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: B,
}

impl<B> Envelope<B> {
    pub const OK: u16 = 200;

    pub fn ok(body: B) -> Self {
        Self {
            status_code: Self::OK,
            body,
        }
    }
}

/// The three shapes a stage may receive from the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum StageInput {
    /// The payload object itself.
    Bare(ImagePayload),
    /// An envelope whose body is the payload encoded as JSON text.
    EnvelopeWithText(String),
    /// An envelope whose body is the payload object.
    EnvelopeWithStruct(ImagePayload),
}

impl StageInput {
    /// Any object carrying a `body` key is treated as an envelope; its
    /// status code is not inspected.
    pub fn from_value(event: Value) -> Result<Self, PayloadError> {
        let mut object = match event {
            Value::Object(object) => object,
            other => return Err(PayloadError::NotAnObject(json_type(&other))),
        };

        match object.remove(BODY_KEY) {
            None => Ok(StageInput::Bare(serde_json::from_value(Value::Object(
                object,
            ))?)),
            Some(Value::String(text)) => Ok(StageInput::EnvelopeWithText(text)),
            Some(body @ Value::Object(_)) => {
                Ok(StageInput::EnvelopeWithStruct(serde_json::from_value(body)?))
            }
            Some(other) => Err(PayloadError::UnsupportedBody(json_type(&other))),
        }
    }

    pub fn into_payload(self) -> Result<ImagePayload, PayloadError> {
        match self {
            StageInput::Bare(payload) | StageInput::EnvelopeWithStruct(payload) => Ok(payload),
            StageInput::EnvelopeWithText(text) => Ok(serde_json::from_str(&text)?),
        }
    }
}

/// Unwraps whatever the orchestrator handed over into the payload.
pub fn normalize(event: Value) -> Result<ImagePayload, PayloadError> {
    StageInput::from_value(event)?.into_payload()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
