pub mod sagemaker;

use async_trait::async_trait;

pub use sagemaker::SageMakerEndpoint;

/// What the deployed model was trained on, and what it expects by default.
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("endpoint invocation failed: {0}")]
    Endpoint(String),
    #[error("endpoint returned no body")]
    EmptyResponse,
    #[error("endpoint response is not a JSON array of numbers: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// A hosted model that takes raw image bytes and answers with a JSON body.
#[async_trait]
pub trait InferenceEndpoint: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, image: &[u8], content_type: &str) -> Result<Vec<u8>, InferenceError>;
}

/// How the request content type is chosen for an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTypePolicy {
    Fixed(String),
    /// Detect from the image's magic bytes, falling back to PNG.
    Sniff,
}

impl ContentTypePolicy {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("auto") {
            ContentTypePolicy::Sniff
        } else {
            ContentTypePolicy::Fixed(value.trim().to_string())
        }
    }

    pub fn resolve(&self, image: &[u8]) -> &str {
        match self {
            ContentTypePolicy::Fixed(content_type) => content_type,
            ContentTypePolicy::Sniff => image::guess_format(image)
                .map(|format| format.to_mime_type())
                .unwrap_or(DEFAULT_CONTENT_TYPE),
        }
    }
}

pub fn parse_confidence_vector(body: &[u8]) -> Result<Vec<f64>, InferenceError> {
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";

    #[rstest]
    #[case(PNG_MAGIC, "image/png")]
    #[case(JPEG_MAGIC, "image/jpeg")]
    #[case(b"GIF89a\x01\x00\x01\x00".as_slice(), "image/gif")]
    #[case(b"definitely not an image".as_slice(), DEFAULT_CONTENT_TYPE)]
    fn sniffing_picks_mime_from_magic_bytes(#[case] image: &[u8], #[case] expected: &str) {
        assert_eq!(ContentTypePolicy::Sniff.resolve(image), expected);
    }

    #[test]
    fn fixed_policy_ignores_image_contents() {
        let policy = ContentTypePolicy::parse("image/png");
        assert_eq!(policy.resolve(JPEG_MAGIC), "image/png");
    }

    #[test]
    fn auto_is_case_insensitive() {
        assert_eq!(ContentTypePolicy::parse(" AUTO "), ContentTypePolicy::Sniff);
    }

    #[test]
    fn parses_probability_array() {
        let scores = parse_confidence_vector(b"[0.9615, 0.0385]").unwrap();
        assert_eq!(scores, vec![0.9615, 0.0385]);
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"{\"predictions\": [0.9]}".as_slice())]
    #[case(b"[\"0.9\"]".as_slice())]
    #[case(b"<html>503</html>".as_slice())]
    fn rejects_malformed_responses(#[case] body: &[u8]) {
        assert!(matches!(
            parse_confidence_vector(body),
            Err(InferenceError::MalformedResponse(_))
        ));
    }
}
