use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope::PayloadError;

/// Where the image lives in object storage. This is the orchestrator's
/// initial input, unwrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocator {
    pub s3_key: String,
    pub s3_bucket: String,
}

impl StorageLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            s3_key: key.into(),
            s3_bucket: bucket.into(),
        }
    }
}

impl fmt::Display for StorageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.s3_bucket, self.s3_key)
    }
}

/// The payload that travels through the pipeline.
///
/// `inferences` is present from the first stage onwards: empty after
/// fetch-encode, filled in once by classify. Values are kept as raw JSON so a
/// payload passes through the filter byte-for-byte; use
/// [`ImagePayload::confidence_vector`] to read them as numbers.
///
/// Fields the pipeline does not know about are kept in `extra` and written
/// back out in their original position after the known ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub image_data: String,
    pub s3_bucket: String,
    pub s3_key: String,
    pub inferences: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImagePayload {
    pub fn new(locator: StorageLocator, image_data: String) -> Self {
        Self {
            image_data,
            s3_bucket: locator.s3_bucket,
            s3_key: locator.s3_key,
            inferences: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn locator(&self) -> StorageLocator {
        StorageLocator::new(&self.s3_bucket, &self.s3_key)
    }

    pub fn with_inferences(mut self, scores: Vec<f64>) -> Self {
        self.inferences = scores.into_iter().map(Value::from).collect();
        self
    }

    /// Reads `inferences` as floats. Numbers and numeric text are accepted;
    /// the first element that is neither fails the whole vector.
    pub fn confidence_vector(&self) -> Result<Vec<f64>, PayloadError> {
        self.inferences
            .iter()
            .enumerate()
            .map(|(index, value)| {
                coerce_score(value).ok_or_else(|| PayloadError::NonNumericConfidence {
                    index,
                    value: value.clone(),
                })
            })
            .collect()
    }
}

fn coerce_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn payload_with(inferences: Value) -> ImagePayload {
        serde_json::from_value(json!({
            "image_data": "aGVsbG8=",
            "s3_bucket": "bucket",
            "s3_key": "test/cat.png",
            "inferences": inferences,
        }))
        .unwrap()
    }

    #[test]
    fn new_payload_starts_with_empty_inferences() {
        let payload = ImagePayload::new(StorageLocator::new("b", "k"), "AA==".into());
        assert!(payload.inferences.is_empty());
        assert_eq!(payload.locator(), StorageLocator::new("b", "k"));
    }

    #[test]
    fn locator_displays_as_s3_uri() {
        let locator = StorageLocator::new("images", "test/bicycle_s_001789.png");
        assert_eq!(locator.to_string(), "s3://images/test/bicycle_s_001789.png");
    }

    #[test]
    fn locator_reads_orchestrator_input() {
        let locator: StorageLocator =
            serde_json::from_value(json!({"s3_key": "k.png", "s3_bucket": "b"})).unwrap();
        assert_eq!(locator, StorageLocator::new("b", "k.png"));
    }

    #[rstest]
    #[case(json!([0.1, 0.5, 0.95]), vec![0.1, 0.5, 0.95])]
    #[case(json!(["0.25", " 0.75 "]), vec![0.25, 0.75])]
    #[case(json!([1, "1e-3"]), vec![1.0, 0.001])]
    #[case(json!([]), vec![])]
    fn confidence_vector_coerces_numbers_and_numeric_text(
        #[case] inferences: Value,
        #[case] expected: Vec<f64>,
    ) {
        assert_eq!(payload_with(inferences).confidence_vector().unwrap(), expected);
    }

    #[rstest]
    #[case(json!([0.1, "high"]), 1)]
    #[case(json!([null]), 0)]
    #[case(json!([0.2, 0.3, true]), 2)]
    #[case(json!([[0.9]]), 0)]
    fn confidence_vector_rejects_non_numeric(#[case] inferences: Value, #[case] bad: usize) {
        match payload_with(inferences).confidence_vector() {
            Err(PayloadError::NonNumericConfidence { index, .. }) => assert_eq!(index, bad),
            other => panic!("expected NonNumericConfidence, got {other:?}"),
        }
    }

    #[test]
    fn with_inferences_replaces_previous_scores() {
        let payload = payload_with(json!(["stale"])).with_inferences(vec![0.2, 0.8]);
        assert_eq!(payload.inferences, vec![json!(0.2), json!(0.8)]);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip_in_order() {
        let text = r#"{"image_data":"AA==","s3_bucket":"b","s3_key":"k","inferences":[0.5],"trace":{"step":2},"label":"cat"}"#;
        let payload: ImagePayload = serde_json::from_str(text).unwrap();
        assert_eq!(payload.extra.len(), 2);
        assert_eq!(serde_json::to_string(&payload).unwrap(), text);
    }

    #[test]
    fn missing_inferences_is_rejected() {
        let result: Result<ImagePayload, _> = serde_json::from_value(json!({
            "image_data": "AA==",
            "s3_bucket": "b",
            "s3_key": "k",
        }));
        assert!(result.is_err());
    }
}
