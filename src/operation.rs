//! Crop and pick operations, decoded from untyped JSON records.
//!
//! A save request from the UI carries a list of operations:
//!
//! ```json
//! {"operations": [
//!   {"type": "crop", "filename": "photo.jpg", "crop": {"x": 0.1, "y": 0.1, "w": 0.5, "h": 0.5}},
//!   {"type": "pick", "filename": "other.jpg"}
//! ]}
//! ```
//!
//! Decoding peeks the `type` discriminant first and only then decodes the
//! variant payload, so an unknown kind is reported as such instead of as a
//! confusing missing-field error, and nothing ever defaults to a variant.
//! Range checks on the crop rectangle are left to the executor.

use crate::crop::CropRect;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("operation has no string \"type\" field")]
    MissingKind,
    #[error("unknown operation {0:?}")]
    UnknownKind(String),
    #[error("invalid {kind} operation: {source}")]
    Invalid {
        kind: OperationKind,
        source: serde_json::Error,
    },
    #[error("operation #{index}: {source}")]
    Item {
        index: usize,
        source: Box<DecodeError>,
    },
    #[error("expected an operation list or {{\"operations\": [...]}}")]
    NotABatch,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Discriminant of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Crop,
    Pick,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Pick => "pick",
        }
    }

    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "crop" => Some(Self::Crop),
            "pick" => Some(Self::Pick),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crop `filename` to `crop` and save the result as a new file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropOperation {
    pub filename: String,
    pub crop: CropRect,
}

/// Keep `filename` as-is by copying it to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickOperation {
    pub filename: String,
}

/// A single decision taken in the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    Crop(CropOperation),
    Pick(PickOperation),
}

impl Operation {
    pub fn crop(filename: impl Into<String>, crop: CropRect) -> Self {
        Self::Crop(CropOperation {
            filename: filename.into(),
            crop,
        })
    }

    pub fn pick(filename: impl Into<String>) -> Self {
        Self::Pick(PickOperation {
            filename: filename.into(),
        })
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Crop(_) => OperationKind::Crop,
            Self::Pick(_) => OperationKind::Pick,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::Crop(op) => &op.filename,
            Self::Pick(op) => &op.filename,
        }
    }

    /// Decode one operation from an untyped JSON record.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingKind)?;
        let kind =
            OperationKind::parse(kind).ok_or_else(|| DecodeError::UnknownKind(kind.to_string()))?;

        let invalid = |source| DecodeError::Invalid { kind, source };
        match kind {
            OperationKind::Crop => serde_json::from_value(value)
                .map(Self::Crop)
                .map_err(invalid),
            OperationKind::Pick => serde_json::from_value(value)
                .map(Self::Pick)
                .map_err(invalid),
        }
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Decode a batch from either `{"operations": [...]}` or a bare array.
pub fn decode_batch(json: &str) -> Result<Vec<Operation>, DecodeError> {
    let value: Value = serde_json::from_str(json)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("operations") {
            Some(Value::Array(items)) => items,
            _ => return Err(DecodeError::NotABatch),
        },
        _ => return Err(DecodeError::NotABatch),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            Operation::from_value(item).map_err(|e| DecodeError::Item {
                index,
                source: Box::new(e),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_crop() {
        let op = Operation::from_value(json!({
            "type": "crop",
            "filename": "photo.jpg",
            "crop": {"x": 0.1, "y": 0.2, "w": 0.5, "h": 0.25}
        }))
        .unwrap();

        assert_eq!(
            op,
            Operation::crop("photo.jpg", CropRect::new(0.1, 0.2, 0.5, 0.25))
        );
        assert_eq!(op.kind(), OperationKind::Crop);
        assert_eq!(op.filename(), "photo.jpg");
    }

    #[test]
    fn decodes_pick() {
        let op = Operation::from_value(json!({"type": "pick", "filename": "a/b.jpg"})).unwrap();
        assert_eq!(op, Operation::pick("a/b.jpg"));
    }

    #[test]
    fn crop_accepts_integer_coordinates() {
        let op = Operation::from_value(json!({
            "type": "crop",
            "filename": "photo.jpg",
            "crop": {"x": 0, "y": 0, "w": 1, "h": 1}
        }))
        .unwrap();
        assert_eq!(
            op,
            Operation::crop("photo.jpg", CropRect::new(0.0, 0.0, 1.0, 1.0))
        );
    }

    #[test]
    fn crop_is_not_range_checked_at_decode() {
        let op = Operation::from_value(json!({
            "type": "crop",
            "filename": "photo.jpg",
            "crop": {"x": -1.0, "y": 2.0, "w": 0.0, "h": 0.0}
        }));
        assert!(op.is_ok());
    }

    #[test]
    fn unknown_kind_names_the_discriminant() {
        let err = Operation::from_value(json!({"type": "resize", "filename": "a.jpg"}))
            .unwrap_err();
        assert!(matches!(&err, DecodeError::UnknownKind(k) if k == "resize"));
        assert!(err.to_string().contains("resize"));
    }

    #[test]
    fn missing_or_non_string_kind() {
        for value in [
            json!({"filename": "a.jpg"}),
            json!({"type": 3, "filename": "a.jpg"}),
            json!("pick"),
        ] {
            assert!(matches!(
                Operation::from_value(value).unwrap_err(),
                DecodeError::MissingKind
            ));
        }
    }

    #[test]
    fn malformed_crop_fields() {
        let err = Operation::from_value(json!({
            "type": "crop",
            "filename": "photo.jpg",
            "crop": {"x": "left", "y": 0, "w": 1, "h": 1}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Invalid {
                kind: OperationKind::Crop,
                ..
            }
        ));
    }

    #[test]
    fn crop_without_rectangle_is_invalid() {
        let err = Operation::from_value(json!({"type": "crop", "filename": "photo.jpg"}))
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Invalid {
                kind: OperationKind::Crop,
                ..
            }
        ));
    }

    #[test]
    fn pick_without_filename_is_invalid() {
        let err = Operation::from_value(json!({"type": "pick"})).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Invalid {
                kind: OperationKind::Pick,
                ..
            }
        ));
    }

    #[test]
    fn encode_then_decode_crop() {
        let op = Operation::crop("photo.jpg", CropRect::new(0.1, 0.1, 0.5, 0.5));
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "crop");
        assert_eq!(json["crop"]["w"], 0.5);

        let decoded: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn serde_deserialize_reports_unknown_kind() {
        let result: Result<Operation, _> =
            serde_json::from_str(r#"{"type": "rotate", "filename": "a.jpg"}"#);
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("rotate"), "{msg}");
    }

    #[test]
    fn decode_batch_wrapped_and_bare() {
        let wrapped = r#"{"operations": [
            {"type": "pick", "filename": "a.jpg"},
            {"type": "crop", "filename": "b.jpg", "crop": {"x": 0, "y": 0, "w": 0.5, "h": 0.5}}
        ]}"#;
        let ops = decode_batch(wrapped).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].kind(), OperationKind::Pick);
        assert_eq!(ops[1].kind(), OperationKind::Crop);

        let bare = r#"[{"type": "pick", "filename": "a.jpg"}]"#;
        assert_eq!(decode_batch(bare).unwrap(), vec![Operation::pick("a.jpg")]);
    }

    #[test]
    fn decode_batch_reports_failing_index() {
        let json = r#"[{"type": "pick", "filename": "a.jpg"}, {"type": "flip"}]"#;
        let err = decode_batch(json).unwrap_err();
        match err {
            DecodeError::Item { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, DecodeError::UnknownKind(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decode_batch_rejects_other_shapes() {
        assert!(matches!(
            decode_batch(r#"{"ops": []}"#).unwrap_err(),
            DecodeError::NotABatch
        ));
        assert!(matches!(
            decode_batch("42").unwrap_err(),
            DecodeError::NotABatch
        ));
        assert!(matches!(
            decode_batch("{not json").unwrap_err(),
            DecodeError::Json(_)
        ));
    }

    #[test]
    fn empty_batch_decodes() {
        assert!(decode_batch(r#"{"operations": []}"#).unwrap().is_empty());
    }
}
