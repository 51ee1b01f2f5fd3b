//! Package metadata as stored and as served.
//!
//! Values in the store come in two encodings: a JSON object
//! (`{"source": ..., "vcs": ..., "defaultBranch": ...}`) and a legacy bare
//! string holding only the source. [`StoredValue`] makes the distinction
//! explicit; [`PackageMetadata`] is the normalized form every renderer sees.
use serde::{Deserialize, Serialize};

/// VCS assumed when a record does not name one.
pub const DEFAULT_VCS: &str = "git";
/// Branch assumed when a record does not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// Structured record exactly as it sits in the store; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<String>,
    #[serde(
        default,
        rename = "defaultBranch",
        alias = "default_branch",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_branch: Option<String>,
}

impl StoredRecord {
    /// Record carrying only a source, as produced by the legacy string encoding.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Default::default()
        }
    }

    /// Fill `vcs` and `default_branch` with their defaults when unset.
    ///
    /// Applying this more than once yields the same record.
    pub fn with_defaults(mut self) -> Self {
        self.vcs.get_or_insert_with(|| DEFAULT_VCS.to_string());
        self.default_branch
            .get_or_insert_with(|| DEFAULT_BRANCH.to_string());
        self
    }
}

/// What a single store lookup produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// A JSON object record
    Structured(StoredRecord),
    /// Legacy plain-text value, interpreted as the source
    Raw(String),
    /// Nothing usable under the key
    Absent,
}

impl StoredValue {
    /// Decode the raw bytes returned by a store lookup.
    ///
    /// A JSON object decodes as [`StoredValue::Structured`], a JSON string as
    /// [`StoredValue::Raw`] without its quotes and JSON `null` as
    /// [`StoredValue::Absent`]. Anything else that is valid UTF-8 is kept
    /// verbatim as [`StoredValue::Raw`]; bytes that are not text are absent.
    pub fn decode(raw: Option<&[u8]>) -> Self {
        let Some(bytes) = raw else {
            return StoredValue::Absent;
        };

        match serde_json::from_slice::<serde_json::Value>(bytes) {
            Ok(serde_json::Value::Null) => return StoredValue::Absent,
            Ok(serde_json::Value::String(text)) => return StoredValue::Raw(text),
            Ok(value @ serde_json::Value::Object(_)) => {
                match serde_json::from_value::<StoredRecord>(value) {
                    Ok(record) => return StoredValue::Structured(record),
                    Err(e) => tracing::debug!("Stored object is not a package record: {}", e),
                }
            }
            // Numbers, booleans, arrays and plain text stay legacy text
            _ => {}
        }

        match std::str::from_utf8(bytes) {
            Ok(text) => StoredValue::Raw(text.to_string()),
            Err(e) => {
                tracing::warn!("Stored value is neither a JSON record nor text: {}", e);
                StoredValue::Absent
            }
        }
    }

    /// Normalize into servable metadata; `None` when the value is absent.
    pub fn into_metadata(self) -> Option<PackageMetadata> {
        let record = match self {
            StoredValue::Structured(record) => record,
            StoredValue::Raw(source) => StoredRecord::from_source(source),
            StoredValue::Absent => return None,
        };
        Some(PackageMetadata::from(record))
    }
}

/// Normalized package metadata; all fields populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Repository host and path, without a scheme (e.g. `github.com/acme/foo`)
    pub source: String,
    /// Version control system (`git`, `hg`, ...)
    pub vcs: String,
    /// Branch used for browse URLs
    #[serde(rename = "defaultBranch")]
    pub default_branch: String,
}

impl From<StoredRecord> for PackageMetadata {
    /// A record without a source keeps an empty one; only `vcs` and
    /// `default_branch` have defaults.
    fn from(record: StoredRecord) -> Self {
        let record = record.with_defaults();
        Self {
            source: record.source.unwrap_or_default(),
            vcs: record.vcs.unwrap_or_default(),
            default_branch: record.default_branch.unwrap_or_default(),
        }
    }
}

/// A successful resolution: the key that matched and its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub key: String,
    pub metadata: PackageMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_string_decodes_to_defaults() {
        let value = StoredValue::decode(Some(b"github.com/acme/foo"));
        assert_eq!(value, StoredValue::Raw("github.com/acme/foo".to_string()));

        let metadata = value.into_metadata().unwrap();
        assert_eq!(
            metadata,
            PackageMetadata {
                source: "github.com/acme/foo".to_string(),
                vcs: "git".to_string(),
                default_branch: "main".to_string(),
            }
        );
    }

    #[test]
    fn test_structured_record_keeps_explicit_fields() {
        let raw = br#"{"source":"hg.example.org/tools","vcs":"hg","defaultBranch":"master"}"#;
        let metadata = StoredValue::decode(Some(raw)).into_metadata().unwrap();

        assert_eq!(metadata.source, "hg.example.org/tools");
        assert_eq!(metadata.vcs, "hg");
        assert_eq!(metadata.default_branch, "master");
    }

    #[test]
    fn test_structured_record_partial_fields() {
        let raw = br#"{"source":"github.com/acme/bar","defaultBranch":"develop"}"#;
        let metadata = StoredValue::decode(Some(raw)).into_metadata().unwrap();

        assert_eq!(metadata.vcs, "git");
        assert_eq!(metadata.default_branch, "develop");
    }

    #[test]
    fn test_snake_case_branch_alias() {
        let raw = br#"{"source":"github.com/acme/baz","default_branch":"trunk"}"#;
        let metadata = StoredValue::decode(Some(raw)).into_metadata().unwrap();
        assert_eq!(metadata.default_branch, "trunk");
    }

    #[test]
    fn test_record_without_source_keeps_empty_source() {
        let metadata = StoredValue::decode(Some(br#"{"vcs":"svn"}"#))
            .into_metadata()
            .unwrap();
        assert_eq!(metadata.source, "");
        assert_eq!(metadata.vcs, "svn");
    }

    #[test]
    fn test_non_object_json_falls_back_to_raw_text() {
        // A number is valid JSON but not a record
        let value = StoredValue::decode(Some(b"42"));
        assert_eq!(value, StoredValue::Raw("42".to_string()));
    }

    #[test]
    fn test_json_null_is_absent() {
        let value = StoredValue::decode(Some(b"null"));
        assert_eq!(value, StoredValue::Absent);
        assert!(value.into_metadata().is_none());
    }

    #[test]
    fn test_json_string_decodes_without_quotes() {
        let value = StoredValue::decode(Some(br#""github.com/acme/foo""#));
        assert_eq!(value, StoredValue::Raw("github.com/acme/foo".to_string()));
        assert_eq!(value.into_metadata().unwrap().source, "github.com/acme/foo");
    }

    #[test]
    fn test_from_record_applies_defaults() {
        let metadata = PackageMetadata::from(StoredRecord::from_source("github.com/acme/foo"));
        assert_eq!(metadata.vcs, DEFAULT_VCS);
        assert_eq!(metadata.default_branch, DEFAULT_BRANCH);
    }

    #[test]
    fn test_invalid_utf8_is_absent() {
        let value = StoredValue::decode(Some(&[0xff, 0xfe, 0xfd]));
        assert_eq!(value, StoredValue::Absent);
        assert!(value.into_metadata().is_none());
    }

    #[test]
    fn test_missing_key_is_absent() {
        assert_eq!(StoredValue::decode(None), StoredValue::Absent);
    }

    #[test]
    fn test_with_defaults_is_idempotent() {
        let records = [
            StoredRecord::default(),
            StoredRecord::from_source("github.com/acme/foo"),
            StoredRecord {
                source: Some("x.org/y".to_string()),
                vcs: Some("hg".to_string()),
                default_branch: None,
            },
        ];

        for record in records {
            let once = record.clone().with_defaults();
            let twice = once.clone().with_defaults();
            assert_eq!(once, twice);
            assert_eq!(PackageMetadata::from(once), PackageMetadata::from(twice));
        }
    }
}
