//! Mappers translate a loosely-structured row of raw key/value pairs into the
//! named fields of a target schema.
//!
//! Raw keys are matched leniently: a key matches a field when both are equal
//! after trimming surrounding whitespace and lowercasing. The first matching
//! key in the row's own order wins. Keys that are absent (`None`) never match.

mod basic;
mod hash;
mod location;

pub use basic::{normalize_visibility, BasicMetadataMapper, CSV_HEADERS};
pub use hash::HashMapper;
pub use location::{based_near_attributes, label_from_uri, uri_to_sws};

use std::fmt;

use serde::Serialize;

use crate::error::ImportError;

pub const DEFAULT_DELIMITER: &str = "|~|";

/// An ordered row of raw key/value pairs as read from a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetadata {
    entries: Vec<(Option<String>, Option<String>)>,
}

impl RawMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: Option<String>, value: Option<String>) {
        self.entries.push((key, value));
    }

    pub fn entries(&self) -> &[(Option<String>, Option<String>)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Present keys, in row order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(k, _)| k.as_deref())
    }

    /// Exact-key lookup.
    pub fn get_exact(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .and_then(|(_, v)| v.as_deref())
    }

    /// Lenient lookup: the value of the first key whose normalized form
    /// equals the normalized `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find_lenient(name).and_then(|(_, v)| v.as_deref())
    }

    /// True when some key leniently matches `name`, regardless of its value.
    pub fn contains_key(&self, name: &str) -> bool {
        self.find_lenient(name).is_some()
    }

    fn find_lenient(&self, name: &str) -> Option<&(Option<String>, Option<String>)> {
        let wanted = normalize_key(name);
        self.entries.iter().find(|(k, _)| match k {
            Some(key) => normalize_key(key) == wanted,
            None => false,
        })
    }
}

impl<K, V> FromIterator<(K, V)> for RawMetadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (Some(k.into()), Some(v.into())))
                .collect(),
        }
    }
}

impl fmt::Display for RawMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match key {
                Some(key) => write!(f, "{:?}=>", key)?,
                None => write!(f, "nil=>")?,
            }
            match value {
                Some(value) => write!(f, "{:?}", value)?,
                None => write!(f, "nil")?,
            }
        }
        write!(f, "}}")
    }
}

/// The value a mapper produces for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Fields that are single-valued in the target schema.
    Single(Option<String>),
    Multi(Vec<String>),
    /// Nested attribute structures, e.g. `based_near_attributes`.
    Structured(serde_json::Value),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Single(value) => value.as_deref().map_or(true, str::is_empty),
            FieldValue::Multi(values) => values.is_empty(),
            FieldValue::Structured(value) => value.is_null(),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            FieldValue::Single(value) => value.as_deref(),
            _ => None,
        }
    }

    pub fn as_multi(&self) -> Option<&[String]> {
        match self {
            FieldValue::Multi(values) => Some(values),
            _ => None,
        }
    }

    /// Text used when comparing against stored values, or `None` if empty.
    /// Multiple values are joined with `delimiter`.
    pub fn to_lookup_text(&self, delimiter: &str) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        match self {
            FieldValue::Single(value) => value.clone(),
            FieldValue::Multi(values) => Some(values.join(delimiter)),
            FieldValue::Structured(value) => Some(value.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Single(Some(value)) => write!(f, "{}", value),
            FieldValue::Single(None) => write!(f, "nil"),
            FieldValue::Multi(values) => write!(f, "{:?}", values),
            FieldValue::Structured(value) => write!(f, "{}", value),
        }
    }
}

/// Translates raw metadata into a fixed set of named fields.
///
/// `fields` never repeats a name, and `map_field` succeeds for every name it
/// lists. Asking for any other name is a programming error and yields
/// [`ImportError::UnsupportedField`].
pub trait MetadataMapper: Send {
    /// Replaces the mapper's metadata. No merge with the previous row.
    fn set_metadata(&mut self, metadata: RawMetadata);

    fn metadata(&self) -> &RawMetadata;

    fn fields(&self) -> Vec<String>;

    fn has_field(&self, name: &str) -> bool {
        self.fields().iter().any(|field| field == name)
    }

    fn map_field(&self, name: &str) -> Result<FieldValue, ImportError>;

    fn delimiter(&self) -> &str;

    fn set_delimiter(&mut self, delimiter: &str);

    /// Which attached file acts as the record's primary rendering, if any.
    fn representative_file(&self) -> Option<String> {
        None
    }
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Splits packed multi-values. Empty input yields no values; trailing empty
/// pieces are dropped.
pub fn split_values(text: &str, delimiter: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut values: Vec<String> = if delimiter.is_empty() {
        vec![text.to_string()]
    } else {
        text.split(delimiter).map(str::to_string).collect()
    };
    while values.last().is_some_and(|v| v.is_empty()) {
        values.pop();
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_lookup_ignores_case_and_whitespace() {
        for key in [" Title ", "TITLE", "title"] {
            let metadata: RawMetadata = [(key, "Comet in Moominland")].into_iter().collect();
            assert_eq!(metadata.get("title"), Some("Comet in Moominland"));
        }
    }

    #[test]
    fn first_matching_key_wins() {
        let metadata: RawMetadata = [("Title", "first"), ("title", "second")]
            .into_iter()
            .collect();
        assert_eq!(metadata.get("title"), Some("first"));
        assert_eq!(metadata.get_exact("title"), Some("second"));
    }

    #[test]
    fn absent_keys_never_match() {
        let mut metadata = RawMetadata::new();
        metadata.push(None, Some("orphan".into()));
        metadata.push(Some("title".into()), None);
        assert_eq!(metadata.get(""), None);
        assert!(metadata.contains_key("title"));
        assert_eq!(metadata.get("title"), None);
        assert_eq!(metadata.keys().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn splits_on_delimiter() {
        assert_eq!(
            split_values("English|~|French|~|Japanese", DEFAULT_DELIMITER),
            vec!["English", "French", "Japanese"]
        );
        assert!(split_values("", DEFAULT_DELIMITER).is_empty());
        assert_eq!(split_values("a|~|", DEFAULT_DELIMITER), vec!["a"]);
        assert_eq!(split_values("a;b", ";"), vec!["a", "b"]);
    }

    #[test]
    fn field_value_serializes_untagged() {
        let single = serde_json::to_value(FieldValue::Single(None)).unwrap();
        assert!(single.is_null());
        let multi = serde_json::to_value(FieldValue::Multi(vec!["a".into()])).unwrap();
        assert_eq!(multi, serde_json::json!(["a"]));
    }

    #[test]
    fn lookup_text_is_none_for_empty_values() {
        assert_eq!(FieldValue::Multi(vec![]).to_lookup_text(DEFAULT_DELIMITER), None);
        assert_eq!(FieldValue::Single(Some(String::new())).to_lookup_text(DEFAULT_DELIMITER), None);
        assert_eq!(
            FieldValue::Multi(vec!["abc".into()]).to_lookup_text(DEFAULT_DELIMITER).as_deref(),
            Some("abc")
        );
        let values = FieldValue::Multi(vec!["abc".into(), "def".into()]);
        assert_eq!(values.to_lookup_text(";").as_deref(), Some("abc;def"));
    }

    #[test]
    fn display_shows_raw_row() {
        let metadata: RawMetadata = [("title", "A")].into_iter().collect();
        assert_eq!(metadata.to_string(), r#"{"title"=>"A"}"#);
    }
}
