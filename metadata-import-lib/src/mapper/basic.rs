use super::{split_values, FieldValue, MetadataMapper, RawMetadata, DEFAULT_DELIMITER};
use crate::error::ImportError;

/// CSV headers whose spelling differs from the field name they feed.
pub const CSV_HEADERS: &[(&str, &str)] = &[
    ("resource_type", "resource type"),
    ("description", "abstract or summary"),
    ("rights_statement", "rights statement"),
    ("date_created", "date created"),
    ("based_near", "location"),
    ("related_url", "related url"),
];

type Accessor = fn(&BasicMetadataMapper, &str) -> FieldValue;

struct FieldSpec {
    name: &'static str,
    accessor: Accessor,
}

const fn single(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        accessor: BasicMetadataMapper::single_value,
    }
}

const fn multi(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        accessor: BasicMetadataMapper::split_value,
    }
}

const CORE_FIELDS: &[FieldSpec] = &[
    single("depositor"),
    multi("title"),
    single("date_uploaded"),
    single("date_modified"),
];

const BASIC_FIELDS: &[FieldSpec] = &[
    single("label"),
    single("relative_path"),
    single("import_url"),
    multi("resource_type"),
    multi("creator"),
    multi("contributor"),
    multi("description"),
    multi("keyword"),
    multi("license"),
    multi("rights_statement"),
    multi("publisher"),
    multi("date_created"),
    multi("subject"),
    multi("language"),
    multi("identifier"),
    multi("based_near"),
    multi("related_url"),
    multi("bibliographic_citation"),
    multi("source"),
];

const SINGLETON_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "visibility",
        accessor: BasicMetadataMapper::visibility_value,
    },
    multi("files"),
];

/// Maps rows onto the work schema: core fields, basic descriptive fields,
/// `visibility` and the `files` attachment list.
///
/// The field list is fixed; a field missing from the row still maps (to
/// `None` or an empty list).
#[derive(Debug, Clone)]
pub struct BasicMetadataMapper {
    metadata: RawMetadata,
    delimiter: String,
    institution_name: Option<String>,
}

impl Default for BasicMetadataMapper {
    fn default() -> Self {
        Self {
            metadata: RawMetadata::new(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            institution_name: None,
        }
    }
}

impl BasicMetadataMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Visibility values equal to this name normalize to `authenticated`.
    pub fn with_institution_name(mut self, name: impl Into<String>) -> Self {
        self.institution_name = Some(name.into());
        self
    }

    pub fn institution_name(&self) -> Option<&str> {
        self.institution_name.as_deref()
    }

    fn specs() -> impl Iterator<Item = &'static FieldSpec> {
        CORE_FIELDS
            .iter()
            .chain(BASIC_FIELDS)
            .chain(SINGLETON_FIELDS)
    }

    fn spec(name: &str) -> Option<&'static FieldSpec> {
        Self::specs().find(|spec| spec.name == name)
    }

    /// Raw text for a field, trying its CSV header alias before the field name.
    fn raw(&self, name: &str) -> Option<&str> {
        let alias = CSV_HEADERS
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, header)| *header);
        alias
            .and_then(|header| self.metadata.get(header))
            .or_else(|| self.metadata.get(name))
    }

    fn single_value(&self, name: &str) -> FieldValue {
        FieldValue::Single(self.raw(name).map(str::to_string))
    }

    fn split_value(&self, name: &str) -> FieldValue {
        FieldValue::Multi(split_values(
            self.raw(name).unwrap_or_default(),
            &self.delimiter,
        ))
    }

    fn visibility_value(&self, name: &str) -> FieldValue {
        FieldValue::Single(
            self.raw(name)
                .map(|value| normalize_visibility(value, self.institution_name.as_deref())),
        )
    }
}

impl MetadataMapper for BasicMetadataMapper {
    fn set_metadata(&mut self, metadata: RawMetadata) {
        self.metadata = metadata;
    }

    fn metadata(&self) -> &RawMetadata {
        &self.metadata
    }

    fn fields(&self) -> Vec<String> {
        Self::specs().map(|spec| spec.name.to_string()).collect()
    }

    fn has_field(&self, name: &str) -> bool {
        Self::spec(name).is_some()
    }

    fn map_field(&self, name: &str) -> Result<FieldValue, ImportError> {
        let spec = Self::spec(name).ok_or_else(|| ImportError::UnsupportedField(name.to_string()))?;
        Ok((spec.accessor)(self, spec.name))
    }

    fn delimiter(&self) -> &str {
        &self.delimiter
    }

    fn set_delimiter(&mut self, delimiter: &str) {
        self.delimiter = delimiter.to_string();
    }

    fn representative_file(&self) -> Option<String> {
        self.metadata
            .get("representative_file")
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
    }
}

/// Maps visibility synonyms onto `open`, `authenticated` or `restricted`,
/// ignoring case. Anything unrecognized is returned unchanged.
pub fn normalize_visibility(value: &str, institution_name: Option<&str>) -> String {
    let normalized = value.trim().to_lowercase();
    if let Some(institution) = institution_name {
        if normalized == institution.trim().to_lowercase() {
            return "authenticated".to_string();
        }
    }
    match normalized.as_str() {
        "open" | "public" => "open".to_string(),
        "authenticated" | "registered" | "institution" => "authenticated".to_string(),
        "restricted" | "private" => "restricted".to_string(),
        _ => value.to_string(),
    }
}
