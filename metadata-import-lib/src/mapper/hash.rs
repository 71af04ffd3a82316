use super::{split_values, FieldValue, MetadataMapper, RawMetadata, DEFAULT_DELIMITER};
use crate::error::ImportError;

/// A generic mapper whose fields are whatever keys the metadata carries.
///
/// Every field is multi-valued.
#[derive(Debug, Clone)]
pub struct HashMapper {
    metadata: RawMetadata,
    delimiter: String,
}

impl Default for HashMapper {
    fn default() -> Self {
        Self {
            metadata: RawMetadata::new(),
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

impl HashMapper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataMapper for HashMapper {
    fn set_metadata(&mut self, metadata: RawMetadata) {
        self.metadata = metadata;
    }

    fn metadata(&self) -> &RawMetadata {
        &self.metadata
    }

    fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for key in self.metadata.keys() {
            if !fields.iter().any(|f| f == key) {
                fields.push(key.to_string());
            }
        }
        fields
    }

    fn map_field(&self, name: &str) -> Result<FieldValue, ImportError> {
        if !self.has_field(name) {
            return Err(ImportError::UnsupportedField(name.to_string()));
        }
        // Field names are the keys as written, so look them up exactly.
        let raw = self.metadata.get_exact(name).unwrap_or_default();
        Ok(FieldValue::Multi(split_values(raw, &self.delimiter)))
    }

    fn delimiter(&self) -> &str {
        &self.delimiter
    }

    fn set_delimiter(&mut self, delimiter: &str) {
        self.delimiter = delimiter.to_string();
    }
}
