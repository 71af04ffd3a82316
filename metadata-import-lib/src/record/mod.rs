use std::collections::BTreeMap;
use std::fmt;

use crate::error::ImportError;
use crate::mapper::{BasicMetadataMapper, FieldValue, MetadataMapper, RawMetadata};

/// Field name to mapped value; the hand-off artifact for persistence.
pub type Attributes = BTreeMap<String, FieldValue>;

/// One source row together with the mapper that interprets it.
pub struct InputRecord {
    mapper: Box<dyn MetadataMapper>,
}

impl InputRecord {
    pub fn new(mapper: Box<dyn MetadataMapper>) -> Self {
        Self { mapper }
    }

    /// Hands `metadata` to `mapper` and wraps the result.
    pub fn from_metadata(metadata: RawMetadata, mut mapper: Box<dyn MetadataMapper>) -> Self {
        mapper.set_metadata(metadata);
        Self { mapper }
    }

    /// Uses a default [`BasicMetadataMapper`].
    pub fn from_basic(metadata: RawMetadata) -> Self {
        Self::from_metadata(metadata, Box::new(BasicMetadataMapper::new()))
    }

    pub fn mapper(&self) -> &dyn MetadataMapper {
        self.mapper.as_ref()
    }

    pub fn metadata(&self) -> &RawMetadata {
        self.mapper.metadata()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.mapper.has_field(name)
    }

    pub fn field(&self, name: &str) -> Result<FieldValue, ImportError> {
        self.mapper.map_field(name)
    }

    /// The record's titles; empty when the mapper has no `title` field.
    pub fn titles(&self) -> Vec<String> {
        if !self.has_field("title") {
            return Vec::new();
        }
        match self.field("title") {
            Ok(FieldValue::Multi(values)) => values,
            Ok(FieldValue::Single(Some(value))) => vec![value],
            _ => Vec::new(),
        }
    }

    /// Every mapper field mapped to its value, computed fresh on each call.
    pub fn attributes(&self) -> Result<Attributes, ImportError> {
        self.mapper
            .fields()
            .into_iter()
            .map(|name| {
                let value = self.mapper.map_field(&name)?;
                Ok((name, value))
            })
            .collect()
    }

    pub fn representative_file(&self) -> Option<String> {
        self.mapper.representative_file()
    }
}

impl fmt::Display for InputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let titles = self.titles();
        if titles.is_empty() {
            write!(f, "{}", self.metadata())
        } else {
            write!(f, "{:?}", titles)
        }
    }
}

impl fmt::Debug for InputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputRecord")
            .field("metadata", self.metadata())
            .finish()
    }
}
