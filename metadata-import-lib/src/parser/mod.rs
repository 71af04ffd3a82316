//! Parsers turn an input source into a lazy, restartable sequence of
//! [`InputRecord`]s and own the validators that check that source.

mod csv_parser;
mod excel;

pub use csv_parser::{read_csv_table, CsvParser, CsvTable};
pub use excel::{ExcelReader, XlsxParser};

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ImportConfig;
use crate::error::{ImportError, ValidationState};
use crate::mapper::{BasicMetadataMapper, MetadataMapper};
use crate::record::InputRecord;
use crate::validator::{ValidationError, Validator};

pub type Records<'a> = Box<dyn Iterator<Item = InputRecord> + 'a>;

/// Builds a fresh mapper for each record.
pub type MapperFactory = Arc<dyn Fn() -> Box<dyn MetadataMapper> + Send + Sync>;

pub fn basic_mapper_factory() -> MapperFactory {
    Arc::new(|| Box::new(BasicMetadataMapper::new()) as Box<dyn MetadataMapper>)
}

pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// A named, rewindable byte source.
pub struct InputSource {
    name: PathBuf,
    reader: Box<dyn ReadSeek>,
}

impl InputSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self {
            name: path.to_path_buf(),
            reader: Box::new(file),
        })
    }

    pub fn from_reader(name: impl Into<PathBuf>, reader: impl ReadSeek + 'static) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(reader),
        }
    }

    pub fn from_bytes(name: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_reader(name, Cursor::new(bytes.into()))
    }

    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Reads the whole source from the beginning, leaving the cursor rewound.
    pub fn read_all(&mut self) -> Result<Vec<u8>, ImportError> {
        self.reader.seek(SeekFrom::Start(0))?;
        let mut content = Vec::new();
        self.reader.read_to_end(&mut content)?;
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(content)
    }
}

/// Validators and the errors they have reported so far.
#[derive(Default)]
pub struct ParserState {
    validators: Vec<Box<dyn Validator>>,
    validation: ValidationState,
}

impl ParserState {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self {
            validators,
            validation: ValidationState::new(),
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        self.validation.get_errors()
    }
}

pub trait Parser {
    /// Records from the start of the source. Each call re-reads the source.
    fn records(&mut self) -> Result<Records<'_>, ImportError>;

    /// The source as CSV bytes, read from the beginning.
    fn raw_content(&mut self) -> Result<Vec<u8>, ImportError>;

    fn source_name(&self) -> &Path;

    fn state(&self) -> &ParserState;

    fn state_mut(&mut self) -> &mut ParserState;

    fn as_dyn_parser(&mut self) -> &mut dyn Parser;

    fn errors(&self) -> &[ValidationError] {
        self.state().errors()
    }

    fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    fn add_validator(&mut self, validator: Box<dyn Validator>) {
        self.state_mut().validators.push(validator);
    }

    fn validator_names(&self) -> Vec<&'static str> {
        self.state().validators.iter().map(|v| v.name()).collect()
    }

    /// Runs every validator in order, appending what they report.
    fn validate(&mut self) -> bool {
        let validators = std::mem::take(&mut self.state_mut().validators);
        let mut found = Vec::new();
        for validator in &validators {
            tracing::debug!(
                "Running {} on {}",
                validator.name(),
                self.source_name().display()
            );
            found.extend(validator.validate(self.as_dyn_parser()));
        }
        let state = self.state_mut();
        state.validators = validators;
        state.validation.extend(found);
        self.is_valid()
    }

    /// [`Parser::validate`], failing with every collected error when invalid.
    fn validate_strict(&mut self) -> Result<(), ImportError> {
        if self.validate() {
            Ok(())
        } else {
            Err(ImportError::Validation(self.errors().to_vec()))
        }
    }

    /// Number of records currently in the source.
    fn record_count(&mut self) -> Result<usize, ImportError> {
        Ok(self.records()?.count())
    }
}

/// Shared construction inputs for registered parsers.
#[derive(Clone)]
pub struct ParserOptions {
    pub config: ImportConfig,
    pub mapper_factory: MapperFactory,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            config: ImportConfig::default(),
            mapper_factory: basic_mapper_factory(),
        }
    }
}

pub struct ParserRegistration {
    pub name: &'static str,
    pub matches: fn(&InputSource) -> bool,
    pub build: fn(InputSource, &ParserOptions) -> Box<dyn Parser>,
}

/// Ordered parser registry. Later registrations are probed first.
pub struct ParserRegistry {
    registrations: Vec<ParserRegistration>,
    options: ParserOptions,
}

impl ParserRegistry {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            registrations: Vec::new(),
            options,
        }
    }

    /// The `.xlsx` and `.csv` parsers.
    pub fn with_defaults(options: ParserOptions) -> Self {
        let mut registry = Self::new(options);
        registry.register(XlsxParser::registration());
        registry.register(CsvParser::registration());
        registry
    }

    pub fn register(&mut self, registration: ParserRegistration) {
        tracing::debug!("Registering parser: {}", registration.name);
        self.registrations.push(registration);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|r| r.name).collect()
    }

    pub fn parser_for(&self, source: InputSource) -> Result<Box<dyn Parser>, ImportError> {
        let registration = self
            .registrations
            .iter()
            .rev()
            .find(|r| (r.matches)(&source))
            .ok_or_else(|| ImportError::UnsupportedInput(source.name().display().to_string()))?;
        tracing::info!(
            "Using {} for {}",
            registration.name,
            source.name().display()
        );
        Ok((registration.build)(source, &self.options))
    }

    pub fn parser_for_path<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn Parser>, ImportError> {
        self.parser_for(InputSource::open(path)?)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults(ParserOptions::default())
    }
}
