//! Bulk Metadata Import Library
//!
//! This library reads tabular metadata (CSV or `.xlsx`), maps each row onto a
//! work schema, validates the batch and hands every record to a repository,
//! creating new works or updating existing ones matched on a configured field.

mod config;
mod error;
mod importer;
mod mapper;
mod parser;
mod record;
mod repository;
mod streams;
mod utils;
mod validator;

pub use config::{
    DepositorPolicy, ImportConfig, ImportSettings, DEFAULT_DEPOSITOR, DEFAULT_IMPORT_PATH,
    IMPORT_PATH_ENV,
};
pub use error::{ImportError, RepositoryError, ValidationState};
pub use importer::{
    find_file_path, BatchCounters, Importer, RecordImport, RecordImporter, WorkRecordImporter,
};
pub use mapper::{
    based_near_attributes, label_from_uri, normalize_key, normalize_visibility, split_values,
    uri_to_sws, BasicMetadataMapper, FieldValue, HashMapper, MetadataMapper, RawMetadata,
    CSV_HEADERS, DEFAULT_DELIMITER,
};
pub use parser::{
    basic_mapper_factory, read_csv_table, CsvParser, CsvTable, ExcelReader, InputSource,
    MapperFactory, Parser, ParserOptions, ParserRegistration, ParserRegistry, ParserState,
    ReadSeek, Records, XlsxParser,
};
pub use record::{Attributes, InputRecord};
pub use repository::{Depositor, FieldFailure, Repository, SaveOutcome, UploadRef};
pub use streams::{
    log_path_from_env, FormattedMessageStream, LogStream, MemoryStream, MessageStream, Severity,
    SharedStream, TracingStream, DEFAULT_LOG_PATH, IMPORT_LOG_ENV,
};
pub use validator::{
    AlwaysInvalidValidator, CsvFormatValidator, NullValidator, TitleValidator, ValidationError,
    Validator,
};
