use std::path::Path;

use csv::StringRecord;

use super::{
    basic_mapper_factory, InputSource, MapperFactory, Parser, ParserOptions, ParserRegistration,
    ParserState, Records,
};
use crate::error::ImportError;
use crate::mapper::RawMetadata;
use crate::record::InputRecord;
use crate::utils::dotted_extension;
use crate::validator::{CsvFormatValidator, TitleValidator, Validator};

/// Header row plus data rows of a fully-read CSV document.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl CsvTable {
    /// Pairs each cell with its header. Blank headers become absent keys and
    /// blank cells absent values.
    pub fn metadata_for(&self, row: &StringRecord) -> RawMetadata {
        let mut metadata = RawMetadata::new();
        for (header, cell) in self.headers.iter().zip(row.iter()) {
            let key = (!header.trim().is_empty()).then(|| header.to_string());
            let value = (!cell.is_empty()).then(|| cell.to_string());
            metadata.push(key, value);
        }
        metadata
    }
}

/// Reads every row. The first row is the header. Fails on the first
/// structurally malformed row.
pub fn read_csv_table(content: &[u8]) -> Result<CsvTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(content);

    let mut rows = reader.records();
    let headers = match rows.next() {
        Some(headers) => headers?,
        None => return Ok(CsvTable::default()),
    };
    let rows = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(CsvTable { headers, rows })
}

/// Turns CSV bytes into records. Malformed input yields no records at all.
pub(crate) fn records_from_csv<'a>(
    content: &[u8],
    source_name: &Path,
    mapper_factory: &'a MapperFactory,
) -> Records<'a> {
    let mut table = match read_csv_table(content) {
        Ok(table) => table,
        Err(e) => {
            tracing::warn!(
                "Skipping records from malformed CSV {}: {}",
                source_name.display(),
                e
            );
            return Box::new(std::iter::empty());
        }
    };
    tracing::debug!(
        "Read {} rows from {}",
        table.rows.len(),
        source_name.display()
    );
    let rows = std::mem::take(&mut table.rows);
    Box::new(rows.into_iter().map(move |row| {
        InputRecord::from_metadata(table.metadata_for(&row), mapper_factory())
    }))
}

/// Parses `.csv` sources.
pub struct CsvParser {
    source: InputSource,
    mapper_factory: MapperFactory,
    state: ParserState,
}

impl CsvParser {
    pub const EXTENSION: &'static str = ".csv";

    /// A parser with the default validators: CSV well-formedness, then titles.
    pub fn new(source: InputSource, options: &ParserOptions) -> Self {
        let validators: Vec<Box<dyn Validator>> = vec![
            Box::new(CsvFormatValidator::new(options.config.error_stream.clone())),
            Box::new(TitleValidator::new(options.config.error_stream.clone())),
        ];
        Self {
            source,
            mapper_factory: options.mapper_factory.clone(),
            state: ParserState::new(validators),
        }
    }

    pub fn without_validators(source: InputSource) -> Self {
        Self {
            source,
            mapper_factory: basic_mapper_factory(),
            state: ParserState::default(),
        }
    }

    pub fn with_mapper_factory(mut self, mapper_factory: MapperFactory) -> Self {
        self.mapper_factory = mapper_factory;
        self
    }

    pub fn matches(source: &InputSource) -> bool {
        dotted_extension(source.name()).as_deref() == Some(Self::EXTENSION)
    }

    pub fn registration() -> ParserRegistration {
        ParserRegistration {
            name: "csv",
            matches: Self::matches,
            build: Self::build,
        }
    }

    fn build(source: InputSource, options: &ParserOptions) -> Box<dyn Parser> {
        Box::new(Self::new(source, options))
    }
}

impl Parser for CsvParser {
    fn records(&mut self) -> Result<Records<'_>, ImportError> {
        let content = self.source.read_all()?;
        Ok(records_from_csv(
            &content,
            self.source.name(),
            &self.mapper_factory,
        ))
    }

    fn raw_content(&mut self) -> Result<Vec<u8>, ImportError> {
        self.source.read_all()
    }

    fn source_name(&self) -> &Path {
        self.source.name()
    }

    fn state(&self) -> &ParserState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ParserState {
        &mut self.state
    }

    fn as_dyn_parser(&mut self) -> &mut dyn Parser {
        self
    }
}
