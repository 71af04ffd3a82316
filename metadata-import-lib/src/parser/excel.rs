use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Reader, Xlsx};
use csv::WriterBuilder;

use super::csv_parser::records_from_csv;
use super::{
    InputSource, MapperFactory, Parser, ParserOptions, ParserRegistration, ParserState, Records,
};
use crate::error::ImportError;
use crate::utils::dotted_extension;
use crate::validator::{CsvFormatValidator, TitleValidator, Validator};

pub struct ExcelReader<R: Read + Seek> {
    workbook: Xlsx<R>,
}

impl<R: Read + Seek> ExcelReader<R> {
    pub fn new(reader: R) -> Result<Self, ImportError> {
        let workbook = Xlsx::new(reader).map_err(|e| {
            ImportError::UnsupportedInput(format!("Failed to open Excel workbook: {}", e))
        })?;
        Ok(Self { workbook })
    }

    pub fn get_sheet_as_csv(&mut self, sheet_name: &str) -> Result<Vec<u8>, ImportError> {
        let range = self.workbook.worksheet_range(sheet_name).map_err(|e| {
            ImportError::UnsupportedInput(format!(
                "Sheet '{sheet_name}' not found in workbook: {e}"
            ))
        })?;

        let mut writer = WriterBuilder::new().from_writer(vec![]);

        for row in range.rows() {
            let row_data: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
            writer.write_record(&row_data)?;
        }

        writer.flush()?;

        writer
            .into_inner()
            .map_err(|e| ImportError::Io(e.into_error()))
    }

    /// The first worksheet as CSV; an empty document if there are no sheets.
    pub fn first_sheet_as_csv(&mut self) -> Result<Vec<u8>, ImportError> {
        match self.sheet_names().first() {
            Some(name) => {
                let name = name.clone();
                self.get_sheet_as_csv(&name)
            }
            None => Ok(Vec::new()),
        }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }
}

/// Parses `.xlsx` workbooks by converting their first sheet to CSV.
pub struct XlsxParser {
    source: InputSource,
    mapper_factory: MapperFactory,
    state: ParserState,
}

impl XlsxParser {
    pub const EXTENSION: &'static str = ".xlsx";

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

    pub fn matches(source: &InputSource) -> bool {
        dotted_extension(source.name()).as_deref() == Some(Self::EXTENSION)
    }

    pub fn registration() -> ParserRegistration {
        ParserRegistration {
            name: "xlsx",
            matches: Self::matches,
            build: Self::build,
        }
    }

    fn build(source: InputSource, options: &ParserOptions) -> Box<dyn Parser> {
        Box::new(Self::new(source, options))
    }
}

impl Parser for XlsxParser {
    fn records(&mut self) -> Result<Records<'_>, ImportError> {
        let content = self.raw_content()?;
        Ok(records_from_csv(
            &content,
            self.source.name(),
            &self.mapper_factory,
        ))
    }

    fn raw_content(&mut self) -> Result<Vec<u8>, ImportError> {
        let bytes = self.source.read_all()?;
        ExcelReader::new(Cursor::new(bytes))?.first_sheet_as_csv()
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
