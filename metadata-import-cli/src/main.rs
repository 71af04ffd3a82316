use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use handoff::JsonLinesRepository;
use metadata_import::{
    BasicMetadataMapper, ImportConfig, ImportSettings, Importer, MapperFactory, MetadataMapper,
    ParserOptions, ParserRegistry, RecordImport, WorkRecordImporter,
};
use settings::{DEFAULT_SETTINGS_FILE, SETTINGS_TEMPLATE};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn, Level};

mod handoff;
mod settings;

/// Bulk Metadata Importer
/// Validates CSV or XLSX metadata and imports each row as a work
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output for detailed processing information
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an input file without importing it
    Validate {
        /// CSV or XLSX file to check
        #[arg(short, long, value_name = "INPUT FILE")]
        input: PathBuf,

        /// JSONC import settings
        #[arg(short, long, value_name = "PATH TO SETTINGS")]
        settings: Option<PathBuf>,
    },
    /// Import every row of an input file
    Import {
        /// CSV or XLSX file to import
        #[arg(short, long, value_name = "INPUT FILE")]
        input: PathBuf,

        /// JSONC import settings
        #[arg(short, long, value_name = "PATH TO SETTINGS")]
        settings: Option<PathBuf>,

        /// JSON-lines hand-off file. Defaults to the input path with a .jsonl extension
        #[arg(short, long, value_name = "OUTPUT PATH")]
        output: Option<PathBuf>,

        /// Import even if validation reports errors
        #[arg(long)]
        skip_validation: bool,
    },
    /// Generate an import settings template
    GenerateSettings {
        /// Output path for the generated settings
        #[arg(
            short,
            long,
            default_value = DEFAULT_SETTINGS_FILE,
            value_name = "OUTPUT PATH"
        )]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with appropriate level
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Bulk metadata importer starting up...");

    match &cli.command {
        Commands::Validate { input, settings } => validate_command(input, settings.as_deref()),
        Commands::Import {
            input,
            settings,
            output,
            skip_validation,
        } => import_command(input, settings.as_deref(), output.as_deref(), *skip_validation),
        Commands::GenerateSettings { output } => generate_settings_command(output),
    }
}

fn load_settings(path: Option<&Path>) -> Result<ImportSettings> {
    let settings = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Settings file not found: {}", path.display());
            }
            ImportSettings::from_file(path)
                .context("Failed to parse settings. See errors for additional details:")?
        }
        None => {
            info!("No settings file given, using defaults");
            ImportSettings::default()
        }
    };
    settings
        .validate()
        .context("Failed to validate settings")?;
    Ok(settings)
}

fn mapper_factory(settings: &ImportSettings) -> MapperFactory {
    let delimiter = settings.delimiter().to_string();
    let institution_name = settings.institution_name.clone();
    Arc::new(move || {
        let mut mapper = BasicMetadataMapper::new().with_delimiter(delimiter.clone());
        if let Some(name) = &institution_name {
            mapper = mapper.with_institution_name(name.clone());
        }
        Box::new(mapper) as Box<dyn MetadataMapper>
    })
}

fn registry(config: &ImportConfig, settings: &ImportSettings) -> ParserRegistry {
    ParserRegistry::with_defaults(ParserOptions {
        config: config.clone(),
        mapper_factory: mapper_factory(settings),
    })
}

fn validate_command(input: &Path, settings_path: Option<&Path>) -> Result<()> {
    info!("Validating {}...", input.display());

    if !input.exists() {
        anyhow::bail!(
            "Input file not found: {}. Try using --input <INPUT FILE>",
            input.display()
        );
    }

    let settings = load_settings(settings_path)?;
    let config = ImportConfig::from_env().context("Failed to open the import log")?;
    let mut parser = registry(&config, &settings)
        .parser_for_path(input)
        .context(format!("Failed to open input: {}", input.display()))?;

    if !parser.validate() {
        anyhow::bail!(
            "{} failed validation with {} error(s)",
            input.display(),
            parser.errors().len()
        );
    }

    let count = parser
        .record_count()
        .context("Failed to read records")?;
    info!("Validation successful");
    info!("Records: {}", count);
    Ok(())
}

fn import_command(
    input: &Path,
    settings_path: Option<&Path>,
    output: Option<&Path>,
    skip_validation: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let mut settings = load_settings(settings_path)?;
    settings.batch_id = Some(settings.batch_id_or_generate());
    let config = ImportConfig::from_env().context("Failed to open the import log")?;
    info!("Attachments are read from {}", config.import_path.display());

    let mut parser = registry(&config, &settings)
        .parser_for_path(input)
        .context(format!("Failed to open input: {}", input.display()))?;

    if skip_validation {
        warn!("Skipping validation");
    } else {
        info!("Validating input...");
        parser
            .validate_strict()
            .context("Input failed validation. See errors for additional details:")?;
    }

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("jsonl"));
    let file = File::create(&output_path).context(format!(
        "Failed to create hand-off file: {}",
        output_path.display()
    ))?;
    let repository = JsonLinesRepository::new(BufWriter::new(file), settings.work_type.as_deref());
    let record_importer = WorkRecordImporter::new(repository, &config, &settings);

    info!("Beginning import...");
    let mut importer = Importer::new(parser, record_importer);
    importer.import().context("Import aborted")?;

    let record_importer = importer.into_record_importer();
    info!(
        "Import completed: {} succeeded, {} failed",
        record_importer.success_count(),
        record_importer.failure_count()
    );
    info!(
        "Wrote {} line(s) to {}",
        record_importer.repository().lines_written(),
        output_path.display()
    );
    Ok(())
}

fn generate_settings_command(output: &Path) -> Result<()> {
    info!("Generating settings template...");

    // if output is a directory, append the default file name
    let full_file_output_path = if output.is_dir() {
        output.join(DEFAULT_SETTINGS_FILE)
    } else {
        output.to_path_buf()
    };

    fs::write(&full_file_output_path, SETTINGS_TEMPLATE).context(format!(
        "Failed to write settings to: {}",
        full_file_output_path.display()
    ))?;

    info!(
        "Successfully generated settings template at: {}",
        full_file_output_path.display()
    );
    Ok(())
}
