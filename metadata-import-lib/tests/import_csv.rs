mod common;

use std::sync::Arc;

use common::{init_logging, memory_config, test_data, FakeRepository};
use metadata_import::{
    BasicMetadataMapper, FieldValue, ImportConfig, ImportError, ImportSettings, Importer,
    InputRecord, MetadataMapper, Parser, ParserOptions, ParserRegistry, RecordImport,
    RecordImporter, WorkRecordImporter,
};
use tracing::info;

fn parser_for(name: &str, config: &ImportConfig) -> Box<dyn Parser> {
    let options = ParserOptions {
        config: config.clone(),
        ..ParserOptions::default()
    };
    ParserRegistry::with_defaults(options)
        .parser_for_path(test_data(name))
        .unwrap()
}

fn settings() -> ImportSettings {
    ImportSettings {
        batch_id: Some("batch-1".into()),
        collection_id: Some("collection-1".into()),
        ..ImportSettings::default()
    }
}

fn run_import(
    name: &str,
    repository: FakeRepository,
    settings: &ImportSettings,
    config: &ImportConfig,
) -> (Result<(), ImportError>, WorkRecordImporter<FakeRepository>) {
    let record_importer = WorkRecordImporter::new(repository, config, settings);
    let mut importer = Importer::new(parser_for(name, config), record_importer);
    let result = importer.import();
    (result, importer.into_record_importer())
}

#[test]
fn attributes_cover_every_declared_field() {
    init_logging();
    let (config, _, _) = memory_config();
    let mut parser = parser_for("example.csv", &config);

    for record in parser.records().unwrap() {
        let mut fields = record.mapper().fields();
        fields.sort();
        let keys: Vec<String> = record.attributes().unwrap().into_keys().collect();
        assert_eq!(keys, fields);
    }
}

#[test]
fn records_are_restartable() {
    let (config, _, _) = memory_config();
    let mut parser = parser_for("example.csv", &config);
    let first: Vec<Vec<String>> = parser.records().unwrap().map(|r| r.titles()).collect();
    let second: Vec<Vec<String>> = parser.records().unwrap().map(|r| r.titles()).collect();
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[test]
fn header_aliases_and_multi_values_resolve() {
    let (config, _, _) = memory_config();
    let mut parser = parser_for("example.csv", &config);
    let record = parser.records().unwrap().next().unwrap();

    assert_eq!(
        record.field("language").unwrap(),
        FieldValue::Multi(vec!["English".into(), "Swedish".into()])
    );
    assert_eq!(
        record.field("resource_type").unwrap(),
        FieldValue::Multi(vec!["Book".into()])
    );
    assert_eq!(
        record.field("depositor").unwrap(),
        FieldValue::Single(Some("moomin@example.com".into()))
    );
    assert_eq!(record.field("visibility").unwrap().as_single(), Some("open"));
}

#[test]
fn missing_single_values_are_none() {
    let (config, _, _) = memory_config();
    let mut parser = parser_for("example.csv", &config);
    let record = parser.records().unwrap().nth(1).unwrap();
    assert_eq!(record.field("label").unwrap(), FieldValue::Single(None));
    assert_eq!(record.field("related_url").unwrap(), FieldValue::Multi(vec![]));
}

#[test]
fn institution_name_normalizes_to_authenticated() {
    let (config, _, _) = memory_config();
    let options = ParserOptions {
        config,
        mapper_factory: Arc::new(|| {
            Box::new(BasicMetadataMapper::new().with_institution_name("My Full Institution Name"))
                as Box<dyn MetadataMapper>
        }),
    };
    let registry = ParserRegistry::with_defaults(options);
    let mut parser = registry
        .parser_for(metadata_import::InputSource::from_bytes(
            "visibility.csv",
            "title,visibility\nA,my full institution name\nB,PubLIC\nC,embargo\n",
        ))
        .unwrap();

    let values: Vec<Option<String>> = parser
        .records()
        .unwrap()
        .map(|r| r.field("visibility").unwrap().as_single().map(str::to_string))
        .collect();
    assert_eq!(
        values,
        vec![
            Some("authenticated".to_string()),
            Some("open".to_string()),
            Some("embargo".to_string())
        ]
    );
}

#[test]
fn malformed_csv_yields_no_records_and_one_error() {
    init_logging();
    let (config, _, error) = memory_config();
    let mut parser = parser_for("bad_example.csv", &config);

    assert!(!parser.validate());
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(parser.errors()[0].lineno, Some(3));
    assert_eq!(parser.records().unwrap().count(), 0);
    assert_eq!(error.matching("malformed_csv").len(), 1);
}

#[test]
fn validate_strict_returns_collected_errors() {
    let (config, _, _) = memory_config();
    let mut parser = parser_for("bad_example.csv", &config);
    match parser.validate_strict() {
        Err(ImportError::Validation(errors)) => assert_eq!(errors.len(), 1),
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[test]
fn imports_every_record_with_locations() {
    init_logging();
    let (config, info, error) = memory_config();
    let (result, importer) = run_import("example.csv", FakeRepository::new(), &settings(), &config);
    result.unwrap();

    assert_eq!(importer.success_count(), 3);
    assert_eq!(importer.failure_count(), 0);
    let repository = importer.repository();
    assert_eq!(repository.works.len(), 3);

    let comet = repository.work("work-1").unwrap();
    assert_eq!(comet.depositor, "batchuser@example.com");
    assert!(!comet.attributes.contains_key("based_near"));
    let FieldValue::Structured(locations) = &comet.attributes["based_near_attributes"] else {
        panic!("expected structured locations");
    };
    assert_eq!(locations["0"]["id"], "http://sws.geonames.org/5667009/");
    assert_eq!(locations["0"]["label"], "Montana");
    assert_eq!(locations["1"]["id"], "http://sws.geonames.org/6252001/");
    assert_eq!(locations["1"]["label"], "United States");

    info!("Info messages: {:?}", info.messages());
    assert_eq!(
        info.messages()[0],
        "event: start_import, batch_id: batch-1, expected_records: 3"
    );
    assert_eq!(info.matching("event: record_created").len(), 3);
    assert!(info
        .matching("event: finish_import")
        .first()
        .unwrap()
        .contains("successful_record_count: 3, failed_record_count: 0"));
    assert!(error.is_empty());
}

#[test]
fn duplicate_identifiers_update_instead_of_create() {
    init_logging();
    let (config, info, _) = memory_config();
    let settings = ImportSettings {
        deduplication_field: Some("identifier".into()),
        ..settings()
    };
    let (result, importer) = run_import("duplicates.csv", FakeRepository::new(), &settings, &config);
    result.unwrap();

    let repository = importer.repository();
    assert_eq!(repository.works.len(), 1);
    assert_eq!(repository.create_calls, 1);
    assert_eq!(repository.update_calls, 1);
    assert_eq!(
        repository.works[0].attributes["title"],
        FieldValue::Multi(vec!["Second Comet".into()])
    );
    assert_eq!(importer.success_count(), 2);
    assert_eq!(
        info.matching("event: record_update_started"),
        vec!["event: record_update_started, batch_id: batch-1, collection_id: collection-1, identifier: moomin-001"]
    );
    assert_eq!(info.matching("event: record_updated").len(), 1);
}

#[test]
fn ambiguous_matches_abort_the_batch() {
    let (config, _, error) = memory_config();
    let mut repository = FakeRepository::new();
    repository.seed("identifier", "moomin-001");
    repository.seed("identifier", "moomin-001");
    let settings = ImportSettings {
        deduplication_field: Some("identifier".into()),
        ..settings()
    };

    let (result, importer) = run_import("duplicates.csv", repository, &settings, &config);
    assert!(matches!(result, Err(ImportError::AmbiguousMatch { count: 2, .. })));
    assert_eq!(importer.repository().create_calls, 0);
    assert_eq!(error.matching("event: import_failed").len(), 1);
}

#[test]
fn empty_batches_touch_nothing() {
    let (config, info, error) = memory_config();
    let (result, importer) = run_import("no_records.csv", FakeRepository::new(), &settings(), &config);
    result.unwrap();

    assert_eq!(importer.repository().create_calls, 0);
    assert_eq!(importer.repository().update_calls, 0);
    assert_eq!(importer.success_count() + importer.failure_count(), 0);
    assert_eq!(info.messages(), vec!["event: empty_batch, batch_id: batch-1"]);
    assert_eq!(error.messages(), vec!["event: empty_batch, batch_id: batch-1"]);
}

#[test]
fn counters_match_repository_outcomes() {
    let (config, _, error) = memory_config();
    let mut repository = FakeRepository::new();
    repository.invalid_titles = vec!["Finn Family Moomintroll".into()];

    let (result, importer) = run_import("example.csv", repository, &settings(), &config);
    result.unwrap();

    assert_eq!(importer.success_count(), 2);
    assert_eq!(importer.failure_count(), 1);
    assert_eq!(
        error.messages(),
        vec![r#"event: validation_failed, batch_id: batch-1, collection_id: collection-1, attribute: Title, message: is not allowed, record_title: ["Finn Family Moomintroll"]"#]
    );
}

#[test]
fn connection_failures_do_not_stop_the_batch() {
    let (config, _, error) = memory_config();
    let mut repository = FakeRepository::new();
    repository.unreachable_titles = vec!["Finn Family Moomintroll".into()];

    let (result, importer) = run_import("example.csv", repository, &settings(), &config);
    result.unwrap();

    assert_eq!(importer.repository().works.len(), 2);
    assert_eq!(importer.success_count(), 2);
    assert_eq!(importer.failure_count(), 1);
    assert_eq!(error.matching("event: repository_unavailable").len(), 1);
}

#[test]
fn backend_failures_stop_the_batch() {
    let (config, info, error) = memory_config();
    let mut repository = FakeRepository::new();
    repository.broken_titles = vec!["Finn Family Moomintroll".into()];

    let (result, importer) = run_import("example.csv", repository, &settings(), &config);
    assert!(matches!(result, Err(ImportError::Repository(_))));
    assert_eq!(importer.repository().works.len(), 1);
    assert_eq!(error.matching("event: import_failed").len(), 1);
    assert!(info.matching("event: finish_import").is_empty());
}

#[test]
fn attachments_are_uploaded_on_create() {
    init_logging();
    let (config, _, _) = memory_config();
    let (result, importer) =
        run_import("example_with_files.csv", FakeRepository::new(), &settings(), &config);
    result.unwrap();

    let repository = importer.repository();
    let filenames: Vec<&str> = repository.uploads.iter().map(|u| u.filename.as_str()).collect();
    assert_eq!(filenames, vec!["darlingtonia.png", "cat.png", "animals/cat.png"]);
    assert!(repository.uploads.iter().all(|u| u.size > 0));
    assert!(repository.uploads.iter().all(|u| u.owner == "batchuser@example.com"));

    let plant = repository.work("work-1").unwrap();
    assert!(!plant.attributes.contains_key("files"));
    assert_eq!(
        plant.attributes["uploaded_files"],
        FieldValue::Multi(vec!["upload-1".into(), "upload-2".into()])
    );
}

#[test]
fn representative_file_is_exposed_but_not_an_attribute() {
    let (config, _, _) = memory_config();
    let mut parser = parser_for("example_with_files.csv", &config);
    let records: Vec<InputRecord> = parser.records().unwrap().collect();
    assert_eq!(records[0].representative_file().as_deref(), Some("darlingtonia.png"));
    assert_eq!(records[1].representative_file(), None);
    assert!(!records[0]
        .attributes()
        .unwrap()
        .contains_key("representative_file"));
}

#[test]
fn missing_attachments_are_fatal() {
    let (config, _, error) = memory_config();
    let (result, importer) =
        run_import("missing_files.csv", FakeRepository::new(), &settings(), &config);

    match result {
        Err(ImportError::MissingAttachment { filename, .. }) => assert_eq!(filename, "foo.png"),
        other => panic!("expected missing attachment, got {:?}", other),
    }
    assert_eq!(importer.repository().create_calls, 0);
    assert_eq!(error.matching("Cannot find file foo.png").len(), 1);
}

#[test]
fn base_importer_requires_a_work_type() {
    let (config, _, _) = memory_config();
    let record_importer =
        RecordImporter::new(FakeRepository::without_types(), &config).with_batch_id("batch-1");
    let mut importer = Importer::new(parser_for("example.csv", &config), record_importer);

    match importer.import() {
        Err(ImportError::Configuration(message)) => {
            assert_eq!(message, "No work type found for import")
        }
        other => panic!("expected configuration error, got {:?}", other),
    }
}

#[test]
fn base_importer_creates_records_as_mapped() {
    let (config, info, _) = memory_config();
    let record_importer = RecordImporter::new(FakeRepository::new(), &config).with_batch_id("b");
    let mut importer = Importer::new(parser_for("example.csv", &config), record_importer);
    importer.import().unwrap();

    let record_importer = importer.into_record_importer();
    assert_eq!(record_importer.success_count(), 3);
    let comet = record_importer.repository().work("work-1").unwrap();
    assert!(comet.attributes.contains_key("based_near"));
    assert!(!comet.attributes.contains_key("based_near_attributes"));
    assert_eq!(info.matching("Record created at: ").len(), 3);
}
