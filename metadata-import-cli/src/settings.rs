pub const DEFAULT_SETTINGS_FILE: &str = "import-settings.jsonc";

pub const SETTINGS_TEMPLATE: &str = r#"{
  // Correlates every message written for this run. A random id is used when omitted
  "batchId": "my-batch",
  // Collection the imported works are added to
  "collectionId": "my-collection-id",
  // Acting identity for the batch. Defaults to batchuser@example.com
  "depositor": "batchuser@example.com",
  // alwaysBatchUser: the depositor above always wins
  // preferRecord: a depositor column in the input wins when it is filled in
  "depositorPolicy": "alwaysBatchUser",
  // Works whose stored value for this field matches the row are updated instead of created.
  // Updates never re-attach files
  "deduplicationField": "identifier",
  // Separator between values of multi-valued cells
  "delimiter": "|~|",
  // Visibility values equal to this name become "authenticated"
  "institutionName": "My Full Institution Name",
  // Work type to create. Defaults to the first type the repository registers
  "workType": "Work"
}
"#;
