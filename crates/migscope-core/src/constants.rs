/// Maximum number of entries kept in the operator log.
pub const LOG_CAPACITY: usize = 400;

/// Summary resource written by the extraction step.
pub const SUMMARY_RESOURCE: &str = "summary.json";
/// Summary resource written by the loading step, read when the primary is absent.
pub const SUMMARY_FALLBACK_RESOURCE: &str = "load_summary.json";

/// Suffix of the dataset variant annotated with export progress.
pub const EXPORT_STATUS_SUFFIX: &str = "_export_status.ndjson";
/// Suffix of the raw extracted dataset.
pub const RAW_SUFFIX: &str = ".ndjson";

/// Field the loading step sets on every record it pushed downstream.
pub const EXPORTED_FIELD: &str = "exported_to_chatwoot";

/// Path of the serverless self-test function.
pub const SELF_TEST_PATH: &str = "/.netlify/functions/test_run";

/// Cell text for null or missing values.
pub const MISSING_CELL: &str = "\u{2014}";

/// Shown in place of the summary when none was loaded.
pub const SUMMARY_PLACEHOLDER: &str = "No summary loaded.";

/// Records shown per dataset in the samples view.
pub const SAMPLE_SIZE: usize = 3;
