use std::path;

use chrono::DateTime;
use chrono::Local;

/// One generated program version, written to disk once and never touched
/// again.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub code: String,
    pub filename: path::PathBuf,
    pub created_at: DateTime<Local>,
}
