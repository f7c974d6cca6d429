//! File metadata returned by the files endpoints.

use serde::Deserialize;

/// A file stored with the API, as returned by `GET /v1/files` and
/// by uploads.
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub id: String,
    pub object: String,
    pub bytes: u64,
    pub created_at: i64,
    pub filename: String,
    pub purpose: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_details: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileList {
    pub data: Vec<File>,
}
