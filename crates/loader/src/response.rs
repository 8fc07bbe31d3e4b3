//! Response envelope and outcome types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content type of every exported file.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Outcome status, mapped one-to-one onto an HTTP status by adapters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoaderStatus {
    #[default]
    Ok,
    Created,
    Accepted,
    NoContent,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
}

/// Status class (first digit of the code).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusSeries {
    Informational,
    Successful,
    Redirection,
    ClientError,
    ServerError,
}

impl LoaderStatus {
    pub fn code(self) -> u16 {
        match self {
            LoaderStatus::Ok => 200,
            LoaderStatus::Created => 201,
            LoaderStatus::Accepted => 202,
            LoaderStatus::NoContent => 204,
            LoaderStatus::BadRequest => 400,
            LoaderStatus::Unauthorized => 401,
            LoaderStatus::Forbidden => 403,
            LoaderStatus::NotFound => 404,
            LoaderStatus::InternalServerError => 500,
        }
    }

    pub fn series(self) -> StatusSeries {
        match self.code() / 100 {
            1 => StatusSeries::Informational,
            2 => StatusSeries::Successful,
            3 => StatusSeries::Redirection,
            4 => StatusSeries::ClientError,
            _ => StatusSeries::ServerError,
        }
    }

    pub fn is_success(self) -> bool {
        self.series() == StatusSeries::Successful
    }
}

/// Items, total count, derived headers and status of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataResponse<T> {
    pub items: Vec<T>,
    /// Independently counted total; may differ from `items.len()`.
    pub total: u64,
    pub headers: BTreeMap<String, String>,
    pub status: LoaderStatus,
}

impl<T> DataResponse<T> {
    pub fn new(
        items: Vec<T>,
        total: u64,
        headers: BTreeMap<String, String>,
        status: LoaderStatus,
    ) -> Self {
        Self {
            items,
            total,
            headers,
            status,
        }
    }

    /// No items, zero total, no headers.
    pub fn empty(status: LoaderStatus) -> Self {
        Self::new(Vec::new(), 0, BTreeMap::new(), status)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Exported file ready to be streamed by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportResource {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub body: Vec<u8>,
    pub status: LoaderStatus,
}

impl ExportResource {
    pub fn new(file_name: impl Into<String>, body: Vec<u8>, status: LoaderStatus) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: OCTET_STREAM.to_string(),
            body,
            status,
        }
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// Outcome of one imported file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Identifier of the upload batch, `0` when the loader keeps none.
    pub upload_id: i64,
    /// Number of imported records.
    pub count: u64,
}

impl ImportResult {
    pub fn new(upload_id: i64, count: u64) -> Self {
        Self { upload_id, count }
    }
}
