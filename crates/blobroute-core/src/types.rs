//! Data model for object operations.

use std::collections::HashMap;

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::BackendResult;

/// Streamed object body; each frame is one chunk from the backend.
pub type ByteStream = BoxStream<'static, BackendResult<Bytes>>;

/// Metadata describing one stored object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub etag: Option<String>,
    pub size: Option<u64>,
    pub last_modified: Option<String>,
    /// User-defined metadata stored alongside the object.
    #[serde(default)]
    pub user_meta: HashMap<String, String>,
}

/// A fully buffered object body with its metadata.
#[derive(Debug, Clone, Default)]
pub struct ObjectContent {
    pub meta: ObjectMeta,
    pub body: Bytes,
}

/// Acknowledgement for a write-side operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub etag: Option<String>,
    /// Canonical URL of the object on the acknowledging node.
    pub url: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPage {
    pub objects: Vec<ObjectSummary>,
    /// Common prefixes when listing with a delimiter.
    pub prefixes: Vec<String>,
    pub next_marker: Option<String>,
    pub is_truncated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub etag: Option<String>,
    pub size: u64,
    pub last_modified: Option<String>,
}

/// Options for `head`.
#[derive(Debug, Clone, Default)]
pub struct HeadOptions {
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
}

/// Options for `get` and `get_stream`.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Byte range as `(start, inclusive end)`.
    pub range: Option<(u64, u64)>,
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

/// Options for `list`.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: Option<String>,
    pub marker: Option<String>,
    pub max_keys: Option<usize>,
    pub delimiter: Option<String>,
}

/// Options for `put`, `put_stream` and `copy`.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub mime: Option<String>,
    /// User-defined metadata stored alongside the object.
    pub meta: HashMap<String, String>,
    /// Extra protocol headers passed through to the backend.
    pub headers: HashMap<String, String>,
}

/// Options for `delete_multi`.
#[derive(Debug, Clone, Default)]
pub struct DeleteMultiOptions {
    /// Quiet mode: the receipt omits the per-key deletion report.
    pub quiet: bool,
}

/// Options for `signature_url`.
#[derive(Debug, Clone)]
pub struct SignatureOptions {
    /// Seconds the signed URL stays valid.
    pub expires_secs: u64,
    /// HTTP method the URL is signed for.
    pub method: String,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            expires_secs: 1800,
            method: "GET".to_string(),
        }
    }
}
