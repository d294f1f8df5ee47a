//! Wire types of the File API.
//!
//! Every response is wrapped in an [`Envelope`]. When a field-selection hint
//! (`?pick=`) is sent, `data` holds only the picked field, so the payload
//! decoders below accept both the full and the picked shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field-selection hint narrowing the remote response shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldHint {
    /// Only the directory-entry array of a listing.
    Entries,
    /// Only the metadata object of a stat.
    FileMetadata,
    /// Only the content of a retrieve.
    Content,
}

impl FieldHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldHint::Entries => "entries",
            FieldHint::FileMetadata => "file_metadata",
            FieldHint::Content => "content",
        }
    }
}

/// `{success, data}` on success, `{success:false, error, error_code}` on failure.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ListOptions {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_hidden: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub long_format: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recursive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub pattern_optimization: bool,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct RetrieveOptions {
    pub start_offset: u64,
    pub max_bytes: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StoreOptions {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub create_missing: bool,
}

#[derive(Serialize)]
pub(crate) struct ListRequest<'a> {
    pub path: &'a str,
    pub file_options: &'a ListOptions,
}

#[derive(Serialize)]
pub(crate) struct StatRequest<'a> {
    pub path: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RetrieveRequest<'a> {
    pub path: &'a str,
    pub file_options: RetrieveOptions,
}

#[derive(Serialize)]
pub(crate) struct StoreRequest<'a> {
    pub path: &'a str,
    pub content: &'a Value,
    pub file_options: StoreOptions,
}

/// One row of a directory listing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEntry {
    pub name: String,
    /// Single-character type code, `"d"` for directories.
    pub file_type: String,
    pub file_size: u64,
    pub file_permissions: String,
    pub file_modified: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_context: Option<Value>,
}

/// Attribute set of a single path. Timestamps are RFC3339 strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_time: String,
    pub created_time: String,
    pub access_time: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub permissions: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListResponse {
    pub entries: Vec<FileEntry>,
    pub total: u64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_metadata: Option<FileMetadata>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListPayload {
    Picked(Vec<FileEntry>),
    Full(ListResponse),
}

impl ListResponse {
    pub(crate) fn from_data(data: Value) -> serde_json::Result<Self> {
        Ok(match serde_json::from_value(data)? {
            ListPayload::Full(full) => full,
            ListPayload::Picked(entries) => ListResponse {
                total: entries.len() as u64,
                entries,
                has_more: false,
                file_metadata: None,
            },
        })
    }
}

/// Attribute snapshot returned by stat. This is what the metadata cache holds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatResponse {
    #[serde(default)]
    pub file_metadata: FileMetadata,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MetadataPayload {
    Full {
        file_metadata: FileMetadata,
        #[serde(default, rename = "type")]
        kind: String,
    },
    Picked(FileMetadata),
}

impl MetadataPayload {
    fn into_parts(self) -> (FileMetadata, String) {
        match self {
            MetadataPayload::Full {
                file_metadata,
                kind,
            } => (file_metadata, kind),
            MetadataPayload::Picked(file_metadata) => (file_metadata, String::new()),
        }
    }
}

impl StatResponse {
    pub(crate) fn from_data(data: Value) -> serde_json::Result<Self> {
        let payload: MetadataPayload = serde_json::from_value(data)?;
        let (file_metadata, kind) = payload.into_parts();
        Ok(StatResponse {
            file_metadata,
            kind,
        })
    }

    /// Either type field naming `"directory"` marks a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == "directory" || self.file_metadata.kind == "directory"
    }
}

/// Content as the remote side represents it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
    Other(Value),
}

impl Default for Content {
    fn default() -> Self {
        Content::Other(Value::Null)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetrieveResponse {
    pub content: Content,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ContentField {
    content: Content,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RetrievePayload {
    Full(ContentField),
    Picked(Content),
}

impl RetrieveResponse {
    /// A `{"content": ...}` wrapper is unwrapped whether or not the content
    /// hint was sent, since the server may ignore `pick`. Any other value is
    /// the content itself under the hint. Without the hint an object is
    /// always the wrapper.
    pub(crate) fn from_data(data: Value, hint: Option<FieldHint>) -> serde_json::Result<Self> {
        let content = match (hint, data) {
            (Some(FieldHint::Content), data) => match serde_json::from_value::<RetrievePayload>(data)? {
                RetrievePayload::Full(ContentField { content }) => content,
                RetrievePayload::Picked(content) => content,
            },
            (_, Value::Object(mut fields)) => {
                serde_json::from_value(fields.remove("content").unwrap_or(Value::Null))?
            }
            (_, data) => serde_json::from_value(data)?,
        };
        Ok(RetrieveResponse { content })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreResponse {
    pub file_metadata: FileMetadata,
}

impl StoreResponse {
    pub(crate) fn from_data(data: Value) -> serde_json::Result<Self> {
        let payload: MetadataPayload = serde_json::from_value(data)?;
        let (file_metadata, _) = payload.into_parts();
        Ok(StoreResponse { file_metadata })
    }
}
