use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document known to the service. `id` is server-assigned; the page
/// count is not part of the record — it is discovered lazily through a
/// preview fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    /// Server-side location of the stored file.
    pub file: String,
    pub name: String,
    pub schema_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A local file staged for upload.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Display name; the service falls back to the file name.
    pub name: Option<String>,
    /// Extraction schema; the service falls back to its default.
    pub schema_type: Option<String>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            name: None,
            schema_type: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_schema_type(mut self, schema_type: impl Into<String>) -> Self {
        self.schema_type = Some(schema_type.into());
        self
    }

    /// Build the multipart form the upload endpoint expects.
    pub(crate) fn into_form(self) -> reqwest::multipart::Form {
        let mime = mime_guess::from_path(&self.file_name).first_or_octet_stream();
        let part = reqwest::multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(mime.as_ref())
            .expect("mime_guess yields a parseable type");
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(name) = self.name {
            form = form.text("name", name);
        }
        if let Some(schema_type) = self.schema_type {
            form = form.text("schema_type", schema_type);
        }
        form
    }
}

/// Structured data extracted from one page of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedResult {
    pub id: i64,
    /// Id of the source document.
    pub document: i64,
    pub page_number: u32,
    pub result_data: serde_json::Value,
    pub parsed_at: DateTime<Utc>,
}

/// Body of `POST /documents/parse/`. `schema_type` is omitted entirely
/// when absent — the endpoint does not accept an explicit null.
#[derive(Debug, Clone, Serialize)]
pub struct ParseRequest {
    pub document_id: i64,
    pub page_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
}

/// Response of the preview endpoint: one rendered page plus the total
/// page count of the document.
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewResponse {
    pub page_count: u32,
    pub preview: String,
}
