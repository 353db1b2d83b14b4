//! Transport-independent view of one inbound HTTP request.

use bytes::Bytes;

use crate::capture::record::FlatMap;

/// One uploaded file part, in client order.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name the file was sent under.
    pub field_name: String,
    /// Client-supplied filename; may be empty.
    pub file_name: String,
    pub data: Bytes,
}

/// One non-file form field, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

/// All facets of a request the ingestion pipeline consumes.
///
/// Every facet may be empty. The pipeline does not assume that file parts,
/// form fields and a raw body are mutually exclusive.
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    /// Header name to value; repeated names keep the last value.
    pub headers: FlatMap,
    /// Query key to value; repeated keys keep the first value.
    pub query_params: FlatMap,
    pub files: Vec<FilePart>,
    pub fields: Vec<FormField>,
    pub raw_body: Bytes,
}

impl CapturedRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert_last(name, value);
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query_params.insert_first(key, value);
        self
    }

    pub fn with_file(mut self, field_name: &str, file_name: &str, data: impl Into<Bytes>) -> Self {
        self.files.push(FilePart {
            field_name: field_name.to_string(),
            file_name: file_name.to_string(),
            data: data.into(),
        });
        self
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.push(FormField {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.raw_body = body.into();
        self
    }

    /// Parse a raw query string with first-value-wins semantics.
    pub fn parse_query(query: &str) -> FlatMap {
        let mut params = FlatMap::new();
        for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
            params.insert_first(k, v);
        }
        params
    }

    /// Parse an `application/x-www-form-urlencoded` body into ordered fields.
    pub fn parse_form(body: &[u8]) -> Vec<FormField> {
        url::form_urlencoded::parse(body)
            .map(|(name, value)| FormField {
                name: name.into_owned(),
                value: value.into_owned(),
            })
            .collect()
    }
}
