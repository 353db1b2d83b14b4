//! Ingestion pipeline: parse → store → classify → append.
//!
//! # Responsibilities
//! - Snapshot request metadata once per ingestion event
//! - Produce one record per file part, per form field, and at most one for a
//!   raw body (only when there are no parts and no fields)
//! - Turn per-unit store/read failures into inline error markers
//! - Append all records of the event to the repository together

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;

use crate::capture::classify::{Classification, Classifier};
use crate::capture::record::{LogRecord, RequestMeta, TIMESTAMP_FORMAT};
use crate::capture::request::{CapturedRequest, FilePart, FormField};
use crate::capture::store::{extension_for, last_segment, ContentStore};
use crate::observability::metrics;
use crate::storage::{LogRepository, RepositoryError};

/// Failures that abort an ingestion event.
///
/// Everything else is recorded inline on the affected record.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("log repository unavailable: {0}")]
    Repository(#[from] RepositoryError),
}

/// What one ingestion event produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Identifiers of the appended records, in production order.
    pub ids: Vec<i64>,
    /// Units whose bytes could not be stored or previewed.
    pub unit_errors: usize,
}

impl IngestSummary {
    pub fn records(&self) -> usize {
        self.ids.len()
    }
}

/// Turns captured requests into persisted log records.
pub struct Ingestor {
    store: ContentStore,
    classifier: Classifier,
    repository: Arc<LogRepository>,
}

impl Ingestor {
    pub fn new(store: ContentStore, classifier: Classifier, repository: Arc<LogRepository>) -> Self {
        Self {
            store,
            classifier,
            repository,
        }
    }

    pub fn repository(&self) -> &Arc<LogRepository> {
        &self.repository
    }

    /// Ingest one request.
    ///
    /// Blocking: performs file and database I/O on the calling thread.
    pub fn ingest(&self, request: CapturedRequest) -> Result<IngestSummary, IngestError> {
        let started = Instant::now();
        metrics::record_capture(&request.method);

        let meta = RequestMeta {
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            method: request.method,
            path: request.path,
            headers: request.headers,
            query_params: request.query_params,
        };

        let mut records = Vec::new();
        let mut unit_errors = 0;

        for part in &request.files {
            let (record, failed) = self.file_record(&meta, part);
            unit_errors += failed as usize;
            records.push(record);
        }

        for field in &request.fields {
            records.push(field_record(&meta, field));
        }

        if request.files.is_empty() && request.fields.is_empty() && !request.raw_body.is_empty() {
            let (record, failed) = self.raw_body_record(&meta, &request.raw_body);
            unit_errors += failed as usize;
            records.push(record);
        }

        for record in &records {
            tracing::debug!(
                method = %record.method,
                path = %record.path,
                kind = record.kind.map(|k| k.as_str()).unwrap_or("form"),
                stored = record.stored_file_name.as_deref().unwrap_or("-"),
                "Record captured"
            );
            metrics::record_log_record(record.kind);
        }
        metrics::record_unit_errors(unit_errors);

        let ids = self.repository.append_all(&records).inspect_err(|e| {
            tracing::error!(error = %e, path = %meta.path, "Failed to append records");
            metrics::record_repository_error();
        })?;

        metrics::record_ingest_duration(started);
        Ok(IngestSummary { ids, unit_errors })
    }

    fn file_record(&self, meta: &RequestMeta, part: &FilePart) -> (LogRecord, bool) {
        let extension = extension_for(&part.file_name);
        let mut record = meta.record(String::new());
        record.original_file_name = Some(part.file_name.clone());
        let failed = self.store_and_classify(&mut record, &part.data, &extension, &part.file_name);
        (record, failed)
    }

    fn raw_body_record(&self, meta: &RequestMeta, body: &[u8]) -> (LogRecord, bool) {
        let extension = extension_for(&meta.path);
        let display_name = last_segment(&meta.path).replace("..", "");

        let mut record = meta.record(String::new());
        record.original_file_name = (!display_name.is_empty()).then_some(display_name);
        record.raw_post_data = Some(String::from_utf8_lossy(body).into_owned());
        let failed = self.store_and_classify(&mut record, body, &extension, &meta.path);
        (record, failed)
    }

    /// Store `data`, then classify the stored file. Returns true on a unit failure.
    fn store_and_classify(&self, record: &mut LogRecord, data: &[u8], extension: &str, name: &str) -> bool {
        let stored = match self.store.store(data, extension) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, name = %name, "Failed to store payload");
                let fallback = self.classifier.classify_bytes(data, name);
                mark_error(record, fallback, format!("[Error storing file: {}]", e));
                return true;
            }
        };

        metrics::record_store_write(stored.newly_written);
        record.stored_file_name = Some(stored.display_path());

        match self.classifier.classify_file(&stored.path) {
            Ok(classification) => {
                apply(record, classification);
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %stored.path.display(), "Failed to read stored payload");
                let fallback = self.classifier.classify_bytes(data, &stored.display_path());
                mark_error(record, fallback, format!("[Error reading file: {}]", e));
                true
            }
        }
    }
}

fn field_record(meta: &RequestMeta, field: &FormField) -> LogRecord {
    meta.record(format!("{} = {}", field.name, field.value))
}

fn apply(record: &mut LogRecord, classification: Classification) {
    record.body = classification.body();
    record.kind = Some(classification.kind);
    record.mime_type = classification.mime_type;
    record.file_content_preview = classification.preview;
}

fn mark_error(record: &mut LogRecord, fallback: Classification, marker: String) {
    record.body = marker;
    record.kind = Some(fallback.kind);
    record.mime_type = fallback.mime_type;
    record.file_content_preview = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::record::{PayloadKind, BINARY_BODY};
    use crate::capture::store::content_hash;
    use std::fs;

    struct Fixture {
        dir: tempfile::TempDir,
        ingestor: Ingestor,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path().join("uploads")).unwrap();
        let repository = Arc::new(LogRepository::open_in_memory().unwrap());
        let ingestor = Ingestor::new(store, Classifier::default(), repository);
        Fixture { dir, ingestor }
    }

    fn uploads(f: &Fixture) -> std::path::PathBuf {
        f.dir.path().join("uploads")
    }

    #[test]
    fn files_and_fields_fan_out() {
        let f = fixture();
        let request = CapturedRequest::new("POST", "/curltest.php")
            .with_file("image2", "test.bat", "echo hi")
            .with_file("image", "putty.exe", vec![0u8, 1, 2, 3, 0xFF])
            .with_field("filecomment", "This is an image file")
            .with_field("a", "1")
            .with_field("b", "2");

        let summary = f.ingestor.ingest(request).unwrap();

        assert_eq!(summary.records(), 5);
        assert_eq!(summary.unit_errors, 0);
        let records = f.ingestor.repository().list_all().unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].record.original_file_name.as_deref(), Some("test.bat"));
        assert_eq!(records[1].record.body, BINARY_BODY);
        assert_eq!(records[2].record.body, "filecomment = This is an image file");
        assert!(records[2..].iter().all(|r| r.record.stored_file_name.is_none()));
        assert!(records[2..].iter().all(|r| r.record.kind.is_none()));
    }

    #[test]
    fn bodiless_request_produces_nothing() {
        let f = fixture();
        let summary = f.ingestor.ingest(CapturedRequest::new("GET", "/ping")).unwrap();
        assert_eq!(summary.records(), 0);
        assert_eq!(f.ingestor.repository().count().unwrap(), 0);
    }

    #[test]
    fn form_field_scenario() {
        let f = fixture();
        let request = CapturedRequest::new("POST", "/anything")
            .with_query("x", "1")
            .with_field("name", "curl");

        f.ingestor.ingest(request).unwrap();

        let records = f.ingestor.repository().list_all().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0].record;
        assert_eq!(record.path, "/anything");
        assert_eq!(record.query_params.get("x"), Some("1"));
        assert_eq!(record.body, "name = curl");
        assert!(record.stored_file_name.is_none());
        assert!(record.original_file_name.is_none());
    }

    #[test]
    fn raw_body_scenario() {
        let f = fixture();
        let request = CapturedRequest::new("PUT", "/upload/report.txt").with_body("hello");

        f.ingestor.ingest(request).unwrap();

        let records = f.ingestor.repository().list_all().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0].record;
        assert_eq!(record.original_file_name.as_deref(), Some("report.txt"));
        assert_eq!(record.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(record.kind, Some(PayloadKind::Text));
        assert_eq!(record.file_content_preview.as_deref(), Some("hello"));
        assert_eq!(record.body, "hello");
        assert_eq!(record.raw_post_data.as_deref(), Some("hello"));

        let name = format!("{}.txt", content_hash(b"hello"));
        assert_eq!(record.stored_file_name, Some(format!("uploads/{}", name)));
        assert_eq!(fs::read(uploads(&f).join(name)).unwrap(), b"hello");
    }

    #[test]
    fn raw_body_is_ignored_when_parts_exist() {
        let f = fixture();
        let request = CapturedRequest::new("POST", "/x")
            .with_field("k", "v")
            .with_body("k=v");

        let summary = f.ingestor.ingest(request).unwrap();
        assert_eq!(summary.records(), 1);
    }

    #[test]
    fn traversal_is_stripped_from_display_name() {
        let f = fixture();
        f.ingestor
            .ingest(CapturedRequest::new("PUT", "/files/..secret..txt").with_body("data"))
            .unwrap();

        let record = &f.ingestor.repository().list_all().unwrap()[0].record;
        assert_eq!(record.original_file_name.as_deref(), Some("secrettxt"));
        // Storage name stays hash-derived.
        assert!(record
            .stored_file_name
            .as_deref()
            .unwrap()
            .contains(&content_hash(b"data")));
    }

    #[test]
    fn duplicate_uploads_share_one_file() {
        let f = fixture();
        for _ in 0..2 {
            let request = CapturedRequest::new("POST", "/up").with_file("file", "photo.png", vec![0x89, b'P', 0, 0]);
            f.ingestor.ingest(request).unwrap();
        }

        let records = f.ingestor.repository().list_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record.stored_file_name, records[1].record.stored_file_name);
        assert_eq!(records[0].record.kind, Some(PayloadKind::Image));
        assert_eq!(fs::read_dir(uploads(&f)).unwrap().count(), 1);
    }

    #[test]
    fn file_without_extension_or_name() {
        let f = fixture();
        f.ingestor
            .ingest(CapturedRequest::new("POST", "/up").with_file("file", "", "plain words"))
            .unwrap();

        let record = &f.ingestor.repository().list_all().unwrap()[0].record;
        let hash = content_hash(b"plain words");
        assert!(record.stored_file_name.as_deref().unwrap().ends_with(&hash));
        assert_eq!(record.original_file_name.as_deref(), Some(""));
        assert_eq!(record.kind, Some(PayloadKind::Text));
        assert_eq!(record.mime_type, None);
    }

    #[test]
    fn store_failure_becomes_marker() {
        let f = fixture();
        fs::remove_dir_all(uploads(&f)).unwrap();
        let request = CapturedRequest::new("POST", "/up")
            .with_file("file", "a.txt", "alpha")
            .with_field("still", "recorded");

        let summary = f.ingestor.ingest(request).unwrap();

        assert_eq!(summary.records(), 2);
        assert_eq!(summary.unit_errors, 1);
        let records = f.ingestor.repository().list_all().unwrap();
        let failed = &records[0].record;
        assert!(failed.body.starts_with("[Error storing file:"));
        assert!(failed.stored_file_name.is_none());
        assert!(failed.file_content_preview.is_none());
        assert_eq!(records[1].record.body, "still = recorded");
    }

    #[test]
    fn unreadable_stored_file_becomes_marker() {
        let f = fixture();
        // A directory squatting on the content path: the store reuses it, reading fails.
        fs::create_dir(uploads(&f).join(format!("{}.txt", content_hash(b"alpha")))).unwrap();
        let request = CapturedRequest::new("POST", "/up")
            .with_file("file", "a.txt", "alpha")
            .with_file("other", "b.txt", "beta")
            .with_field("still", "recorded");

        let summary = f.ingestor.ingest(request).unwrap();

        assert_eq!(summary.records(), 3);
        assert_eq!(summary.unit_errors, 1);
        let records = f.ingestor.repository().list_all().unwrap();
        let failed = &records[0].record;
        assert!(failed.body.starts_with("[Error reading file:"));
        assert_eq!(
            failed.stored_file_name,
            Some(format!("uploads/{}.txt", content_hash(b"alpha")))
        );
        assert!(failed.file_content_preview.is_none());
        assert_eq!(failed.kind, Some(PayloadKind::Text));
        assert_eq!(records[1].record.body, "beta");
        assert_eq!(records[2].record.body, "still = recorded");
    }

    #[test]
    fn repository_failure_aborts() {
        let f = fixture();
        f.ingestor.repository().execute_batch("DROP TABLE logs;").unwrap();

        let result = f.ingestor.ingest(CapturedRequest::new("POST", "/x").with_field("a", "b"));

        assert!(matches!(result, Err(IngestError::Repository(_))));
    }

    #[test]
    fn headers_and_query_shared_by_all_records() {
        let f = fixture();
        let request = CapturedRequest::new("POST", "/multi")
            .with_header("user-agent", "curl/8.0")
            .with_query("run", "7")
            .with_field("a", "1")
            .with_field("b", "2");

        f.ingestor.ingest(request).unwrap();

        let records = f.ingestor.repository().list_all().unwrap();
        assert!(records.iter().all(|r| r.record.headers.get("user-agent") == Some("curl/8.0")));
        assert!(records.iter().all(|r| r.record.query_params.get("run") == Some("7")));
        assert_eq!(records[0].record.timestamp, records[1].record.timestamp);
    }
}
