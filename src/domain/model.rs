use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifier of an order document. The API hands out integers, but nothing here
/// depends on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Number(i64),
    Text(String),
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Number(n) => write!(f, "{}", n),
            DocumentId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for DocumentId {
    fn from(value: i64) -> Self {
        DocumentId::Number(value)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchBounds {
    pub created_from: String,
    pub created_to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchEntry {
    pub id: DocumentId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub entries: Vec<SearchEntry>,
    pub is_last_page: bool,
    #[serde(default)]
    pub last_page_number: Option<u64>,
}

/// A contiguous slice of the discovered identifiers, with 1-based offsets into the
/// full sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<'a> {
    pub number: usize,
    pub first: usize,
    pub last: usize,
    pub ids: &'a [DocumentId],
}

impl<'a> Batch<'a> {
    /// Splits `ids` into consecutive batches of at most `batch_size` elements.
    /// A zero `batch_size` yields no batches.
    pub fn partition(ids: &'a [DocumentId], batch_size: usize) -> Vec<Batch<'a>> {
        if batch_size == 0 {
            return Vec::new();
        }
        ids.chunks(batch_size)
            .enumerate()
            .map(|(number, chunk)| {
                let first = number * batch_size + 1;
                Batch {
                    number: number + 1,
                    first,
                    last: first + chunk.len() - 1,
                    ids: chunk,
                }
            })
            .collect()
    }

    pub fn filename(&self) -> String {
        format!("{}-{}.zip", self.first, self.last)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequest {
    pub ids: Vec<DocumentId>,
    pub filename: String,
}

impl From<&Batch<'_>> for DownloadRequest {
    fn from(batch: &Batch<'_>) -> Self {
        Self {
            ids: batch.ids.to_vec(),
            filename: batch.filename(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    LoadConfig,
    Authenticate,
    Locate,
    Fetch,
    Extract,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::LoadConfig => "load config",
            StageKind::Authenticate => "authenticate",
            StageKind::Locate => "locate documents",
            StageKind::Fetch => "fetch batches",
            StageKind::Extract => "extract archives",
        };
        f.write_str(name)
    }
}

/// What a stage reports back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: StageKind,
    pub succeeded: bool,
    pub partial: bool,
    pub detail: String,
}

impl StageReport {
    pub fn clean(stage: StageKind, detail: impl Into<String>) -> Self {
        Self {
            stage,
            succeeded: true,
            partial: false,
            detail: detail.into(),
        }
    }

    pub fn degraded(stage: StageKind, detail: impl Into<String>) -> Self {
        Self {
            stage,
            succeeded: true,
            partial: true,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutcome {
    pub ids: Vec<DocumentId>,
    pub pages_fetched: u32,
    pub complete: bool,
    pub failure: Option<String>,
}

impl DiscoveryOutcome {
    pub fn report(&self) -> StageReport {
        match &self.failure {
            None => StageReport::clean(
                StageKind::Locate,
                format!("{} ids on {} pages", self.ids.len(), self.pages_fetched),
            ),
            Some(reason) => StageReport::degraded(
                StageKind::Locate,
                format!(
                    "stopped after {} pages with {} ids: {}",
                    self.pages_fetched,
                    self.ids.len(),
                    reason
                ),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub filename: String,
    pub status: Option<u16>,
    pub detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub requested: usize,
    pub saved: Vec<PathBuf>,
    pub failed: Vec<BatchFailure>,
}

impl FetchOutcome {
    pub fn report(&self) -> StageReport {
        let detail = format!(
            "{} of {} batches saved",
            self.saved.len(),
            self.requested
        );
        if self.failed.is_empty() {
            StageReport::clean(StageKind::Fetch, detail)
        } else {
            let names: Vec<&str> = self.failed.iter().map(|f| f.filename.as_str()).collect();
            StageReport::degraded(
                StageKind::Fetch,
                format!("{}; missing {}", detail, names.join(", ")),
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFailure {
    pub archive: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub extracted: Vec<String>,
    pub failed: Vec<ArchiveFailure>,
    pub files_written: usize,
}

impl ExtractionOutcome {
    pub fn report(&self) -> StageReport {
        let detail = format!(
            "{} archives extracted, {} files written",
            self.extracted.len(),
            self.files_written
        );
        if self.failed.is_empty() {
            StageReport::clean(StageKind::Extract, detail)
        } else {
            StageReport::degraded(
                StageKind::Extract,
                format!("{}; {} archives unreadable", detail, self.failed.len()),
            )
        }
    }
}

/// Summary of a completed run. A run that got this far never hit a fatal error, but
/// may still be degraded.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub stages: Vec<StageReport>,
    pub ids_found: usize,
    pub discovery_complete: bool,
    pub batches_requested: usize,
    pub batches_saved: usize,
    pub batches_failed: usize,
    pub archives_extracted: usize,
    pub archives_failed: usize,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.stages.iter().all(|s| s.succeeded && !s.partial)
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} ids, {}/{} batches saved, {} archives extracted ({} failed)",
            if self.is_clean() { "clean" } else { "degraded" },
            self.ids_found,
            self.batches_saved,
            self.batches_requested,
            self.archives_extracted,
            self.archives_failed
        )
    }
}

/// Line-oriented progress emitted while a run executes.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    StageStarted(StageKind),
    StageFinished(StageReport),
    Message(String),
    PageFetched {
        page: u32,
        last_page: Option<u64>,
        ids_so_far: usize,
    },
    BatchSaved {
        number: usize,
        filename: String,
    },
    BatchFailed(BatchFailure),
    ArchiveExtracted(String),
    ArchiveFailed(ArchiveFailure),
    Finished(RunReport),
    Failed(String),
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Finished(_) | ProgressEvent::Failed(_))
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::StageStarted(stage) => write!(f, "Starting: {}", stage),
            ProgressEvent::StageFinished(report) => write!(f, "{}: {}", report.stage, report.detail),
            ProgressEvent::Message(msg) => f.write_str(msg),
            ProgressEvent::PageFetched {
                page, last_page, ..
            } => match last_page {
                Some(last) => write!(f, "Finding Ids on Page: {} / {}", page, last),
                None => write!(f, "Finding Ids on Page: {}", page),
            },
            ProgressEvent::BatchSaved { number, filename } => {
                write!(f, "Batch {}: Saved {}", number, filename)
            }
            ProgressEvent::BatchFailed(failure) => match failure.status {
                Some(status) => write!(
                    f,
                    "Failed to download {}. Status code: {} {}",
                    failure.filename, status, failure.detail
                ),
                None => write!(f, "Failed to download {}: {}", failure.filename, failure.detail),
            },
            ProgressEvent::ArchiveExtracted(name) => write!(f, "Unzipped {}", name),
            ProgressEvent::ArchiveFailed(failure) => {
                write!(f, "Could not unzip {}: {}", failure.archive, failure.reason)
            }
            ProgressEvent::Finished(report) => write!(f, "done ({})", report.summary()),
            ProgressEvent::Failed(reason) => write!(f, "error: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: i64) -> Vec<DocumentId> {
        (1..=n).map(DocumentId::from).collect()
    }

    #[test]
    fn test_partition_covers_sequence_without_gaps() {
        for (len, size) in [(5usize, 2usize), (6, 3), (1, 50), (100, 7)] {
            let all = ids(len as i64);
            let batches = Batch::partition(&all, size);
            assert_eq!(batches.len(), len.div_ceil(size));

            let mut expected_first = 1;
            for batch in &batches {
                assert_eq!(batch.first, expected_first);
                assert!(batch.ids.len() <= size);
                assert_eq!(batch.last - batch.first + 1, batch.ids.len());
                expected_first = batch.last + 1;
            }
            assert_eq!(expected_first, len + 1);
        }
    }

    #[test]
    fn test_partition_filenames() {
        let all = ids(5);
        let names: Vec<String> = Batch::partition(&all, 2)
            .iter()
            .map(Batch::filename)
            .collect();
        assert_eq!(names, vec!["1-2.zip", "3-4.zip", "5-5.zip"]);
    }

    #[test]
    fn test_partition_empty_and_zero() {
        assert!(Batch::partition(&[], 10).is_empty());
        assert!(Batch::partition(&ids(3), 0).is_empty());
    }

    #[test]
    fn test_search_page_decoding() {
        let page: SearchPage = serde_json::from_value(serde_json::json!({
            "page": 1,
            "entries": [{"id": 11, "type": "invoice"}, {"id": "x-12"}],
            "isLastPage": false,
            "lastPageNumber": 4
        }))
        .unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].id, DocumentId::Number(11));
        assert_eq!(page.entries[1].id, DocumentId::Text("x-12".to_string()));
        assert!(!page.is_last_page);
        assert_eq!(page.last_page_number, Some(4));
    }

    #[test]
    fn test_download_request_body() {
        let all = ids(3);
        let batch = &Batch::partition(&all, 2)[1];
        let body = serde_json::to_value(DownloadRequest::from(batch)).unwrap();
        assert_eq!(body, serde_json::json!({"ids": [3], "filename": "3-3.zip"}));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = BearerToken::new("very-secret");
        assert!(!format!("{:?}", token).contains("very-secret"));
    }

    #[test]
    fn test_report_clean_vs_degraded() {
        let mut report = RunReport {
            stages: vec![StageReport::clean(StageKind::Locate, "ok")],
            ..Default::default()
        };
        assert!(report.is_clean());
        report
            .stages
            .push(StageReport::degraded(StageKind::Fetch, "1 missing"));
        assert!(!report.is_clean());
        assert!(report.summary().starts_with("degraded"));
    }
}
