use crate::core::progress::ProgressReporter;
use crate::domain::model::{
    Batch, BatchFailure, BearerToken, DocumentId, DownloadRequest, FetchOutcome, ProgressEvent,
};
use crate::domain::ports::{DocumentApi, Storage};
use crate::utils::error::{DocumentorError, Result};
use crate::utils::validation::validate_positive_number;
use tokio_util::sync::CancellationToken;

/// Downloads the discovered ids as one zip archive per batch.
pub struct BatchFetcher<'a, A: DocumentApi, S: Storage> {
    api: &'a A,
    storage: &'a S,
    progress: ProgressReporter,
    cancel: CancellationToken,
}

impl<'a, A: DocumentApi, S: Storage> BatchFetcher<'a, A, S> {
    pub fn new(api: &'a A, storage: &'a S) -> Self {
        Self {
            api,
            storage,
            progress: ProgressReporter::silent(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Requests every batch in order. A failed batch is recorded and skipped; nothing is
    /// retried and the remaining batches still run. Only a zero `batch_size` or an
    /// unusable download directory is an error.
    pub async fn fetch(
        &self,
        token: &BearerToken,
        ids: &[DocumentId],
        batch_size: usize,
    ) -> Result<FetchOutcome> {
        validate_positive_number("scope.batch_size", batch_size, 1)?;
        self.storage.ensure_root().await?;

        let batches = Batch::partition(ids, batch_size);
        let mut outcome = FetchOutcome {
            requested: batches.len(),
            ..Default::default()
        };
        self.progress.message("Downloading files now...");

        for batch in &batches {
            if self.cancel.is_cancelled() {
                break;
            }

            let request = DownloadRequest::from(batch);
            match self.api.download_archive(token, &request).await {
                Ok(bytes) => match self.storage.write_file(&request.filename, &bytes).await {
                    Ok(path) => {
                        self.progress.emit(ProgressEvent::BatchSaved {
                            number: batch.number,
                            filename: request.filename.clone(),
                        });
                        outcome.saved.push(path);
                    }
                    Err(e) => {
                        self.record_failure(&mut outcome, request.filename, None, e.to_string())
                    }
                },
                Err(e) => {
                    let status = e.status();
                    let detail = match e {
                        DocumentorError::Http { body, .. } => body,
                        other => other.to_string(),
                    };
                    self.record_failure(&mut outcome, request.filename, status, detail);
                }
            }
        }

        Ok(outcome)
    }

    fn record_failure(
        &self,
        outcome: &mut FetchOutcome,
        filename: String,
        status: Option<u16>,
        detail: String,
    ) {
        let failure = BatchFailure {
            filename,
            status,
            detail,
        };
        self.progress.emit(ProgressEvent::BatchFailed(failure.clone()));
        outcome.failed.push(failure);
    }
}
