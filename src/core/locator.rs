use crate::core::progress::ProgressReporter;
use crate::domain::model::{BearerToken, DiscoveryOutcome, ProgressEvent, SearchBounds};
use crate::domain::ports::DocumentApi;
use tokio_util::sync::CancellationToken;

/// Walks the search endpoint page by page and collects every document id.
pub struct DocumentLocator<'a, A: DocumentApi> {
    api: &'a A,
    progress: ProgressReporter,
    cancel: CancellationToken,
}

impl<'a, A: DocumentApi> DocumentLocator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
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

    /// Requests pages starting at 1 until one reports `isLastPage`. The first failed page
    /// ends discovery; ids gathered up to that point are returned with `complete = false`.
    pub async fn find_ids(&self, token: &BearerToken, bounds: &SearchBounds) -> DiscoveryOutcome {
        let mut outcome = DiscoveryOutcome::default();
        let mut page = 1u32;

        loop {
            if self.cancel.is_cancelled() {
                outcome.failure = Some("cancelled".to_string());
                return outcome;
            }

            match self.api.find_page(token, bounds, page).await {
                Ok(result) => {
                    outcome
                        .ids
                        .extend(result.entries.into_iter().map(|entry| entry.id));
                    outcome.pages_fetched = page;
                    self.progress.emit(ProgressEvent::PageFetched {
                        page,
                        last_page: result.last_page_number,
                        ids_so_far: outcome.ids.len(),
                    });

                    if result.is_last_page {
                        outcome.complete = true;
                        return outcome;
                    }
                    page += 1;
                }
                Err(e) if e.is_unauthorized() => {
                    self.progress.message(
                        "Failed to retrieve document IDs: Unauthorized. Check your credentials & access rights",
                    );
                    outcome.failure = Some(format!("unauthorized on page {}", page));
                    return outcome;
                }
                Err(e) => {
                    let reason = match e.status() {
                        Some(status) => format!("Status code: {}", status),
                        None => e.to_string(),
                    };
                    self.progress
                        .message(format!("Failed to retrieve document Ids. {}", reason));
                    outcome.failure = Some(format!("page {} failed: {}", page, reason));
                    return outcome;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoginConfig;
    use crate::domain::model::{DocumentId, DownloadRequest, SearchEntry, SearchPage};
    use crate::utils::error::{DocumentorError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves a fixed list of pages; `fail_on` makes that page answer with a status.
    struct PagedApi {
        pages: Vec<Vec<i64>>,
        fail_on: Option<(u32, u16)>,
        requested: Mutex<Vec<u32>>,
    }

    impl PagedApi {
        fn new(pages: Vec<Vec<i64>>) -> Self {
            Self {
                pages,
                fail_on: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocumentApi for PagedApi {
        async fn login(&self, _credentials: &LoginConfig) -> Result<String> {
            unreachable!("locator never logs in")
        }

        async fn find_page(
            &self,
            _token: &BearerToken,
            _bounds: &SearchBounds,
            page: u32,
        ) -> Result<SearchPage> {
            self.requested.lock().unwrap().push(page);
            if let Some((failing, status)) = self.fail_on {
                if failing == page {
                    return Err(DocumentorError::Http {
                        status,
                        body: String::new(),
                    });
                }
            }
            let index = (page - 1) as usize;
            Ok(SearchPage {
                entries: self.pages[index]
                    .iter()
                    .map(|id| SearchEntry {
                        id: DocumentId::Number(*id),
                    })
                    .collect(),
                is_last_page: index + 1 == self.pages.len(),
                last_page_number: Some(self.pages.len() as u64),
            })
        }

        async fn download_archive(
            &self,
            _token: &BearerToken,
            _request: &DownloadRequest,
        ) -> Result<Vec<u8>> {
            unreachable!("locator never downloads")
        }
    }

    fn bounds() -> SearchBounds {
        SearchBounds {
            created_from: "2024-03-01T00:00:00+01:00".to_string(),
            created_to: "2024-03-02T00:00:00+01:00".to_string(),
        }
    }

    fn numbers(ids: &[DocumentId]) -> Vec<i64> {
        ids.iter()
            .map(|id| match id {
                DocumentId::Number(n) => *n,
                DocumentId::Text(_) => panic!("unexpected text id"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_collects_all_pages_in_order() {
        let api = PagedApi::new(vec![vec![1, 2, 3], vec![4, 5], vec![6]]);
        let outcome = DocumentLocator::new(&api)
            .find_ids(&BearerToken::new("t"), &bounds())
            .await;

        assert_eq!(numbers(&outcome.ids), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(api.requested(), vec![1, 2, 3]);
        assert!(outcome.complete);
        assert!(!outcome.report().partial);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let api = PagedApi::new(vec![vec![1, 2], vec![2, 3]]);
        let outcome = DocumentLocator::new(&api)
            .find_ids(&BearerToken::new("t"), &bounds())
            .await;
        assert_eq!(numbers(&outcome.ids), vec![1, 2, 2, 3]);
    }

    #[tokio::test]
    async fn test_unauthorized_page_stops_with_partial_result() {
        let mut api = PagedApi::new(vec![vec![1, 2], vec![3], vec![4], vec![5]]);
        api.fail_on = Some((3, 401));
        let outcome = DocumentLocator::new(&api)
            .find_ids(&BearerToken::new("t"), &bounds())
            .await;

        assert_eq!(numbers(&outcome.ids), vec![1, 2, 3]);
        assert_eq!(api.requested(), vec![1, 2, 3]);
        assert!(!outcome.complete);
        assert!(outcome.report().partial);
    }

    #[tokio::test]
    async fn test_server_error_on_first_page_yields_nothing() {
        let mut api = PagedApi::new(vec![vec![1], vec![2]]);
        api.fail_on = Some((1, 503));
        let outcome = DocumentLocator::new(&api)
            .find_ids(&BearerToken::new("t"), &bounds())
            .await;

        assert!(outcome.ids.is_empty());
        assert_eq!(api.requested(), vec![1]);
        assert!(outcome.failure.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_page() {
        let api = PagedApi::new(vec![vec![1]]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = DocumentLocator::new(&api)
            .with_cancel(cancel)
            .find_ids(&BearerToken::new("t"), &bounds())
            .await;

        assert!(api.requested().is_empty());
        assert!(!outcome.complete);
    }
}
