use crate::adapters::LocalStorage;
use crate::config::{dates, AppConfig, ConfigStore};
use crate::core::auth::Authenticator;
use crate::core::extractor::ArchiveExtractor;
use crate::core::fetcher::BatchFetcher;
use crate::core::locator::DocumentLocator;
use crate::core::progress::ProgressReporter;
use crate::domain::model::{
    BearerToken, DocumentId, ProgressEvent, RunReport, SearchBounds, StageKind, StageReport,
};
use crate::domain::ports::ApiConnector;
use crate::utils::error::{DocumentorError, Result};
use crate::utils::validation::Validate;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_DOWNLOAD_DIR: &str = "./Download";
pub const EXTRACTED_SUBDIR: &str = "AllFiles";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLayout {
    pub download_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl DownloadLayout {
    /// Extracted files go to `AllFiles` below the download directory.
    pub fn under<P: Into<PathBuf>>(download_dir: P) -> Self {
        let download_dir = download_dir.into();
        let output_dir = download_dir.join(EXTRACTED_SUBDIR);
        Self {
            download_dir,
            output_dir,
        }
    }
}

impl Default for DownloadLayout {
    fn default() -> Self {
        Self::under(DEFAULT_DOWNLOAD_DIR)
    }
}

// Each stage consumes the state produced by the one before it, so a later stage
// cannot run without the earlier one having succeeded.

struct Configured {
    config: AppConfig,
    report: RunReport,
}

struct Authenticated {
    config: AppConfig,
    token: BearerToken,
    report: RunReport,
}

struct Located {
    config: AppConfig,
    token: BearerToken,
    ids: Vec<DocumentId>,
    report: RunReport,
}

struct Fetched {
    report: RunReport,
}

/// Runs load config, authenticate, locate, fetch and extract in that order.
pub struct DocumentPipeline<C: ApiConnector> {
    connector: C,
    store: ConfigStore,
    layout: DownloadLayout,
    progress: ProgressReporter,
}

impl<C: ApiConnector> DocumentPipeline<C> {
    pub fn new(connector: C, store: ConfigStore, layout: DownloadLayout) -> Self {
        Self {
            connector,
            store,
            layout,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn layout(&self) -> &DownloadLayout {
        &self.layout
    }

    /// Executes one run. Fatal errors (unreadable config, failed login, cancellation)
    /// end the run with `Err`; everything else is folded into the report.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport> {
        let result = self.run_stages(cancel).await;
        match &result {
            Ok(report) => self.progress.emit(ProgressEvent::Finished(report.clone())),
            Err(e) => self.progress.emit(ProgressEvent::Failed(e.to_string())),
        }
        result
    }

    async fn run_stages(&self, cancel: &CancellationToken) -> Result<RunReport> {
        let configured = self.load_config(cancel)?;
        let api = self.connector.connect(&configured.config);
        let authenticated = self.authenticate(&api, configured, cancel).await?;
        let located = self.locate(&api, authenticated, cancel).await?;
        let fetched = self.fetch(&api, located, cancel).await?;
        self.extract(fetched, cancel).await
    }

    fn enter(&self, stage: StageKind, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(DocumentorError::Cancelled);
        }
        self.progress.emit(ProgressEvent::StageStarted(stage));
        Ok(())
    }

    fn finish(&self, report: &mut RunReport, stage: StageReport) {
        self.progress.emit(ProgressEvent::StageFinished(stage.clone()));
        report.stages.push(stage);
    }

    fn load_config(&self, cancel: &CancellationToken) -> Result<Configured> {
        self.enter(StageKind::LoadConfig, cancel)?;
        let config = self.store.load()?;
        config.validate()?;

        let mut report = RunReport::default();
        self.finish(
            &mut report,
            StageReport::clean(
                StageKind::LoadConfig,
                format!(
                    "{} to {}, batch size {}",
                    dates::to_calendar(config.scope.start_date),
                    dates::to_calendar(config.scope.end_date),
                    config.scope.batch_size
                ),
            ),
        );
        Ok(Configured { config, report })
    }

    async fn authenticate(
        &self,
        api: &C::Api,
        state: Configured,
        cancel: &CancellationToken,
    ) -> Result<Authenticated> {
        self.enter(StageKind::Authenticate, cancel)?;
        let Configured { config, mut report } = state;

        let outcome = Authenticator::new(api, &self.store)
            .authenticate(&config)
            .await?;

        let detail = if outcome.reused {
            "using saved token"
        } else {
            "logged in"
        };
        self.finish(
            &mut report,
            StageReport::clean(StageKind::Authenticate, detail),
        );
        Ok(Authenticated {
            config: outcome.config,
            token: outcome.token,
            report,
        })
    }

    async fn locate(
        &self,
        api: &C::Api,
        state: Authenticated,
        cancel: &CancellationToken,
    ) -> Result<Located> {
        self.enter(StageKind::Locate, cancel)?;
        let Authenticated {
            config,
            token,
            mut report,
        } = state;

        let zone = config.timezone()?;
        let bounds = SearchBounds {
            created_from: dates::search_bound(config.scope.start_date, zone)?,
            created_to: dates::search_bound(config.scope.end_date, zone)?,
        };

        let outcome = DocumentLocator::new(api)
            .with_progress(self.progress.clone())
            .with_cancel(cancel.clone())
            .find_ids(&token, &bounds)
            .await;
        if cancel.is_cancelled() {
            return Err(DocumentorError::Cancelled);
        }

        report.ids_found = outcome.ids.len();
        report.discovery_complete = outcome.complete;
        self.finish(&mut report, outcome.report());
        Ok(Located {
            config,
            token,
            ids: outcome.ids,
            report,
        })
    }

    async fn fetch(
        &self,
        api: &C::Api,
        state: Located,
        cancel: &CancellationToken,
    ) -> Result<Fetched> {
        self.enter(StageKind::Fetch, cancel)?;
        let Located {
            config,
            token,
            ids,
            mut report,
        } = state;

        let storage = LocalStorage::new(self.layout.download_dir.clone());
        let outcome = BatchFetcher::new(api, &storage)
            .with_progress(self.progress.clone())
            .with_cancel(cancel.clone())
            .fetch(&token, &ids, config.scope.batch_size)
            .await?;
        if cancel.is_cancelled() {
            return Err(DocumentorError::Cancelled);
        }

        report.batches_requested = outcome.requested;
        report.batches_saved = outcome.saved.len();
        report.batches_failed = outcome.failed.len();
        self.finish(&mut report, outcome.report());
        Ok(Fetched { report })
    }

    async fn extract(&self, state: Fetched, cancel: &CancellationToken) -> Result<RunReport> {
        self.enter(StageKind::Extract, cancel)?;
        let Fetched { mut report } = state;

        let extractor = ArchiveExtractor::new(
            self.layout.download_dir.clone(),
            self.layout.output_dir.clone(),
        )
        .with_progress(self.progress.clone());
        let outcome = tokio::task::spawn_blocking(move || extractor.extract_all())
            .await
            .map_err(|e| DocumentorError::IoError(std::io::Error::other(e)))??;

        report.archives_extracted = outcome.extracted.len();
        report.archives_failed = outcome.failed.len();
        self.finish(&mut report, outcome.report());
        Ok(report)
    }
}
