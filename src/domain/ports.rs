use crate::config::{AppConfig, LoginConfig};
use crate::domain::model::{BearerToken, DownloadRequest, SearchBounds, SearchPage};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Where downloaded archives are written.
pub trait Storage: Send + Sync {
    fn ensure_root(&self) -> impl std::future::Future<Output = Result<()>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<std::path::PathBuf>> + Send;
}

/// The three calls the pipeline makes against the remote order service.
/// Non-success statuses come back as `DocumentorError::Http`.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn login(&self, credentials: &LoginConfig) -> Result<String>;

    async fn find_page(
        &self,
        token: &BearerToken,
        bounds: &SearchBounds,
        page: u32,
    ) -> Result<SearchPage>;

    async fn download_archive(
        &self,
        token: &BearerToken,
        request: &DownloadRequest,
    ) -> Result<Vec<u8>>;
}

/// Builds the API client for a loaded configuration.
pub trait ApiConnector: Send + Sync {
    type Api: DocumentApi;

    fn connect(&self, config: &AppConfig) -> Self::Api;
}
