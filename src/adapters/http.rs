use crate::config::{AppConfig, LoginConfig};
use crate::domain::model::{
    BearerToken, DownloadRequest, LoginRequest, LoginResponse, SearchBounds, SearchPage,
};
use crate::domain::ports::{ApiConnector, DocumentApi};
use crate::utils::error::{DocumentorError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};

/// The login endpoint expects an empty basic credential next to the JSON body.
const EMPTY_BASIC_AUTH: &str = "Basic Og==";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlentyEndpoints {
    pub login: String,
    pub find_documents: String,
    pub download_zip: String,
}

impl PlentyEndpoints {
    pub fn from_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            login: format!("{}/rest/login", base),
            find_documents: format!("{}/rest/orders/documents/find", base),
            download_zip: format!("{}/rest/orders/documents/downloads/as_zip", base),
        }
    }
}

/// reqwest-backed client for the plentymarkets REST endpoints the pipeline uses.
pub struct PlentyClient {
    client: Client,
    endpoints: PlentyEndpoints,
}

impl PlentyClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoints: PlentyEndpoints::from_base(base_url),
        }
    }

    pub fn endpoints(&self) -> &PlentyEndpoints {
        &self.endpoints
    }

    async fn expect_ok(response: Response) -> Result<Response> {
        let status = response.status();
        tracing::debug!("API response status: {}", status);
        if status == StatusCode::OK {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DocumentorError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

/// Connects to the shop named by `plenty_url`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlentyConnector;

impl ApiConnector for PlentyConnector {
    type Api = PlentyClient;

    fn connect(&self, config: &AppConfig) -> PlentyClient {
        PlentyClient::new(&config.plenty_url)
    }
}

#[async_trait]
impl DocumentApi for PlentyClient {
    async fn login(&self, credentials: &LoginConfig) -> Result<String> {
        tracing::debug!("Making login request to: {}", self.endpoints.login);
        let payload = LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
        };

        let response = self
            .client
            .post(&self.endpoints.login)
            .header(header::AUTHORIZATION, EMPTY_BASIC_AUTH)
            .json(&payload)
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;

        let body: LoginResponse = response.json().await?;
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DocumentorError::Auth {
                message: "Token not found in the response".to_string(),
            })
    }

    async fn find_page(
        &self,
        token: &BearerToken,
        bounds: &SearchBounds,
        page: u32,
    ) -> Result<SearchPage> {
        let page_param = page.to_string();
        let query = [
            ("createdAtFrom", bounds.created_from.as_str()),
            ("createdAtTo", bounds.created_to.as_str()),
            ("page", page_param.as_str()),
        ];
        tracing::debug!("Requesting page {} from {}", page, self.endpoints.find_documents);

        let response = self
            .client
            .get(&self.endpoints.find_documents)
            .bearer_auth(token.as_str())
            .query(&query)
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;
        Ok(response.json().await?)
    }

    async fn download_archive(
        &self,
        token: &BearerToken,
        request: &DownloadRequest,
    ) -> Result<Vec<u8>> {
        tracing::debug!(
            "Requesting {} ({} ids) from {}",
            request.filename,
            request.ids.len(),
            self.endpoints.download_zip
        );

        // The endpoint reads a JSON body on GET.
        let response = self
            .client
            .get(&self.endpoints.download_zip)
            .bearer_auth(token.as_str())
            .json(request)
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DocumentId;
    use httpmock::prelude::*;

    fn credentials() -> LoginConfig {
        LoginConfig {
            username: "api-user".to_string(),
            password: "s3cret".to_string(),
        }
    }

    #[test]
    fn test_endpoints_from_base() {
        let endpoints = PlentyEndpoints::from_base("https://shop.example.com/");
        assert_eq!(endpoints.login, "https://shop.example.com/rest/login");
        assert_eq!(
            endpoints.find_documents,
            "https://shop.example.com/rest/orders/documents/find"
        );
        assert_eq!(
            endpoints.download_zip,
            "https://shop.example.com/rest/orders/documents/downloads/as_zip"
        );
    }

    #[tokio::test]
    async fn test_login_sends_quirky_basic_header() {
        let server = MockServer::start();
        let login_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/login")
                .header("Authorization", "Basic Og==")
                .json_body(serde_json::json!({"username": "api-user", "password": "s3cret"}));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"access_token": "tok-1", "token_type": "Bearer"}));
        });

        let client = PlentyClient::new(&server.base_url());
        let token = client.login(&credentials()).await.unwrap();

        login_mock.assert();
        assert_eq!(token, "tok-1");
    }

    #[tokio::test]
    async fn test_login_without_token_field_is_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/login");
            then.status(200).json_body(serde_json::json!({"message": "ok"}));
        });

        let client = PlentyClient::new(&server.base_url());
        let err = client.login(&credentials()).await.unwrap_err();
        assert!(matches!(err, DocumentorError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_find_page_passes_bounds_and_page() {
        let server = MockServer::start();
        let find_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/orders/documents/find")
                .header("Authorization", "Bearer tok")
                .query_param("createdAtFrom", "2024-03-01T00:00:00+01:00")
                .query_param("createdAtTo", "2024-03-26T00:00:00+01:00")
                .query_param("page", "3");
            then.status(200).json_body(serde_json::json!({
                "entries": [{"id": 7}],
                "isLastPage": true,
                "lastPageNumber": 3
            }));
        });

        let client = PlentyClient::new(&server.base_url());
        let bounds = SearchBounds {
            created_from: "2024-03-01T00:00:00+01:00".to_string(),
            created_to: "2024-03-26T00:00:00+01:00".to_string(),
        };
        let page = client
            .find_page(&BearerToken::new("tok"), &bounds, 3)
            .await
            .unwrap();

        find_mock.assert();
        assert_eq!(page.entries[0].id, DocumentId::Number(7));
        assert!(page.is_last_page);
    }

    #[tokio::test]
    async fn test_download_failure_carries_status_and_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/orders/documents/downloads/as_zip");
            then.status(500).body("storage offline");
        });

        let client = PlentyClient::new(&server.base_url());
        let request = DownloadRequest {
            ids: vec![DocumentId::Number(1)],
            filename: "1-1.zip".to_string(),
        };
        let err = client
            .download_archive(&BearerToken::new("tok"), &request)
            .await
            .unwrap_err();

        match err {
            DocumentorError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "storage offline");
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }
}
