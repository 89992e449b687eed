use crate::config::{AppConfig, ConfigStore};
use crate::domain::model::BearerToken;
use crate::domain::ports::DocumentApi;
use crate::utils::error::{DocumentorError, Result};
use chrono::{Local, NaiveDateTime, TimeDelta};

/// How long an issued token is reused before logging in again.
pub const TOKEN_LIFETIME_HOURS: i64 = 5;

/// A cached token is usable when both the token and its issue time are present and the
/// issue time is less than [`TOKEN_LIFETIME_HOURS`] before `now`.
pub fn is_token_fresh(config: &AppConfig, now: NaiveDateTime) -> bool {
    let has_token = config
        .bearer_token
        .as_deref()
        .is_some_and(|token| !token.is_empty());
    if !has_token {
        return false;
    }
    match config.token_issued_at() {
        Some(issued_at) => now - issued_at < TimeDelta::hours(TOKEN_LIFETIME_HOURS),
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub token: BearerToken,
    /// The record as persisted after this step.
    pub config: AppConfig,
    pub reused: bool,
}

pub struct Authenticator<'a, A: DocumentApi> {
    api: &'a A,
    store: &'a ConfigStore,
}

impl<'a, A: DocumentApi> Authenticator<'a, A> {
    pub fn new(api: &'a A, store: &'a ConfigStore) -> Self {
        Self { api, store }
    }

    /// Loads the record and returns a usable token, logging in only when the cached one
    /// is stale.
    pub async fn get_token(&self) -> Result<AuthOutcome> {
        let snapshot = self.store.load()?;
        self.authenticate(&snapshot).await
    }

    pub async fn authenticate(&self, snapshot: &AppConfig) -> Result<AuthOutcome> {
        self.authenticate_at(snapshot, Local::now().naive_local())
            .await
    }

    pub async fn authenticate_at(
        &self,
        snapshot: &AppConfig,
        now: NaiveDateTime,
    ) -> Result<AuthOutcome> {
        if is_token_fresh(snapshot, now) {
            if let Some(token) = &snapshot.bearer_token {
                tracing::info!("Using saved token");
                return Ok(AuthOutcome {
                    token: BearerToken::new(token.clone()),
                    config: snapshot.clone(),
                    reused: true,
                });
            }
        }

        let token = self.api.login(&snapshot.login).await.map_err(|e| match e {
            DocumentorError::Auth { .. } => e,
            DocumentorError::Http { status, .. } => DocumentorError::Auth {
                message: format!("Failed to retrieve token. Status code: {}", status),
            },
            other => DocumentorError::Auth {
                message: format!("Failed to retrieve token: {}", other),
            },
        })?;

        let persisted = self.store.save_at(&snapshot.with_token(token.clone()), now)?;
        tracing::info!("Token retrieved and saved");
        Ok(AuthOutcome {
            token: BearerToken::new(token),
            config: persisted,
            reused: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoginConfig, ScopeConfig};
    use crate::config::dates;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn config(token: Option<&str>, issued_at: Option<NaiveDateTime>) -> AppConfig {
        AppConfig {
            plenty_url: "https://shop.example.com".to_string(),
            login: LoginConfig {
                username: "u".to_string(),
                password: "p".to_string(),
            },
            scope: ScopeConfig {
                start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
                batch_size: 10,
            },
            bearer_token: token.map(str::to_string),
            token_timestamp: issued_at.map(dates::format_timestamp),
            timezone: None,
        }
    }

    #[test]
    fn test_token_fresh_just_inside_window() {
        let issued = now() - TimeDelta::hours(4) - TimeDelta::minutes(59);
        assert!(is_token_fresh(&config(Some("t"), Some(issued)), now()));
    }

    #[test]
    fn test_token_stale_just_outside_window() {
        let issued = now() - TimeDelta::hours(5) - TimeDelta::minutes(1);
        assert!(!is_token_fresh(&config(Some("t"), Some(issued)), now()));
    }

    #[test]
    fn test_token_without_timestamp_is_stale() {
        assert!(!is_token_fresh(&config(Some("t"), None), now()));
        assert!(!is_token_fresh(&config(None, Some(now())), now()));
    }

    #[test]
    fn test_malformed_timestamp_is_stale() {
        let mut cfg = config(Some("t"), None);
        cfg.token_timestamp = Some("not a time".to_string());
        assert!(!is_token_fresh(&cfg, now()));
    }

    #[test]
    fn test_aware_timestamp_offset_is_dropped() {
        let mut cfg = config(Some("t"), None);
        cfg.token_timestamp = Some("2024-03-10T09:00:00+09:00".to_string());
        assert!(is_token_fresh(&cfg, now()));
    }
}
