use crate::config::dates::{self, persisted_date};
use crate::utils::error::{DocumentorError, Result};
use crate::utils::validation::{self, Validate};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config.txt";
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";

/// The persisted configuration record shared across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub plenty_url: String,
    pub login: LoginConfig,
    pub scope: ScopeConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(with = "persisted_date")]
    pub start_date: NaiveDate,
    #[serde(with = "persisted_date")]
    pub end_date: NaiveDate,
    pub batch_size: usize,
}

impl AppConfig {
    /// Starting point written by `init`.
    pub fn template() -> Self {
        let today = Local::now().date_naive();
        Self {
            plenty_url: "https://your-shop.plentymarkets-cloud01.com".to_string(),
            login: LoginConfig {
                username: String::new(),
                password: String::new(),
            },
            scope: ScopeConfig {
                start_date: today,
                end_date: today.succ_opt().unwrap_or(today),
                batch_size: 50,
            },
            bearer_token: None,
            token_timestamp: None,
            timezone: None,
        }
    }

    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        let name = self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE);
        name.parse::<chrono_tz::Tz>()
            .map_err(|e| DocumentorError::InvalidConfigValue {
                field: "timezone".to_string(),
                value: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Returns a copy carrying a freshly issued token.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            bearer_token: Some(token),
            ..self.clone()
        }
    }

    pub fn token_issued_at(&self) -> Option<NaiveDateTime> {
        self.token_timestamp
            .as_deref()
            .and_then(dates::parse_timestamp)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("plenty_url", &self.plenty_url)?;
        validation::validate_non_empty_string("login.username", &self.login.username)?;
        validation::validate_positive_number("scope.batch_size", self.scope.batch_size, 1)?;
        validation::validate_date_order("scope", self.scope.start_date, self.scope.end_date)?;
        if let Some(zone) = &self.timezone {
            validation::validate_timezone("timezone", zone)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Toml,
}

/// Reads and rewrites the configuration record. Every write replaces the whole file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> FileFormat {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => FileFormat::Toml,
            _ => FileFormat::Json,
        }
    }

    fn unreadable(&self, reason: impl ToString) -> DocumentorError {
        DocumentorError::ConfigUnreadable {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.unreadable(e))?;
        self.parse(&content)
    }

    fn parse(&self, content: &str) -> Result<AppConfig> {
        match self.format() {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| self.unreadable(e)),
            FileFormat::Toml => toml::from_str(content).map_err(|e| self.unreadable(e)),
        }
    }

    /// Writes the record, stamping the token's issue time with the current local time
    /// whenever a token is present.
    pub fn save(&self, config: &AppConfig) -> Result<AppConfig> {
        self.save_at(config, Local::now().naive_local())
    }

    pub fn save_at(&self, config: &AppConfig, now: NaiveDateTime) -> Result<AppConfig> {
        let mut record = config.clone();
        if record.bearer_token.is_some() {
            record.token_timestamp = Some(dates::format_timestamp(now));
        }

        let content = self.render(&record)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, content)?;
        tracing::debug!("Configuration written to {}", self.path.display());
        Ok(record)
    }

    fn render(&self, config: &AppConfig) -> Result<String> {
        match self.format() {
            FileFormat::Json => {
                let mut buf = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                config.serialize(&mut ser)?;
                String::from_utf8(buf).map_err(|e| self.unreadable(e))
            }
            FileFormat::Toml => toml::to_string_pretty(config).map_err(|e| self.unreadable(e)),
        }
    }

    /// Writes the template record unless a configuration already exists.
    pub fn init_from_template(&self) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }
        self.save(&AppConfig::template())?;
        tracing::info!("Created {} from template", self.path.display());
        Ok(true)
    }
}
