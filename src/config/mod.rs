pub mod cli;
pub mod dates;
pub mod store;

pub use cli::{CliArgs, Command, ConfigureArgs, RunArgs};
pub use store::{AppConfig, ConfigStore, LoginConfig, ScopeConfig};

use chrono::{Days, NaiveDate};

/// The search endpoint treats its upper bound as exclusive, so an inclusive last day is
/// stored as the midnight that follows it.
pub fn exclusive_end(inclusive_end: NaiveDate) -> NaiveDate {
    inclusive_end
        .checked_add_days(Days::new(1))
        .unwrap_or(inclusive_end)
}

pub fn inclusive_end(exclusive_end: NaiveDate) -> NaiveDate {
    exclusive_end
        .checked_sub_days(Days::new(1))
        .unwrap_or(exclusive_end)
}

impl AppConfig {
    /// Applies form-style edits. `end_date` is taken as the last day to include.
    pub fn apply(&self, edits: &ConfigureArgs) -> AppConfig {
        let mut next = self.clone();
        if let Some(url) = &edits.url {
            next.plenty_url = url.trim_end_matches('/').to_string();
        }
        if let Some(username) = &edits.username {
            next.login.username = username.clone();
        }
        if let Some(password) = &edits.password {
            next.login.password = password.clone();
        }
        if let Some(start) = edits.start_date {
            next.scope.start_date = start;
        }
        if let Some(end) = edits.end_date {
            next.scope.end_date = exclusive_end(end);
        }
        if let Some(batch_size) = edits.batch_size {
            next.scope.batch_size = batch_size;
        }
        if let Some(zone) = &edits.timezone {
            next.timezone = Some(zone.clone());
        }
        next
    }
}
