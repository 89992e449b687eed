pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{LocalStorage, PlentyClient, PlentyConnector};
pub use config::{AppConfig, CliArgs, ConfigStore};
pub use core::pipeline::{DocumentPipeline, DownloadLayout};
pub use core::runner::{spawn_service, RunHandle, RunRequest};
pub use domain::model::{ProgressEvent, RunReport};
pub use utils::error::{DocumentorError, Result};
