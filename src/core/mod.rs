pub mod auth;
pub mod extractor;
pub mod fetcher;
pub mod locator;
pub mod pipeline;
pub mod progress;
pub mod runner;

pub use crate::domain::model::{ProgressEvent, RunReport};
pub use crate::domain::ports::{ApiConnector, DocumentApi, Storage};
pub use crate::utils::error::Result;
