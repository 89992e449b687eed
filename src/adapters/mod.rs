// Adapters layer: concrete implementations of the domain ports.

pub mod http;
pub mod storage;

pub use http::{PlentyClient, PlentyConnector, PlentyEndpoints};
pub use storage::LocalStorage;
