//! Provider clients.

pub mod http;
pub mod replay;
mod traits;

pub use http::{HttpProviderConfig, HttpRatioProvider};
pub use replay::ReplayProvider;
pub use traits::ProviderClient;
