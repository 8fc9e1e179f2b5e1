pub mod classifier;
pub mod path;
pub mod upstream;

pub use classifier::PathClassifier;
pub use path::UpstreamPath;
pub use upstream::{ProxyOutcome, ProxyRequest, UpstreamClient, UpstreamError, UpstreamResponse};
