pub mod http;
pub mod provider;

pub use http::HttpIdentityProvider;
pub use provider::{IdentityProvider, SessionScope, response_shape};
