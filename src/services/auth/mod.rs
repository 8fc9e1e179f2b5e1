pub mod credential;
pub mod token_resolver;

pub use credential::Credential;
pub use token_resolver::TokenResolver;
