pub mod auth;
pub mod billing;
pub mod cache;
pub mod identity;
pub mod proxy;
