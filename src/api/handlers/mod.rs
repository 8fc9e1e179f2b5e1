pub mod account;
pub mod billing;
pub mod debug;
pub mod decision_record;
pub mod health;
pub mod proxy;
