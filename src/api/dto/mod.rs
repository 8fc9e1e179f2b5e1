pub mod account;
pub mod debug;
pub mod decision_record;
