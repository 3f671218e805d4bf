pub mod database;
pub mod ping;
pub mod token;
