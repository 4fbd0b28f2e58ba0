pub mod budget;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod export;
pub mod patterns;
pub mod run;
pub mod schema;
