pub mod config;
pub mod engine;
pub mod http;
pub mod models;
pub mod sessions;
pub mod storage;
