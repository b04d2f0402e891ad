pub mod analytics;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod newsletter;
pub mod routes;
pub mod storage;
