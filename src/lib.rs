pub mod analytics;
pub mod billing;
pub mod config;
pub mod ingest;
pub mod links;
pub mod storage;

pub mod api;
pub mod auth;
pub mod models;
