pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod helix;
pub mod live_status;
pub mod manager;
pub mod models;
pub mod roster_cache;
pub mod scheduler;
pub mod search;
pub mod source;
pub mod view;
