pub mod api;
pub mod clients;
pub mod config;
pub mod consumers;
pub mod error;
pub mod models;
pub mod publisher;
pub mod utils;
