pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod server;
pub mod service;
