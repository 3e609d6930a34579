// src/lib.rs
pub mod ai;
pub mod backend;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
pub mod telemetry;

pub use config::AppConfig;
pub use error::{Error, Result};
