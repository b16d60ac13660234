pub mod auth;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod runner;
pub mod server;
pub mod storage;

pub use error::{Error, Result};
