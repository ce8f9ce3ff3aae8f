//! Case Pager Library
//!
//! A serverless handler that serves pages of support cases from the
//! `cssp_case` table as JSON, optionally filtered by modification date.
//! The binary wires `handler::handle` into the Lambda runtime.

pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod models;
pub mod validation;

pub use config::Config;
pub use error::{HandlerError, HandlerResult};
pub use handler::handle;
pub use models::{DatabaseSettings, LambdaResponse};
