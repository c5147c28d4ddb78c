#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod credentials;
mod error;
mod retry;

pub mod request;
pub mod response;

#[cfg(test)]
mod testing;

pub use client::GenieClient;
pub use config::{CalcMode, GenieConfig, TaskMode};
pub use credentials::Credentials;
pub use error::ApiError;
pub use genie_core::{Error, ErrorKind, OutputRef, Result, ServiceHealth, ServiceStatus};
pub use request::{ClusterArgs, CorrespondingFiles, TaskRequest};
pub use response::{ResponseBatch, TaskResponse};
pub use retry::RetryConfig;

/// Tracing target for client operations.
pub const TRACING_TARGET: &str = "genie_client";
