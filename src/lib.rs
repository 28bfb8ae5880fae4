//! A small bug tracker.
//!
//! The crate has two halves:
//!
//! - a record store: SQLite persistence ([`db`]) behind the [`BugGateway`]
//!   trait, served over HTTP by [`server`];
//! - a submission composer ([`BugReporter`]) that validates what a reporter
//!   typed, merges metadata from form fields and a [`ContextProvider`], and
//!   submits through any gateway, usually [`HttpGateway`].

pub mod client;
pub mod composer;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod server;

pub use client::HttpGateway;
pub use composer::BugReporter;
pub use config::{AppConfig, ReporterConfig, ReporterOptions};
pub use context::{AsyncContext, ContextProvider, EnvironmentContext};
pub use error::{BugError, Result};
pub use gateway::{BugGateway, LocalGateway};
pub use logging::{init_logging, Verbosity};
pub use models::{BugReport, CreateBugRequest, Metadata, MetadataValue, Priority, Status};
