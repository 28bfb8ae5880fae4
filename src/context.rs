//! Context data: metadata collected by the embedding application rather than
//! typed in by the reporter (who they are, where they were, what build).

use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;

use crate::models::{Metadata, MetadataValue};

/// Produces context metadata for a submission. Implementations may be
/// synchronous or asynchronous; the composer awaits either.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn collect(&self) -> anyhow::Result<Metadata>;
}

/// Any synchronous closure returning metadata is a provider.
#[async_trait]
impl<F> ContextProvider for F
where
    F: Fn() -> anyhow::Result<Metadata> + Send + Sync,
{
    async fn collect(&self) -> anyhow::Result<Metadata> {
        self()
    }
}

/// Adapts a closure returning a future into a provider.
pub struct AsyncContext<F>(pub F);

#[async_trait]
impl<F, Fut> ContextProvider for AsyncContext<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Metadata>> + Send,
{
    async fn collect(&self) -> anyhow::Result<Metadata> {
        (self.0)().await
    }
}

/// Describes the machine the report is sent from: OS, architecture, user,
/// host, a timestamp and optionally the application version.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentContext {
    app_version: Option<String>,
}

impl EnvironmentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    pub fn snapshot(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("os".to_string(), std::env::consts::OS.into());
        metadata.insert("arch".to_string(), std::env::consts::ARCH.into());
        metadata.insert("reportedAt".to_string(), Utc::now().to_rfc3339().into());

        if let Some(user) = first_env(&["USER", "USERNAME"]) {
            metadata.insert("reportedBy".to_string(), user.into());
        }
        if let Some(host) = first_env(&["HOSTNAME", "COMPUTERNAME"]) {
            metadata.insert("host".to_string(), host.into());
        }
        if let Some(version) = &self.app_version {
            metadata.insert("appVersion".to_string(), MetadataValue::from(version.as_str()));
        }

        metadata
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

#[async_trait]
impl ContextProvider for EnvironmentContext {
    async fn collect(&self) -> anyhow::Result<Metadata> {
        Ok(self.snapshot())
    }
}
