//! The submission composer: the state behind the embeddable bug report form.
//!
//! A [`BugReporter`] holds what the user has typed, validates it, merges
//! metadata from the form's key/value fields and from an optional
//! [`ContextProvider`], and hands the resulting payload to a [`BugGateway`].
//!
//! Metadata precedence, lowest to highest:
//! 1. key/value fields, in the order they were added (later duplicates win)
//! 2. context data from the provider
//!
//! An empty result is sent as no `metadata` key at all.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::client::HttpGateway;
use crate::config::ReporterConfig;
use crate::context::ContextProvider;
use crate::error::{BugError, Result};
use crate::gateway::BugGateway;
use crate::models::{BugReport, CreateBugRequest, Metadata, MetadataValue, Priority};

/// How long the success message stays visible after a submission.
pub const SUCCESS_DISPLAY: Duration = Duration::from_secs(3);

/// Message shown when the store rejects or never receives a submission.
pub const SUBMIT_ERROR_MESSAGE: &str =
    "An error occurred while submitting the form. Please try again.";

pub const TITLE_REQUIRED_MESSAGE: &str = "Title is required";

/// One key/value row of the custom metadata section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
    pub id: u64,
    pub key: String,
    pub value: String,
}

impl MetadataField {
    /// Trimmed key and value, if both are non-empty.
    fn entry(&self) -> Option<(&str, &str)> {
        let key = self.key.trim();
        let value = self.value.trim();
        if key.is_empty() || value.is_empty() {
            None
        } else {
            Some((key, value))
        }
    }
}

/// Which half of a metadata field an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPart {
    Key,
    Value,
}

/// Metadata from the form's key/value fields. Incomplete rows are skipped;
/// when a key repeats, the later row wins.
pub fn field_metadata(fields: &[MetadataField]) -> Metadata {
    fields
        .iter()
        .filter_map(MetadataField::entry)
        .map(|(key, value)| (key.to_string(), MetadataValue::from(value)))
        .collect()
}

/// Overlay `context` on `base`. Context values replace same-named keys.
pub fn merge_metadata(mut base: Metadata, context: Metadata) -> Metadata {
    base.extend(context);
    base
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

type SuccessHook = Box<dyn Fn(&BugReport) + Send + Sync>;
type ErrorHook = Box<dyn Fn(&BugError) + Send + Sync>;

pub struct BugReporter {
    config: ReporterConfig,
    gateway: Arc<dyn BugGateway>,
    context: Option<Arc<dyn ContextProvider>>,
    on_success: Option<SuccessHook>,
    on_error: Option<ErrorHook>,

    title: String,
    description: String,
    screenshot_url: String,
    priority: Option<Priority>,
    metadata_fields: Vec<MetadataField>,
    next_field_id: u64,

    error: Option<String>,
    validation_error: Option<String>,
    succeeded_at: Option<Instant>,
}

impl fmt::Debug for BugReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BugReporter")
            .field("config", &self.config)
            .field("title", &self.title)
            .field("priority", &self.priority)
            .field("metadata_fields", &self.metadata_fields)
            .field("error", &self.error)
            .field("validation_error", &self.validation_error)
            .finish_non_exhaustive()
    }
}

impl BugReporter {
    /// A form that submits over HTTP to the configured endpoint.
    pub fn new(config: ReporterConfig) -> Self {
        let gateway = Arc::new(HttpGateway::new(config.endpoint()));
        Self::with_gateway(config, gateway)
    }

    /// A form that submits through `gateway`, ignoring `api_endpoint`.
    pub fn with_gateway(config: ReporterConfig, gateway: Arc<dyn BugGateway>) -> Self {
        let mut reporter = Self {
            config,
            gateway,
            context: None,
            on_success: None,
            on_error: None,
            title: String::new(),
            description: String::new(),
            screenshot_url: String::new(),
            priority: None,
            metadata_fields: Vec::new(),
            next_field_id: 0,
            error: None,
            validation_error: None,
            succeeded_at: None,
        };
        reporter.reset_fields();
        reporter
    }

    /// Collect context data from `provider` on every submission.
    #[must_use]
    pub fn with_context(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context = Some(provider);
        self
    }

    #[must_use]
    pub fn on_submit_success(mut self, hook: impl Fn(&BugReport) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_submit_error(mut self, hook: impl Fn(&BugError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    // Field editing

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_screenshot_url(&mut self, url: impl Into<String>) {
        self.screenshot_url = url.into();
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = Some(priority);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn screenshot_url(&self) -> &str {
        &self.screenshot_url
    }

    /// The priority a submission would carry right now.
    pub fn priority(&self) -> Priority {
        if self.config.show_priority {
            self.priority.unwrap_or(self.config.default_priority)
        } else {
            self.config.default_priority
        }
    }

    pub fn metadata_fields(&self) -> &[MetadataField] {
        &self.metadata_fields
    }

    /// Append an empty key/value row and return its id.
    pub fn add_metadata_field(&mut self) -> u64 {
        let id = self.next_field_id;
        self.next_field_id += 1;
        self.metadata_fields.push(MetadataField {
            id,
            key: String::new(),
            value: String::new(),
        });
        id
    }

    /// Remove a row. The last remaining row is never removed.
    pub fn remove_metadata_field(&mut self, id: u64) -> bool {
        if self.metadata_fields.len() <= 1 {
            return false;
        }
        let before = self.metadata_fields.len();
        self.metadata_fields.retain(|field| field.id != id);
        self.metadata_fields.len() != before
    }

    pub fn set_metadata_field(&mut self, id: u64, part: FieldPart, text: impl Into<String>) -> bool {
        match self.metadata_fields.iter_mut().find(|field| field.id == id) {
            Some(field) => {
                match part {
                    FieldPart::Key => field.key = text.into(),
                    FieldPart::Value => field.value = text.into(),
                }
                true
            }
            None => false,
        }
    }

    /// Fill the most recent row, or add one if it is already in use.
    pub fn push_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) -> u64 {
        let reusable = self
            .metadata_fields
            .last()
            .filter(|field| field.key.is_empty() && field.value.is_empty())
            .map(|field| field.id);
        let id = match reusable {
            Some(id) => id,
            None => self.add_metadata_field(),
        };
        self.set_metadata_field(id, FieldPart::Key, key);
        self.set_metadata_field(id, FieldPart::Value, value);
        id
    }

    // Submission state

    /// Generic error from the last failed submission.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Inline message for the title field.
    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    pub fn success_visible(&self) -> bool {
        self.success_visible_at(Instant::now())
    }

    /// Whether the success message is still showing at `now`.
    pub fn success_visible_at(&self, now: Instant) -> bool {
        match self.succeeded_at {
            Some(at) => now.saturating_duration_since(at) < SUCCESS_DISPLAY,
            None => false,
        }
    }

    /// Build the creation payload without sending it.
    ///
    /// Fails only on an invalid title. A failing context provider is logged
    /// and its data left out.
    pub async fn compose(&self) -> Result<CreateBugRequest> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(BugError::validation("title", TITLE_REQUIRED_MESSAGE));
        }

        let mut request = CreateBugRequest::new(title);
        request.priority = Some(self.priority());

        if self.config.show_description {
            request.description = non_empty(&self.description);
        }
        if self.config.show_screenshot_url {
            request.screenshot_url = non_empty(&self.screenshot_url);
        }

        let mut metadata = Metadata::new();
        if self.config.show_metadata_fields {
            metadata = field_metadata(&self.metadata_fields);
        }

        if let Some(provider) = &self.context {
            match provider.collect().await {
                Ok(context) => metadata = merge_metadata(metadata, context),
                Err(e) => {
                    let err = BugError::ContextCollection(format!("{:#}", e));
                    error!(error = %err, "continuing without context data");
                }
            }
        }

        if !metadata.is_empty() {
            request.metadata = Some(metadata);
        }

        Ok(request)
    }

    /// Validate, compose and send the report.
    ///
    /// The `&mut self` borrow keeps one submission per form in flight.
    ///
    /// On success the form is reset and the success message shown for
    /// [`SUCCESS_DISPLAY`]. On failure the entered values are kept.
    pub async fn submit(&mut self) -> Result<BugReport> {
        self.validation_error = None;

        let request = match self.compose().await {
            Ok(request) => request,
            Err(err) => {
                if let BugError::Validation { message, .. } = &err {
                    self.validation_error = Some(message.clone());
                }
                return Err(err);
            }
        };

        self.error = None;
        debug!(title = %request.title, "submitting bug report");

        let result = self.gateway.create(request).await;

        match result {
            Ok(bug) => {
                info!(id = bug.id, "bug report submitted");
                self.succeeded_at = Some(Instant::now());
                self.reset_fields();
                if let Some(hook) = &self.on_success {
                    hook(&bug);
                }
                Ok(bug)
            }
            Err(err) => {
                error!(error = %err, "bug report submission failed");
                self.error = Some(SUBMIT_ERROR_MESSAGE.to_string());
                if let Some(hook) = &self.on_error {
                    hook(&err);
                }
                Err(err)
            }
        }
    }

    fn reset_fields(&mut self) {
        self.title.clear();
        self.description.clear();
        self.screenshot_url.clear();
        self.priority = None;
        self.metadata_fields.clear();
        self.add_metadata_field();
    }
}
