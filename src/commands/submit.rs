use anyhow::Result;
use std::sync::Arc;

use bug_reporter::{
    BugGateway, BugReport, BugReporter, EnvironmentContext, Priority, ReporterConfig,
    ReporterOptions,
};

/// What was typed on the command line for `submit`.
#[derive(Debug, Default)]
pub struct Submission {
    pub title: String,
    pub description: Option<String>,
    pub screenshot_url: Option<String>,
    pub priority: Option<Priority>,
    pub metadata: Vec<(String, String)>,
    /// Attach OS, user, host and version details.
    pub with_context: bool,
}

/// Fill a composer the way a user would fill the form.
fn build_reporter(
    gateway: Arc<dyn BugGateway>,
    config: ReporterConfig,
    submission: Submission,
) -> BugReporter {
    // Key/value pairs are the command line's metadata fields
    let config = config.with_options(&ReporterOptions {
        show_metadata_fields: Some(true),
        ..Default::default()
    });

    let mut reporter = BugReporter::with_gateway(config, gateway);
    if submission.with_context {
        let context = EnvironmentContext::new().with_app_version(env!("CARGO_PKG_VERSION"));
        reporter = reporter.with_context(Arc::new(context));
    }

    reporter.set_title(submission.title);
    if let Some(description) = submission.description {
        reporter.set_description(description);
    }
    if let Some(url) = submission.screenshot_url {
        reporter.set_screenshot_url(url);
    }
    if let Some(priority) = submission.priority {
        reporter.set_priority(priority);
    }

    for (key, value) in submission.metadata {
        reporter.push_metadata(key, value);
    }

    reporter
}

pub async fn submit(
    gateway: Arc<dyn BugGateway>,
    config: ReporterConfig,
    submission: Submission,
) -> Result<BugReport> {
    let mut reporter = build_reporter(gateway, config, submission);
    let bug = reporter.submit().await?;
    Ok(bug)
}

pub async fn run(
    gateway: Arc<dyn BugGateway>,
    config: ReporterConfig,
    submission: Submission,
) -> Result<()> {
    let success_message = config.success_message.clone();
    let bug = submit(gateway, config, submission).await?;

    println!("{}", success_message);
    println!("Created bug #{} [{}] {}", bug.id, bug.priority, bug.title);

    Ok(())
}
