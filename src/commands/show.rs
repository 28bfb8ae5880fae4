use anyhow::Result;

use bug_reporter::{BugGateway, BugReport};

pub async fn run(gateway: &dyn BugGateway, id: i64, json: bool) -> Result<()> {
    let bug = gateway.get(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&bug)?);
    } else {
        print!("{}", render(&bug));
    }

    Ok(())
}

fn render(bug: &BugReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Bug #{}: {}\n", bug.id, bug.title));
    out.push_str(&format!("Status: {}\n", bug.status));
    out.push_str(&format!("Priority: {}\n", bug.priority));
    out.push_str(&format!(
        "Created: {}\n",
        bug.created_at.format("%Y-%m-%d %H:%M:%S")
    ));

    if let Some(url) = &bug.screenshot_url {
        out.push_str(&format!("Screenshot: {}\n", url));
    }

    if let Some(desc) = &bug.description {
        if !desc.is_empty() {
            out.push_str("\nDescription:\n");
            for line in desc.lines() {
                out.push_str(&format!("  {}\n", line));
            }
        }
    }

    if let Some(metadata) = &bug.metadata {
        if !metadata.is_empty() {
            out.push_str("\nMetadata:\n");
            for (key, value) in metadata {
                out.push_str(&format!("  {}: {}\n", key, value));
            }
        }
    }

    out
}
