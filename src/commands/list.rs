use anyhow::Result;

use bug_reporter::BugGateway;

pub async fn run(gateway: &dyn BugGateway) -> Result<()> {
    let bugs = gateway.list().await?;

    if bugs.is_empty() {
        println!("No bugs found.");
        return Ok(());
    }

    for bug in bugs {
        let status_display = format!("[{}]", bug.status);
        let date = bug.created_at.format("%Y-%m-%d");
        println!(
            "#{:<4} {:13} {:<40} {:8} {}",
            bug.id,
            status_display,
            truncate(&bug.title, 40),
            bug.priority,
            date
        );
    }

    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}
