use anyhow::Result;

use bug_reporter::{BugGateway, Priority};

pub async fn run(gateway: &dyn BugGateway, id: i64, priority: Priority) -> Result<()> {
    let bug = gateway.update_priority(id, priority).await?;
    println!("Bug #{} priority set to {}", bug.id, bug.priority);
    Ok(())
}
