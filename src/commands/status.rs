use anyhow::Result;

use bug_reporter::{BugGateway, Status};

pub async fn run(gateway: &dyn BugGateway, id: i64, status: Status) -> Result<()> {
    let bug = gateway.update_status(id, status).await?;
    println!("Bug #{} is now {}", bug.id, bug.status);
    Ok(())
}
