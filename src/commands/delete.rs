use anyhow::Result;
use std::io::{self, Write};

use bug_reporter::BugGateway;

pub async fn run(gateway: &dyn BugGateway, id: i64, force: bool) -> Result<()> {
    // Fails with "not found" before prompting
    let bug = gateway.get(id).await?;

    if !force {
        print!("Delete bug #{} \"{}\"? [y/N] ", id, bug.title);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    gateway.delete(id).await?;
    println!("Deleted bug #{}", id);

    Ok(())
}

/// Internal function for testing without stdin interaction
#[cfg(test)]
pub async fn run_force(gateway: &dyn BugGateway, id: i64) -> Result<()> {
    run(gateway, id, true).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::setup_gateway;
    use bug_reporter::{BugError, CreateBugRequest, Metadata, MetadataValue};
    use proptest::prelude::*;

    // ==================== Unit Tests ====================

    #[tokio::test]
    async fn test_delete_existing_bug_force() {
        let (gateway, _dir) = setup_gateway();
        let bug = gateway.create(CreateBugRequest::new("To delete")).await.unwrap();

        run_force(&gateway, bug.id).await.unwrap();

        assert!(matches!(
            gateway.get(bug.id).await,
            Err(BugError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_nonexistent_bug() {
        let (gateway, _dir) = setup_gateway();
        gateway.create(CreateBugRequest::new("Survivor")).await.unwrap();
        let before = gateway.list().await.unwrap();

        let result = run_force(&gateway, 99999).await;

        assert!(result.unwrap_err().to_string().contains("not found"));
        assert_eq!(gateway.list().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_twice_fails() {
        let (gateway, _dir) = setup_gateway();
        let bug = gateway.create(CreateBugRequest::new("Once")).await.unwrap();

        run_force(&gateway, bug.id).await.unwrap();
        assert!(run_force(&gateway, bug.id).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_drops_metadata() {
        let (gateway, _dir) = setup_gateway();
        let mut request = CreateBugRequest::new("With metadata");
        request.metadata = Some(Metadata::from([(
            "browser".to_string(),
            MetadataValue::from("Chrome"),
        )]));
        let bug = gateway.create(request).await.unwrap();

        run_force(&gateway, bug.id).await.unwrap();

        // A new bug never inherits the deleted one's metadata
        let next = gateway.create(CreateBugRequest::new("Fresh")).await.unwrap();
        assert!(next.metadata.is_none());
    }

    #[tokio::test]
    async fn test_delete_multiple_bugs() {
        let (gateway, _dir) = setup_gateway();
        let id1 = gateway.create(CreateBugRequest::new("Bug 1")).await.unwrap().id;
        let id2 = gateway.create(CreateBugRequest::new("Bug 2")).await.unwrap().id;
        let id3 = gateway.create(CreateBugRequest::new("Bug 3")).await.unwrap().id;

        run_force(&gateway, id1).await.unwrap();
        run_force(&gateway, id2).await.unwrap();

        let bugs = gateway.list().await.unwrap();
        assert_eq!(bugs.len(), 1);
        assert_eq!(bugs[0].id, id3);
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_delete_force_removes_bug(title in "[a-zA-Z0-9]{1,50}") {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let (gateway, _dir) = setup_gateway();

            let gone = runtime.block_on(async {
                let bug = gateway.create(CreateBugRequest::new(title)).await.unwrap();
                run_force(&gateway, bug.id).await.unwrap();
                gateway.get(bug.id).await.is_err()
            });

            prop_assert!(gone);
        }

        #[test]
        fn prop_delete_nonexistent_fails(id in 1000i64..10000) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let (gateway, _dir) = setup_gateway();

            let result = runtime.block_on(run_force(&gateway, id));
            prop_assert!(result.is_err());
        }
    }
}
