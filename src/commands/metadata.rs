use anyhow::{bail, Result};

use bug_reporter::{BugGateway, Metadata, MetadataValue};

/// Split `key=value` at the first `=`. Used as a clap value parser.
pub fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

/// Read a value typed on the command line: JSON scalars keep their type,
/// anything else is text.
pub fn parse_value(raw: &str) -> MetadataValue {
    serde_json::from_str::<MetadataValue>(raw).unwrap_or_else(|_| MetadataValue::from(raw))
}

pub async fn run(gateway: &dyn BugGateway, id: i64, pairs: &[(String, String)]) -> Result<()> {
    if pairs.is_empty() {
        bail!("Nothing to set. Pass one or more key=value pairs");
    }

    let metadata: Metadata = pairs
        .iter()
        .map(|(key, value)| (key.clone(), parse_value(value)))
        .collect();

    let bug = gateway.update_metadata(id, metadata).await?;
    let count = bug.metadata.as_ref().map_or(0, |m| m.len());
    println!("Bug #{} now has {} metadata key(s)", bug.id, count);
    Ok(())
}
