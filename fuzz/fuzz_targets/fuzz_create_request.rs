#![no_main]

//! Fuzz target for bug creation.
//!
//! Raw bytes are decoded as a creation body the way the HTTP route decodes
//! them; structured input goes straight to the database. Neither path may
//! panic, and whatever is stored must read back unchanged.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use bug_reporter::db::Database;
use bug_reporter::gateway::validate_create;
use bug_reporter::{CreateBugRequest, Metadata, MetadataValue, Priority};

#[derive(Arbitrary, Debug)]
struct CreateInput {
    raw_body: Vec<u8>,
    title: String,
    description: Option<String>,
    screenshot_url: Option<String>,
    priority: u8,
    metadata: Vec<(String, String)>,
}

fn store(db: &Database, request: &CreateBugRequest) {
    if validate_create(request).is_err() {
        return;
    }

    let id = match db.create_bug(request) {
        Ok(id) => id,
        Err(_) => return,
    };

    let bug = db
        .get_bug(id)
        .expect("stored bug must be readable")
        .expect("stored bug must exist");
    assert_eq!(bug.title, request.title);
    assert_eq!(bug.description, request.description);
    assert_eq!(bug.priority, request.priority.unwrap_or_default());
}

fuzz_target!(|input: CreateInput| {
    let db = match Database::open_in_memory() {
        Ok(d) => d,
        Err(_) => return,
    };

    if let Ok(request) = serde_json::from_slice::<CreateBugRequest>(&input.raw_body) {
        store(&db, &request);
    }

    let metadata: Metadata = input
        .metadata
        .into_iter()
        .map(|(k, v)| (k, MetadataValue::Text(v)))
        .collect();

    let request = CreateBugRequest {
        title: input.title,
        description: input.description,
        screenshot_url: input.screenshot_url,
        priority: Some(Priority::ALL[input.priority as usize % Priority::ALL.len()]),
        metadata: if metadata.is_empty() { None } else { Some(metadata) },
    };
    store(&db, &request);

    let _ = db.list_bugs();
});
