use chrono::{Duration, Utc};
use serde_json::json;

use rentdesk::console::{ConsoleContext, SEARCH_DEBOUNCE_MS, activate_section, tick};
use rentdesk::modal::{Approve, confirm_delete, open_add, open_delete, submit};
use rentdesk::sections::Section;
use rentdesk::services::{InMemoryApi, OperatorInfo};
use rentdesk::uploads::PendingUploads;

fn main() {
    tracing_subscriber::fmt().init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("runtime init failed: {error}");
            return;
        }
    };
    runtime.block_on(demo());
}

/// Walks the console through a representative session against the sample
/// in-memory backend: browse, search, create, delete.
async fn demo() {
    let api = InMemoryApi::new_with_sample();
    let mut ctx = ConsoleContext::new(OperatorInfo {
        id: "u-3".into(),
        name: "Admin Ash".into(),
        role: "operator".into(),
    });

    if let Err(error) = activate_section(&api, &mut ctx, Section::Listings, Utc::now()).await {
        eprintln!("activate_section -> {error}");
    }
    println!(
        "{} listings loaded",
        ctx.active_state().query.pagination.total
    );

    // Type into the search box; the refine fetch fires once the term settles.
    let typed_at = Utc::now();
    ctx.search_input("maple", typed_at);
    let settled_at = typed_at + Duration::milliseconds(SEARCH_DEBOUNCE_MS);
    if let Err(error) = tick(&api, &mut ctx, settled_at).await {
        eprintln!("tick -> {error}");
    }
    for row in &ctx.active_state().items {
        println!("match: {}", row["title"]);
    }

    if let Err(error) = activate_section(&api, &mut ctx, Section::Complexes, Utc::now()).await {
        eprintln!("activate_section -> {error}");
    }
    open_add(&mut ctx);
    let form = json!({"name": "Hillside Court", "address": "9 Hill Rd"});
    if let Err(error) = submit(
        &api,
        &mut ctx,
        form,
        &mut PendingUploads::default(),
        &mut Approve,
        Utc::now(),
    )
    .await
    {
        eprintln!("submit -> {error}");
    }

    if let Some(complex) = ctx.active_state().items.first().cloned() {
        open_delete(&mut ctx, complex);
        if let Err(error) = confirm_delete(&api, &mut ctx, Utc::now()).await {
            eprintln!("confirm_delete -> {error}");
        }
    }

    for note in ctx.notifications.visible() {
        println!("[{:?}] {}", note.kind, note.message);
    }
}
