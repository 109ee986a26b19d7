use chrono::{Duration, Utc};

use rentdesk::console::{ConsoleContext, SEARCH_DEBOUNCE_MS, activate_section, tick};
use rentdesk::fetch::{Applied, FetchMode, apply_page, begin_fetch, run_fetch};
use rentdesk::sections::Section;
use rentdesk::services::{AdminApi, InMemoryApi};

// A five-keystroke burst typed inside the debounce window must produce one
// request carrying the final term, not one per keystroke.
#[tokio::test]
async fn keystroke_burst_fires_a_single_search_request() {
    let api = InMemoryApi::new_with_sample();
    let mut ctx = ConsoleContext::default();
    let start = Utc::now();
    activate_section(&api, &mut ctx, Section::Listings, start).await.unwrap();
    let list_calls_before = api.count_calls("GET /properties");
    for (i, term) in ["m", "ma", "map", "mapl", "maple"].iter().enumerate() {
        let at = start + Duration::milliseconds(20 * i as i64);
        ctx.search_input(term, at);
        tick(&api, &mut ctx, at).await.unwrap();
    }

    // Nothing has fired yet; the term is still settling.
    assert_eq!(api.count_calls("GET /properties"), list_calls_before);

    let settled = start + Duration::milliseconds(80 + SEARCH_DEBOUNCE_MS);
    tick(&api, &mut ctx, settled).await.unwrap();

    assert_eq!(api.count_calls("GET /properties"), list_calls_before + 1);
    assert_eq!(api.count_calls("search=maple"), 1);
    assert_eq!(ctx.active_state().items.len(), 1);
    assert_eq!(ctx.active_state().items[0]["title"], "Maple Street Flat");

    // Later ticks do not replay the settled term.
    tick(&api, &mut ctx, settled + Duration::milliseconds(500)).await.unwrap();
    assert_eq!(api.count_calls("GET /properties"), list_calls_before + 1);
}

// A deletion on the last page shrinks the result set; the follow-up fetch
// must clamp to the last valid page instead of showing an empty page.
#[tokio::test]
async fn shrinking_result_set_clamps_the_page() {
    let api = InMemoryApi::new_with_sample();
    let mut ctx = ConsoleContext::default();
    activate_section(&api, &mut ctx, Section::Listings, Utc::now()).await.unwrap();
    ctx.set_limit(1);
    ctx.set_page(2);
    rentdesk::fetch::fetch_section(&api, &mut ctx, FetchMode::Refine, Utc::now())
        .await
        .unwrap();
    assert_eq!(ctx.active_state().query.pagination.page, 2);

    api.delete_listing("p-42").await.unwrap();
    rentdesk::fetch::fetch_section(&api, &mut ctx, FetchMode::Refine, Utc::now())
        .await
        .unwrap();

    let state = ctx.active_state();
    assert_eq!(state.query.pagination.page, 1);
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0]["id"], "p-41");
}

// Out-of-order completion: the response for an outdated query snapshot must
// never overwrite the fresher view.
#[tokio::test]
async fn late_response_for_an_old_page_is_dropped() {
    let api = InMemoryApi::new_with_sample();
    let mut ctx = ConsoleContext::default();
    activate_section(&api, &mut ctx, Section::Listings, Utc::now()).await.unwrap();
    ctx.set_limit(1);

    let old_ticket = begin_fetch(&mut ctx, FetchMode::Refine);
    let old_response = run_fetch(&api, &old_ticket).await.unwrap();

    ctx.set_page(2);
    let new_ticket = begin_fetch(&mut ctx, FetchMode::Refine);
    let new_response = run_fetch(&api, &new_ticket).await.unwrap();
    assert_eq!(apply_page(&mut ctx, &new_ticket, new_response), Applied::Done);

    assert_eq!(apply_page(&mut ctx, &old_ticket, old_response), Applied::Stale);
    assert_eq!(ctx.active_state().query.pagination.page, 2);
    assert_eq!(ctx.active_state().items[0]["id"], "p-42");
}

// Switching sections mid-flight invalidates the outgoing request the same
// way a query change does.
#[tokio::test]
async fn section_switch_invalidates_in_flight_responses() {
    let api = InMemoryApi::new_with_sample();
    let mut ctx = ConsoleContext::default();
    activate_section(&api, &mut ctx, Section::Listings, Utc::now()).await.unwrap();

    let ticket = begin_fetch(&mut ctx, FetchMode::Refine);
    let response = run_fetch(&api, &ticket).await.unwrap();

    activate_section(&api, &mut ctx, Section::Accounts, Utc::now()).await.unwrap();
    activate_section(&api, &mut ctx, Section::Listings, Utc::now()).await.unwrap();

    assert_eq!(apply_page(&mut ctx, &ticket, response), Applied::Stale);
}
