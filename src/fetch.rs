use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;

use crate::console::{ConsoleContext, LoadIndicator};
use crate::envelope::NormalizedPage;
use crate::notifications::NotificationKind;
use crate::sections::Section;
use crate::services::{AdminApi, ConsoleError, ConsoleResult, ListQuery, record_id};

/// Page size used for the subsidiary full-list fetches that resolve display
/// names on the linked-listings view.
const SUBSIDIARY_LIMIT: u64 = 500;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchMode {
    /// First fetch after a section activation; drives the full-page loader.
    Initial,
    /// Every later query-state-driven fetch; drives the inline loader so the
    /// visible list never blanks mid-typing.
    Refine,
}

/// Snapshot of the query state a request was built from. A response is only
/// applied while the snapshot's generation still matches the section's.
#[derive(Clone, Debug)]
pub struct FetchTicket {
    pub section: Section,
    pub mode: FetchMode,
    pub query: ListQuery,
    generation: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Applied {
    Done,
    /// The result landed but left `page` past the end; the page was clamped
    /// and a follow-up fetch is needed.
    Clamped,
    /// The query state moved on while the request was in flight; the
    /// response was discarded.
    Stale,
}

pub fn begin_fetch(ctx: &mut ConsoleContext, mode: FetchMode) -> FetchTicket {
    let section = ctx.active;
    let state = ctx.section_mut(section);
    state.loading = match mode {
        FetchMode::Initial => LoadIndicator::FullPage,
        FetchMode::Refine => LoadIndicator::Inline,
    };
    if mode == FetchMode::Initial {
        state.initialized = true;
    }
    FetchTicket {
        section,
        mode,
        query: state.query.to_list_query(),
        generation: state.generation(),
    }
}

/// Dispatches the ticket to the section's endpoint(s) and normalizes the
/// response envelope. Pure with respect to console state.
pub async fn run_fetch<S: AdminApi>(api: &S, ticket: &FetchTicket) -> ConsoleResult<NormalizedPage> {
    let limit = ticket.query.limit;
    match ticket.section {
        Section::Accounts => Ok(api.list_accounts(&ticket.query).await?.normalize(limit)),
        Section::Listings => Ok(api.list_listings(&ticket.query).await?.normalize(limit)),
        Section::Operators => Ok(api.list_operators(&ticket.query).await?.normalize(limit)),
        Section::Complexes => Ok(api.list_complexes(&ticket.query).await?.normalize(limit)),
        Section::LinkedListings => run_linked_fetch(api, ticket).await,
    }
}

/// Linked listings need three requests: the listing page plus the full
/// complex and operator lists for display names. The page is then filtered
/// client-side to listings that actually reference a complex.
async fn run_linked_fetch<S: AdminApi>(
    api: &S,
    ticket: &FetchTicket,
) -> ConsoleResult<NormalizedPage> {
    let full = ListQuery {
        page: 1,
        limit: SUBSIDIARY_LIMIT,
        ..ListQuery::default()
    };
    let (listings, complexes, operators) = futures::join!(
        api.list_listings(&ticket.query),
        api.list_complexes(&full),
        api.list_operators(&full),
    );
    let listings = listings?.normalize(ticket.query.limit);
    let complexes = complexes?.normalize(SUBSIDIARY_LIMIT).items;
    let operators = operators?.normalize(SUBSIDIARY_LIMIT).items;

    let names = |rows: &[Value]| -> HashMap<String, String> {
        rows.iter()
            .map(|row| {
                (
                    record_id(row).to_string(),
                    row.get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                )
            })
            .collect()
    };
    let complex_names = names(&complexes);
    let operator_names = names(&operators);

    let mut rows: Vec<Value> = listings
        .items
        .into_iter()
        .filter(|row| row.get("complex_id").and_then(Value::as_str).is_some())
        .collect();
    for row in &mut rows {
        let complex_id = row
            .get("complex_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(complex_id) = complex_id {
            row["complex_name"] = json!(complex_names.get(&complex_id));
        }
        let operator_id = row
            .get("operator_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(operator_id) = operator_id {
            row["operator_name"] = json!(operator_names.get(&operator_id));
        }
    }
    // The backend totals count unlinked listings too; recompute from what
    // survived the client-side filter.
    Ok(NormalizedPage::from_items(rows, ticket.query.limit))
}

/// Applies a successful result. Writes `total`/`total_pages` back into the
/// query state (nothing else), stores the page, and publishes the render
/// payload.
pub fn apply_page(ctx: &mut ConsoleContext, ticket: &FetchTicket, page: NormalizedPage) -> Applied {
    let state = ctx.section_mut(ticket.section);
    if ticket.generation != state.generation() {
        tracing::debug!(
            section = ?ticket.section,
            stale = ticket.generation,
            current = state.generation(),
            "dropping stale listing response"
        );
        return Applied::Stale;
    }

    state.items = page.items;
    state.error = None;
    state.loading = LoadIndicator::Idle;
    let clamped = state.query.apply_totals(page.total);
    if clamped {
        // The page number changed under us; anything still in flight for the
        // old page must not land.
        state.generation += 1;
    }

    let rows = state.items.clone();
    let pagination = state.query.pagination.clone();
    ctx.context.set("rows", rows);
    ctx.context.set(
        "pagination",
        json!({
            "page": pagination.page,
            "limit": pagination.limit,
            "total": pagination.total,
            "totalPages": pagination.total_pages,
        }),
    );
    if clamped { Applied::Clamped } else { Applied::Done }
}

/// Applies a failed result. Initial failures are loud (notification plus a
/// retry affordance); refine failures keep the last good page and only fill
/// the inline error panel, because the user is usually mid-typing.
pub fn fail_fetch(
    ctx: &mut ConsoleContext,
    ticket: &FetchTicket,
    error: &ConsoleError,
    now: DateTime<Utc>,
) {
    let unauthorized = error.is_unauthorized();
    let message = error.user_message();
    let state = ctx.section_mut(ticket.section);
    if ticket.generation != state.generation() {
        tracing::debug!(section = ?ticket.section, "dropping stale listing failure");
        return;
    }
    state.loading = LoadIndicator::Idle;
    state.error = Some(message.clone());

    if unauthorized {
        ctx.context.set("session_expired", true);
        return;
    }
    match ticket.mode {
        FetchMode::Initial => {
            ctx.context.set("load_failed", true);
            ctx.notifications.push(NotificationKind::Error, &message, now);
        }
        FetchMode::Refine => {
            tracing::debug!(section = ?ticket.section, %message, "refine fetch failed");
        }
    }
}

/// The common full cycle: snapshot, dispatch, apply. A clamped page triggers
/// exactly one follow-up refine fetch so the view never sticks on an empty
/// page.
pub async fn fetch_section<S: AdminApi>(
    api: &S,
    ctx: &mut ConsoleContext,
    mode: FetchMode,
    now: DateTime<Utc>,
) -> ConsoleResult<()> {
    let ticket = begin_fetch(ctx, mode);
    match run_fetch(api, &ticket).await {
        Ok(page) => {
            if apply_page(ctx, &ticket, page) == Applied::Clamped {
                let retry = begin_fetch(ctx, FetchMode::Refine);
                match run_fetch(api, &retry).await {
                    Ok(page) => {
                        apply_page(ctx, &retry, page);
                    }
                    Err(error) => {
                        fail_fetch(ctx, &retry, &error, now);
                        return Err(error);
                    }
                }
            }
            Ok(())
        }
        Err(error) => {
            fail_fetch(ctx, &ticket, &error, now);
            Err(error)
        }
    }
}
