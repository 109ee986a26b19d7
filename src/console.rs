use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::debounce::Debouncer;
use crate::fetch::{self, FetchMode};
use crate::modal::ModalState;
use crate::notifications::NotificationQueue;
use crate::preferences::PreferencesState;
use crate::query::QueryState;
use crate::sections::{ALL_SECTIONS, Section};
use crate::services::{AdminApi, ConsoleResult, DataBag, OperatorInfo};

/// Search keystrokes settle for this long before a refine fetch fires.
pub const SEARCH_DEBOUNCE_MS: i64 = 150;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LoadIndicator {
    #[default]
    Idle,
    /// Blocks the whole section view; only ever shown for the first fetch
    /// after a section activation.
    FullPage,
    /// Inline spinner next to the list; the last good page stays visible.
    Inline,
}

/// Listing state for one section: the query tuple, the last good page of
/// records, and fetch bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct SectionState {
    pub query: QueryState,
    pub items: Vec<Value>,
    pub loading: LoadIndicator,
    pub error: Option<String>,
    pub initialized: bool,
    /// Bumped on every user-action mutation; in-flight responses carrying an
    /// older generation are dropped instead of overwriting fresher state.
    pub(crate) generation: u64,
}

impl SectionState {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn reset(&mut self) {
        self.query = QueryState::default();
        self.items.clear();
        self.loading = LoadIndicator::Idle;
        self.error = None;
        self.initialized = false;
        self.generation += 1;
    }
}

/// The console's whole client-side state: one [`SectionState`] per section,
/// the notification queue, the CRUD modal, and the preferences sub-resource.
///
/// The viewer identity is injected by the host shell rather than read from
/// ambient globals; the engine itself never touches token storage.
pub struct ConsoleContext {
    pub active: Section,
    sections: HashMap<Section, SectionState>,
    pub notifications: NotificationQueue,
    pub modal: ModalState,
    pub media_modal_open: bool,
    pub prefs: PreferencesState,
    pub search_debounce: Debouncer<String>,
    pub context: DataBag,
    pub viewer: OperatorInfo,
}

impl Default for ConsoleContext {
    fn default() -> Self {
        Self::new(OperatorInfo::default())
    }
}

impl ConsoleContext {
    pub fn new(viewer: OperatorInfo) -> Self {
        Self {
            active: Section::Accounts,
            sections: ALL_SECTIONS
                .iter()
                .map(|section| (*section, SectionState::default()))
                .collect(),
            notifications: NotificationQueue::default(),
            modal: ModalState::default(),
            media_modal_open: false,
            prefs: PreferencesState::default(),
            search_debounce: Debouncer::new(Duration::milliseconds(SEARCH_DEBOUNCE_MS)),
            context: DataBag::new(),
            viewer,
        }
    }

    pub fn section(&self, section: Section) -> &SectionState {
        &self.sections[&section]
    }

    pub(crate) fn section_mut(&mut self, section: Section) -> &mut SectionState {
        self.sections
            .get_mut(&section)
            .expect("every section is seeded at construction")
    }

    pub fn active_state(&self) -> &SectionState {
        self.section(self.active)
    }

    /// A keystroke in the search box. Nothing fires until the debounce
    /// window elapses in [`tick`].
    ///
    /// [`tick`]: crate::console::tick
    pub fn search_input(&mut self, term: &str, now: DateTime<Utc>) {
        self.search_debounce.input(term.to_string(), now);
    }

    pub fn set_sort(&mut self, field: &str) {
        let state = self.section_mut(self.active);
        state.query.set_sort(field);
        state.generation += 1;
    }

    pub fn set_filter(&mut self, field: &str, value: &str) {
        let state = self.section_mut(self.active);
        state.query.set_filter(field, value);
        state.generation += 1;
    }

    pub fn set_page(&mut self, page: u64) {
        let state = self.section_mut(self.active);
        state.query.set_page(page);
        state.generation += 1;
    }

    pub fn set_limit(&mut self, limit: u64) {
        let state = self.section_mut(self.active);
        state.query.set_limit(limit);
        state.generation += 1;
    }

    pub(crate) fn apply_search(&mut self, term: &str) {
        let state = self.section_mut(self.active);
        state.query.set_search(term);
        state.generation += 1;
    }
}

/// Makes `section` the active one. The target's query state is reset lazily
/// on activation (prior state is not preserved) and exactly one initial,
/// full-page fetch runs.
pub async fn activate_section<S: AdminApi>(
    api: &S,
    ctx: &mut ConsoleContext,
    section: Section,
    now: DateTime<Utc>,
) -> ConsoleResult<()> {
    ctx.active = section;
    ctx.search_debounce.cancel();
    ctx.section_mut(section).reset();
    fetch::fetch_section(api, ctx, FetchMode::Initial, now).await
}

/// Periodic drive from the host shell: evicts expired notifications and
/// fires the refine fetch for a settled search term.
pub async fn tick<S: AdminApi>(
    api: &S,
    ctx: &mut ConsoleContext,
    now: DateTime<Utc>,
) -> ConsoleResult<()> {
    ctx.notifications.sweep(now);
    if let Some(term) = ctx.search_debounce.poll(now) {
        ctx.apply_search(&term);
        fetch::fetch_section(api, ctx, FetchMode::Refine, now).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryApi;

    #[tokio::test]
    async fn activation_resets_query_state() {
        let api = InMemoryApi::new_with_sample();
        let mut ctx = ConsoleContext::default();
        let now = Utc::now();
        activate_section(&api, &mut ctx, Section::Listings, now).await.unwrap();
        ctx.set_page(3);
        ctx.set_filter("owner_id", "u-2");

        activate_section(&api, &mut ctx, Section::Accounts, now).await.unwrap();
        activate_section(&api, &mut ctx, Section::Listings, now).await.unwrap();
        let state = ctx.active_state();
        assert_eq!(state.query.pagination.page, 1);
        assert!(state.query.filters.is_empty());
        assert!(state.initialized);
    }

    #[tokio::test]
    async fn mutators_invalidate_older_generations() {
        let api = InMemoryApi::new_with_sample();
        let mut ctx = ConsoleContext::default();
        activate_section(&api, &mut ctx, Section::Listings, Utc::now()).await.unwrap();
        let before = ctx.active_state().generation();
        ctx.set_page(2);
        ctx.set_sort("price");
        assert!(ctx.active_state().generation() > before);
    }
}
