use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::envelope::ListEnvelope;
use crate::sections::Section;

pub mod http;

pub type ConsoleResult<T> = Result<T, ConsoleError>;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("api error ({status}): {message:?}")]
    Api { status: u16, message: Option<String> },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConsoleError::Api { status: 404, .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConsoleError::Api { status: 401, .. })
    }

    /// Message suitable for a user-facing notification: the server-provided
    /// message when there is one, otherwise a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::Validation(msg) => msg.clone(),
            ConsoleError::Api {
                message: Some(msg), ..
            } => msg.clone(),
            ConsoleError::Api { status, .. } => format!("Request failed (status {status})"),
            ConsoleError::Network(_) | ConsoleError::Internal(_) => {
                "Something went wrong, please try again".into()
            }
        }
    }
}

pub fn ensure(condition: bool, error: ConsoleError) -> ConsoleResult<()> {
    if condition { Ok(()) } else { Err(error) }
}

#[derive(Clone, Debug, Default)]
pub struct DataBag {
    inner: HashMap<String, Value>,
}

impl DataBag {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        self.inner.insert(
            key.to_string(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
    }

    pub fn remove(&mut self, key: &str) {
        self.inner.remove(key);
    }

    pub fn bool(&self, key: &str) -> bool {
        self.inner
            .get(key)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.inner.get(key).and_then(|value| value.as_i64())
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .and_then(|value| value.as_str().map(|s| s.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}

/// Identity of the operator using the console, injected by the host shell
/// (token storage and the role gate live upstream).
#[derive(Clone, Debug)]
pub struct OperatorInfo {
    pub id: String,
    pub name: String,
    pub role: String,
}

impl Default for OperatorInfo {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::from("Operator"),
            role: String::from("operator"),
        }
    }
}

/// Wire-level listing query assembled from a section's [`QueryState`].
///
/// [`QueryState`]: crate::query::QueryState
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u64,
    pub limit: u64,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub filters: Vec<(String, String)>,
}

/// File staged client-side before submission.
#[derive(Clone, Debug)]
pub struct StagedFile {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl StagedFile {
    pub fn new(name: &str, content_type: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub key: String,
}

/// 1:1 preferences record for tenant accounts.
#[derive(Clone, Debug, serde::Deserialize, Serialize)]
pub struct PreferencesRecord {
    pub account_id: String,
    pub data: Value,
}

/// Remote marketplace API consumed by the console.
///
/// The console never talks to the network directly; everything goes through
/// this seam so tests can run against [`InMemoryApi`] and production against
/// [`http::HttpApi`]. Operator accounts are plain accounts carrying an
/// operator role, so they have no mutation endpoints of their own.
#[allow(async_fn_in_trait)]
pub trait AdminApi {
    async fn list_accounts(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope>;
    async fn list_listings(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope>;
    async fn list_operators(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope>;
    async fn list_complexes(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope>;

    async fn create_account(&self, payload: &Value) -> ConsoleResult<Value>;
    async fn update_account(&self, id: &str, payload: &Value) -> ConsoleResult<Value>;
    async fn delete_account(&self, id: &str) -> ConsoleResult<()>;
    async fn change_account_role(&self, id: &str, role: &str) -> ConsoleResult<Value>;

    async fn create_listing(&self, payload: &Value) -> ConsoleResult<Value>;
    async fn update_listing(&self, id: &str, payload: &Value) -> ConsoleResult<Value>;
    async fn delete_listing(&self, id: &str) -> ConsoleResult<()>;

    async fn create_complex(&self, payload: &Value) -> ConsoleResult<Value>;
    async fn update_complex(&self, id: &str, payload: &Value) -> ConsoleResult<Value>;
    async fn delete_complex(&self, id: &str) -> ConsoleResult<()>;

    async fn get_preferences(&self, account_id: &str) -> ConsoleResult<PreferencesRecord>;
    async fn create_preferences(
        &self,
        account_id: &str,
        payload: &Value,
    ) -> ConsoleResult<PreferencesRecord>;
    async fn update_preferences(
        &self,
        account_id: &str,
        payload: &Value,
    ) -> ConsoleResult<PreferencesRecord>;
    async fn delete_preferences(&self, account_id: &str) -> ConsoleResult<()>;

    async fn upload_logo(&self, file: &StagedFile) -> ConsoleResult<UploadedFile>;
    async fn upload_video(&self, file: &StagedFile) -> ConsoleResult<UploadedFile>;
    async fn upload_photos(&self, files: &[StagedFile]) -> ConsoleResult<Vec<UploadedFile>>;
    async fn upload_documents(&self, files: &[StagedFile]) -> ConsoleResult<Vec<UploadedFile>>;
}

#[derive(Default)]
struct InMemoryState {
    accounts: Vec<Value>,
    listings: Vec<Value>,
    complexes: Vec<Value>,
    preferences: HashMap<String, PreferencesRecord>,
    failing_uploads: HashSet<&'static str>,
    calls: Vec<String>,
    next_id: u64,
}

impl InMemoryState {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-memory [`AdminApi`] used by tests and the demo binary.
///
/// It answers with deliberately heterogeneous envelopes per section, the same
/// spread the live backend exhibits, and records every call so tests can
/// assert exact request counts.
#[derive(Clone)]
pub struct InMemoryApi {
    state: Arc<Mutex<InMemoryState>>,
}

impl Default for InMemoryApi {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState::default())),
        }
    }
}

impl InMemoryApi {
    pub fn new_with_sample() -> Self {
        let api = Self::default();
        {
            let mut state = api.state.lock().unwrap();
            state.accounts = vec![
                json!({"id": "u-1", "name": "Maple Tenant", "email": "maple@rentdesk.test", "role": "tenant"}),
                json!({"id": "u-2", "name": "Oak Landlord", "email": "oak@rentdesk.test", "role": "landlord"}),
                json!({"id": "u-3", "name": "Admin Ash", "email": "ash@rentdesk.test", "role": "operator"}),
            ];
            state.listings = vec![
                json!({"id": "p-41", "title": "Maple Street Flat", "address": "12 Maple St", "price": 1200, "owner_id": "u-2"}),
                json!({"id": "p-42", "title": "Oak Avenue Loft", "address": "3 Oak Ave", "price": 1750, "owner_id": "u-2", "complex_id": "c-1"}),
            ];
            state.complexes = vec![
                json!({"id": "c-1", "name": "Riverside Towers", "address": "1 River Rd", "logo": "https://cdn.rentdesk.test/c-1/logo.png"}),
            ];
            state.next_id = 100;
        }
        api
    }

    /// Makes the named upload slots reject, for partial-failure scenarios.
    pub fn fail_uploads(&self, slots: &[&'static str]) {
        let mut state = self.state.lock().unwrap();
        state.failing_uploads.extend(slots.iter().copied());
    }

    /// Calls recorded so far, in order, as `"METHOD path"` strings.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, needle: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.contains(needle))
            .count()
    }

    pub fn insert_account(&self, account: Value) {
        self.state.lock().unwrap().accounts.push(account);
    }

    pub fn insert_listing(&self, listing: Value) {
        self.state.lock().unwrap().listings.push(listing);
    }

    pub fn insert_complex(&self, complex: Value) {
        self.state.lock().unwrap().complexes.push(complex);
    }

    pub fn insert_preferences(&self, record: PreferencesRecord) {
        let mut state = self.state.lock().unwrap();
        state.preferences.insert(record.account_id.clone(), record);
    }

    pub fn account(&self, id: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state.accounts.iter().find(|a| record_id(a) == id).cloned()
    }

    pub fn listing(&self, id: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state.listings.iter().find(|l| record_id(l) == id).cloned()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

pub fn record_id(record: &Value) -> &str {
    record.get("id").and_then(Value::as_str).unwrap_or("")
}

fn field_text(record: &Value, field: &str) -> String {
    match record.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

const SEARCH_FIELDS: [&str; 4] = ["name", "title", "address", "email"];

/// Server-side listing semantics shared by every in-memory collection:
/// filter, search, sort, then paginate.
fn run_query(items: &[Value], query: &ListQuery) -> (Vec<Value>, u64, u64) {
    let mut rows: Vec<Value> = items
        .iter()
        .filter(|row| {
            query
                .filters
                .iter()
                .all(|(field, expected)| field_text(row, field) == *expected)
        })
        .filter(|row| match &query.search {
            Some(term) => {
                let needle = term.to_lowercase();
                SEARCH_FIELDS
                    .iter()
                    .any(|field| field_text(row, field).to_lowercase().contains(&needle))
            }
            None => true,
        })
        .cloned()
        .collect();

    if let Some(field) = &query.sort_by {
        rows.sort_by(|a, b| field_text(a, field).cmp(&field_text(b, field)));
        if query.order.as_deref() == Some("DESC") {
            rows.reverse();
        }
    }

    let total = rows.len() as u64;
    let limit = query.limit.max(1);
    let total_pages = total.div_ceil(limit);
    let start = ((query.page.max(1) - 1) * limit) as usize;
    let page: Vec<Value> = rows.into_iter().skip(start).take(limit as usize).collect();
    (page, total, total_pages)
}

fn mutation_error(op: &str, id: &str) -> ConsoleError {
    ConsoleError::Api {
        status: 404,
        message: Some(format!("{op}: no record with id {id}")),
    }
}

impl InMemoryApi {
    fn list_collection(
        &self,
        section: Section,
        query: &ListQuery,
        role_filter: Option<&str>,
    ) -> ListEnvelope {
        let state = self.state.lock().unwrap();
        let source: Vec<Value> = match section {
            Section::Accounts | Section::Operators => state
                .accounts
                .iter()
                .filter(|a| match role_filter {
                    Some(role) => field_text(a, "role") == role,
                    None => true,
                })
                .cloned()
                .collect(),
            Section::Listings | Section::LinkedListings => state.listings.clone(),
            Section::Complexes => state.complexes.clone(),
        };
        drop(state);

        let (rows, total, total_pages) = run_query(&source, query);
        match section {
            // The live backend is inconsistent about envelopes; mirror that
            // spread so normalization is exercised on every section.
            Section::Accounts | Section::Operators => {
                let mut map = serde_json::Map::new();
                map.insert(section.collection_key().to_string(), Value::Array(rows));
                map.insert("total".into(), json!(total));
                map.insert("totalPages".into(), json!(total_pages));
                ListEnvelope::Named(map)
            }
            Section::Listings | Section::LinkedListings => ListEnvelope::Paged {
                data: rows,
                total,
                total_pages,
            },
            Section::Complexes => ListEnvelope::Bare(rows),
        }
    }

    fn upload_one(&self, slot: &'static str, file: &StagedFile) -> ConsoleResult<UploadedFile> {
        self.record(format!("POST /upload/{slot}"));
        let mut state = self.state.lock().unwrap();
        if state.failing_uploads.contains(slot) {
            return Err(ConsoleError::Api {
                status: 500,
                message: Some(format!("{slot} upload rejected: {}", file.name)),
            });
        }
        let key = state.fresh_id(slot);
        Ok(UploadedFile {
            url: format!("https://cdn.rentdesk.test/{key}/{}", file.name),
            key,
        })
    }

    fn create_in(
        &self,
        collection: fn(&mut InMemoryState) -> &mut Vec<Value>,
        prefix: &str,
        payload: &Value,
    ) -> Value {
        let mut state = self.state.lock().unwrap();
        let mut record = payload.clone();
        if record_id(&record).is_empty() {
            let id = state.fresh_id(prefix);
            record["id"] = json!(id);
        }
        collection(&mut state).push(record.clone());
        record
    }

    fn update_in(
        &self,
        collection: fn(&mut InMemoryState) -> &mut Vec<Value>,
        op: &str,
        id: &str,
        payload: &Value,
    ) -> ConsoleResult<Value> {
        let mut state = self.state.lock().unwrap();
        let rows = collection(&mut state);
        let row = rows
            .iter_mut()
            .find(|row| record_id(row) == id)
            .ok_or_else(|| mutation_error(op, id))?;
        if let (Some(target), Some(patch)) = (row.as_object_mut(), payload.as_object()) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(row.clone())
    }

    fn delete_in(
        &self,
        collection: fn(&mut InMemoryState) -> &mut Vec<Value>,
        op: &str,
        id: &str,
    ) -> ConsoleResult<()> {
        let mut state = self.state.lock().unwrap();
        let rows = collection(&mut state);
        let before = rows.len();
        rows.retain(|row| record_id(row) != id);
        ensure(rows.len() < before, mutation_error(op, id))
    }
}

fn accounts(state: &mut InMemoryState) -> &mut Vec<Value> {
    &mut state.accounts
}

fn listings(state: &mut InMemoryState) -> &mut Vec<Value> {
    &mut state.listings
}

fn complexes(state: &mut InMemoryState) -> &mut Vec<Value> {
    &mut state.complexes
}

impl AdminApi for InMemoryApi {
    async fn list_accounts(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope> {
        self.record(format!(
            "GET /users page={} limit={}",
            query.page, query.limit
        ));
        Ok(self.list_collection(Section::Accounts, query, None))
    }

    async fn list_listings(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope> {
        self.record(format!(
            "GET /properties page={} limit={} search={}",
            query.page,
            query.limit,
            query.search.as_deref().unwrap_or("")
        ));
        Ok(self.list_collection(Section::Listings, query, None))
    }

    async fn list_operators(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope> {
        self.record("GET /admins".into());
        Ok(self.list_collection(Section::Operators, query, Some("operator")))
    }

    async fn list_complexes(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope> {
        self.record("GET /complexes".into());
        Ok(self.list_collection(Section::Complexes, query, None))
    }

    async fn create_account(&self, payload: &Value) -> ConsoleResult<Value> {
        self.record("POST /users".into());
        Ok(self.create_in(accounts, "u", payload))
    }

    async fn update_account(&self, id: &str, payload: &Value) -> ConsoleResult<Value> {
        self.record(format!("PUT /users/{id}"));
        self.update_in(accounts, "update_account", id, payload)
    }

    async fn delete_account(&self, id: &str) -> ConsoleResult<()> {
        self.record(format!("DELETE /users/{id}"));
        let mut state = self.state.lock().unwrap();
        state.preferences.remove(id);
        let before = state.accounts.len();
        state.accounts.retain(|row| record_id(row) != id);
        ensure(
            state.accounts.len() < before,
            mutation_error("delete_account", id),
        )
    }

    async fn change_account_role(&self, id: &str, role: &str) -> ConsoleResult<Value> {
        self.record(format!("PUT /users/{id}/role"));
        self.update_in(accounts, "change_account_role", id, &json!({ "role": role }))
    }

    async fn create_listing(&self, payload: &Value) -> ConsoleResult<Value> {
        self.record("POST /properties".into());
        Ok(self.create_in(listings, "p", payload))
    }

    async fn update_listing(&self, id: &str, payload: &Value) -> ConsoleResult<Value> {
        self.record(format!("PATCH /properties/{id}"));
        self.update_in(listings, "update_listing", id, payload)
    }

    async fn delete_listing(&self, id: &str) -> ConsoleResult<()> {
        self.record(format!("DELETE /properties/{id}"));
        self.delete_in(listings, "delete_listing", id)
    }

    async fn create_complex(&self, payload: &Value) -> ConsoleResult<Value> {
        self.record("POST /complexes".into());
        Ok(self.create_in(complexes, "c", payload))
    }

    async fn update_complex(&self, id: &str, payload: &Value) -> ConsoleResult<Value> {
        self.record(format!("PATCH /complexes/{id}"));
        self.update_in(complexes, "update_complex", id, payload)
    }

    async fn delete_complex(&self, id: &str) -> ConsoleResult<()> {
        self.record(format!("DELETE /complexes/{id}"));
        self.delete_in(complexes, "delete_complex", id)
    }

    async fn get_preferences(&self, account_id: &str) -> ConsoleResult<PreferencesRecord> {
        self.record(format!("GET /users/{account_id}/preferences"));
        let state = self.state.lock().unwrap();
        state
            .preferences
            .get(account_id)
            .cloned()
            .ok_or(ConsoleError::Api {
                status: 404,
                message: None,
            })
    }

    async fn create_preferences(
        &self,
        account_id: &str,
        payload: &Value,
    ) -> ConsoleResult<PreferencesRecord> {
        self.record(format!("POST /users/{account_id}/preferences"));
        let record = PreferencesRecord {
            account_id: account_id.to_string(),
            data: payload.clone(),
        };
        let mut state = self.state.lock().unwrap();
        state
            .preferences
            .insert(account_id.to_string(), record.clone());
        Ok(record)
    }

    async fn update_preferences(
        &self,
        account_id: &str,
        payload: &Value,
    ) -> ConsoleResult<PreferencesRecord> {
        self.record(format!("PUT /users/{account_id}/preferences"));
        let mut state = self.state.lock().unwrap();
        let record = state
            .preferences
            .get_mut(account_id)
            .ok_or_else(|| mutation_error("update_preferences", account_id))?;
        record.data = payload.clone();
        Ok(record.clone())
    }

    async fn delete_preferences(&self, account_id: &str) -> ConsoleResult<()> {
        self.record(format!("DELETE /users/{account_id}/preferences"));
        let mut state = self.state.lock().unwrap();
        state
            .preferences
            .remove(account_id)
            .map(|_| ())
            .ok_or_else(|| mutation_error("delete_preferences", account_id))
    }

    async fn upload_logo(&self, file: &StagedFile) -> ConsoleResult<UploadedFile> {
        self.upload_one("logo", file)
    }

    async fn upload_video(&self, file: &StagedFile) -> ConsoleResult<UploadedFile> {
        self.upload_one("video", file)
    }

    async fn upload_photos(&self, files: &[StagedFile]) -> ConsoleResult<Vec<UploadedFile>> {
        files
            .iter()
            .map(|file| self.upload_one("photos", file))
            .collect()
    }

    async fn upload_documents(&self, files: &[StagedFile]) -> ConsoleResult<Vec<UploadedFile>> {
        files
            .iter()
            .map(|file| self.upload_one("documents", file))
            .collect()
    }
}
