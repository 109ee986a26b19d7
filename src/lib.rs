//! Rentdesk: the client-side engine behind a property-rental marketplace's
//! administrative console.
//!
//! The engine coordinates five backend resource collections behind one
//! interaction model: per-section query state (search/sort/filter/paging),
//! debounced refine fetches with stale-response rejection, a modal CRUD
//! lifecycle with a best-effort media upload path, a per-tenant preferences
//! sub-resource, and a transient notification queue. Presentation and
//! routing live in the host shell; the backend lives behind
//! [`services::AdminApi`].

pub mod console;
pub mod debounce;
pub mod envelope;
pub mod fetch;
pub mod modal;
pub mod notifications;
pub mod preferences;
pub mod query;
pub mod sections;
pub mod services;
pub mod uploads;
