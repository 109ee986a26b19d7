use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::console::ConsoleContext;
use crate::fetch::{self, FetchMode};
use crate::notifications::NotificationKind;
use crate::preferences;
use crate::sections::{ROLE_TENANT, Section};
use crate::services::{AdminApi, ConsoleError, ConsoleResult, record_id};
use crate::uploads::{PendingUploads, apply_media, upload_all};

/// Synchronous yes/no decision surfaced to the user. Partial upload failures
/// and role changes are never resolved by guessing.
pub trait Prompt {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Confirms everything; the default for hosts without a dialog layer.
pub struct Approve;

impl Prompt for Approve {
    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

/// Declines everything.
pub struct Decline;

impl Prompt for Decline {
    fn confirm(&mut self, _message: &str) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ModalMode {
    #[default]
    None,
    View,
    Edit,
    Add,
    Delete,
}

/// The CRUD modal: its mode plus the single selected record. `Add` is the
/// only non-`None` mode without a selection.
#[derive(Clone, Debug, Default)]
pub struct ModalState {
    pub mode: ModalMode,
    pub selected: Option<Value>,
}

impl ModalState {
    pub fn selected_id(&self) -> Option<String> {
        self.selected
            .as_ref()
            .map(record_id)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// Opens the view modal. For tenant accounts this also lazily loads the
/// preferences sub-resource shown as a tab in the same modal.
pub async fn open_view<S: AdminApi>(
    api: &S,
    ctx: &mut ConsoleContext,
    item: Value,
    now: DateTime<Utc>,
) -> ConsoleResult<()> {
    let role = item.get("role").and_then(Value::as_str).unwrap_or("");
    let is_tenant = ctx.active == Section::Accounts && role == ROLE_TENANT;
    let id = record_id(&item).to_string();
    ctx.modal.mode = ModalMode::View;
    ctx.modal.selected = Some(item);
    if is_tenant {
        preferences::load(api, ctx, &id, now).await?;
    }
    Ok(())
}

pub fn open_edit(ctx: &mut ConsoleContext, item: Value) {
    ctx.modal.mode = ModalMode::Edit;
    ctx.modal.selected = Some(item);
}

pub fn open_add(ctx: &mut ConsoleContext) {
    ctx.modal.mode = ModalMode::Add;
    ctx.modal.selected = None;
}

pub fn open_delete(ctx: &mut ConsoleContext, item: Value) {
    ctx.modal.mode = ModalMode::Delete;
    ctx.modal.selected = Some(item);
}

pub fn close_modal(ctx: &mut ConsoleContext) {
    ctx.modal.mode = ModalMode::None;
    ctx.modal.selected = None;
    ctx.media_modal_open = false;
    ctx.prefs.reset();
    ctx.context.remove("form_error");
}

/// The media-management modal opens and closes independently of the CRUD
/// modal's mode.
pub fn open_media_modal(ctx: &mut ConsoleContext) {
    ctx.media_modal_open = true;
}

pub fn close_media_modal(ctx: &mut ConsoleContext) {
    ctx.media_modal_open = false;
}

pub fn validate_form(section: Section, form: &Value) -> ConsoleResult<()> {
    for field in section.required_fields() {
        let filled = form
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|value| !value.trim().is_empty());
        if !filled {
            return Err(ConsoleError::Validation(format!("{field} is required")));
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    Saved,
    /// The user declined a confirmation; nothing was sent to the backend.
    Cancelled,
}

fn role_change_warning(from: &str, to: &str) -> String {
    format!(
        "Changing the role from \"{from}\" to \"{to}\" will remove the {from} profile, \
         create a {to} profile, and adjust tenant preferences accordingly. Continue?"
    )
}

async fn create_record<S: AdminApi>(
    api: &S,
    target: Section,
    form: &Value,
) -> ConsoleResult<Value> {
    match target {
        Section::Accounts => api.create_account(form).await,
        Section::Listings => api.create_listing(form).await,
        Section::Complexes => api.create_complex(form).await,
        // mutation_target never yields these
        Section::Operators | Section::LinkedListings => {
            Err(ConsoleError::Internal("unexpected mutation target".into()))
        }
    }
}

async fn update_record<S: AdminApi>(
    api: &S,
    target: Section,
    id: &str,
    form: &Value,
) -> ConsoleResult<Value> {
    match target {
        Section::Accounts => api.update_account(id, form).await,
        Section::Listings => api.update_listing(id, form).await,
        Section::Complexes => api.update_complex(id, form).await,
        Section::Operators | Section::LinkedListings => {
            Err(ConsoleError::Internal("unexpected mutation target".into()))
        }
    }
}

async fn delete_record<S: AdminApi>(api: &S, target: Section, id: &str) -> ConsoleResult<()> {
    match target {
        Section::Accounts => api.delete_account(id).await,
        Section::Listings => api.delete_listing(id).await,
        Section::Complexes => api.delete_complex(id).await,
        Section::Operators | Section::LinkedListings => {
            Err(ConsoleError::Internal("unexpected mutation target".into()))
        }
    }
}

fn report_failure(ctx: &mut ConsoleContext, error: &ConsoleError, now: DateTime<Utc>) {
    if error.is_unauthorized() {
        ctx.context.set("session_expired", true);
    } else {
        ctx.notifications
            .push(NotificationKind::Error, &error.user_message(), now);
    }
}

/// Submit for both `Add` and `Edit`.
///
/// Order matters: validation first, then the upload fan-in (with the
/// partial-failure decision), then the role-change confirmation, and only
/// then the parent mutation; the mutation is never raced against uploads.
/// Validation and API failures leave the modal open for a retry.
pub async fn submit<S: AdminApi, P: Prompt>(
    api: &S,
    ctx: &mut ConsoleContext,
    mut form: Value,
    pending: &mut PendingUploads,
    prompt: &mut P,
    now: DateTime<Utc>,
) -> ConsoleResult<SubmitOutcome> {
    let mode = ctx.modal.mode;
    if !matches!(mode, ModalMode::Add | ModalMode::Edit) {
        return Err(ConsoleError::Internal("submit without an open form".into()));
    }
    let target = ctx.active.mutation_target();

    if let Err(error) = validate_form(ctx.active, &form) {
        ctx.context.set("form_error", error.user_message());
        return Err(error);
    }

    if pending.has_staged() || pending.remove_logo || pending.remove_video || pending.remove_documents
    {
        let report = upload_all(api, pending).await;
        if report.has_errors() {
            let summary = format!("Some uploads failed: {}", report.errors().join("; "));
            ctx.notifications.push(NotificationKind::Error, &summary, now);
            if !prompt.confirm(&format!(
                "{summary}. Continue saving with the files that did upload?"
            )) {
                return Ok(SubmitOutcome::Cancelled);
            }
        }
        let previous = ctx.modal.selected.clone();
        apply_media(&mut form, &report, previous.as_ref(), pending);
    }

    let mut role_change = None;
    if target == Section::Accounts && mode == ModalMode::Edit {
        let old_role = ctx
            .modal
            .selected
            .as_ref()
            .and_then(|selected| selected.get("role"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let new_role = form.get("role").and_then(Value::as_str).unwrap_or(old_role);
        if !old_role.is_empty() && new_role != old_role {
            if !prompt.confirm(&role_change_warning(old_role, new_role)) {
                return Ok(SubmitOutcome::Cancelled);
            }
            role_change = Some(new_role.to_string());
            if let Some(object) = form.as_object_mut() {
                // The role travels through its dedicated endpoint, not the
                // generic update.
                object.remove("role");
            }
        }
    }

    let result = match mode {
        ModalMode::Add => create_record(api, target, &form).await,
        _ => match ctx.modal.selected_id() {
            Some(id) => {
                let updated = update_record(api, target, &id, &form).await;
                match (updated, &role_change) {
                    (Ok(_), Some(role)) => api.change_account_role(&id, role).await,
                    (other, _) => other,
                }
            }
            None => Err(ConsoleError::Validation("no record selected".into())),
        },
    };

    match result {
        Ok(_) => {
            let message = match mode {
                ModalMode::Add => "Record created",
                _ => "Changes saved",
            };
            ctx.notifications.push(NotificationKind::Success, message, now);
            close_modal(ctx);
            // Silent refresh; a failure here keeps the last good page and
            // must not mask the successful save.
            let _ = fetch::fetch_section(api, ctx, FetchMode::Refine, now).await;
            Ok(SubmitOutcome::Saved)
        }
        Err(error) => {
            report_failure(ctx, &error, now);
            Err(error)
        }
    }
}

/// Delete confirmation handler. Operator rows are deleted through the
/// accounts endpoint since operators are accounts with a role.
pub async fn confirm_delete<S: AdminApi>(
    api: &S,
    ctx: &mut ConsoleContext,
    now: DateTime<Utc>,
) -> ConsoleResult<()> {
    if ctx.modal.mode != ModalMode::Delete {
        return Err(ConsoleError::Internal(
            "delete confirmation without a delete modal".into(),
        ));
    }
    let Some(id) = ctx.modal.selected_id() else {
        return Err(ConsoleError::Validation("no record selected".into()));
    };
    match delete_record(api, ctx.active.mutation_target(), &id).await {
        Ok(()) => {
            ctx.notifications
                .push(NotificationKind::Success, "Record deleted", now);
            close_modal(ctx);
            let _ = fetch::fetch_section(api, ctx, FetchMode::Refine, now).await;
            Ok(())
        }
        Err(error) => {
            report_failure(ctx, &error, now);
            Err(error)
        }
    }
}
