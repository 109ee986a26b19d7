use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::console::ConsoleContext;
use crate::modal::Prompt;
use crate::notifications::NotificationKind;
use crate::services::{AdminApi, ConsoleResult, PreferencesRecord};

/// Tab state inside the account view modal, independent of the parent
/// modal's own mode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PrefsMode {
    #[default]
    None,
    View,
    Edit,
}

#[derive(Clone, Debug, Default)]
pub struct PreferencesState {
    pub mode: PrefsMode,
    pub account_id: Option<String>,
    pub record: Option<PreferencesRecord>,
    /// True once a load answered, even with "no preferences yet".
    pub loaded: bool,
    pub error: Option<String>,
}

impl PreferencesState {
    pub fn reset(&mut self) {
        *self = PreferencesState::default();
    }

    pub fn exists(&self) -> bool {
        self.record.is_some()
    }
}

/// Fetches the 1:1 preferences record for a tenant account. A 404 means the
/// record simply does not exist yet and is not an error; anything else is.
pub async fn load<S: AdminApi>(
    api: &S,
    ctx: &mut ConsoleContext,
    account_id: &str,
    now: DateTime<Utc>,
) -> ConsoleResult<()> {
    ctx.prefs.account_id = Some(account_id.to_string());
    match api.get_preferences(account_id).await {
        Ok(record) => {
            ctx.prefs.record = Some(record);
            ctx.prefs.loaded = true;
            ctx.prefs.error = None;
            ctx.prefs.mode = PrefsMode::View;
            Ok(())
        }
        Err(error) if error.is_not_found() => {
            ctx.prefs.record = None;
            ctx.prefs.loaded = true;
            ctx.prefs.error = None;
            ctx.prefs.mode = PrefsMode::View;
            Ok(())
        }
        Err(error) => {
            ctx.prefs.loaded = false;
            ctx.prefs.error = Some(error.user_message());
            ctx.notifications
                .push(NotificationKind::Error, &error.user_message(), now);
            Err(error)
        }
    }
}

/// Creates or updates the record depending on whether one exists, then
/// reloads the authoritative copy rather than merging locally.
pub async fn save<S: AdminApi>(
    api: &S,
    ctx: &mut ConsoleContext,
    payload: &Value,
    now: DateTime<Utc>,
) -> ConsoleResult<()> {
    let Some(account_id) = ctx.prefs.account_id.clone() else {
        return Ok(());
    };
    let result = if ctx.prefs.exists() {
        api.update_preferences(&account_id, payload).await
    } else {
        api.create_preferences(&account_id, payload).await
    };
    match result {
        Ok(_) => {
            ctx.notifications
                .push(NotificationKind::Success, "Preferences saved", now);
            ctx.prefs.mode = PrefsMode::View;
            load(api, ctx, &account_id, now).await
        }
        Err(error) => {
            ctx.notifications
                .push(NotificationKind::Error, &error.user_message(), now);
            Err(error)
        }
    }
}

/// Deletes the record after an explicit confirmation.
pub async fn delete<S: AdminApi, P: Prompt>(
    api: &S,
    ctx: &mut ConsoleContext,
    prompt: &mut P,
    now: DateTime<Utc>,
) -> ConsoleResult<()> {
    let Some(account_id) = ctx.prefs.account_id.clone() else {
        return Ok(());
    };
    if !ctx.prefs.exists() {
        return Ok(());
    }
    if !prompt.confirm("Delete this tenant's preferences? This cannot be undone.") {
        return Ok(());
    }
    match api.delete_preferences(&account_id).await {
        Ok(()) => {
            ctx.notifications
                .push(NotificationKind::Success, "Preferences deleted", now);
            load(api, ctx, &account_id, now).await
        }
        Err(error) => {
            ctx.notifications
                .push(NotificationKind::Error, &error.user_message(), now);
            Err(error)
        }
    }
}
