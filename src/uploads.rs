use serde_json::{Value, json};

use crate::services::{AdminApi, ConsoleResult, StagedFile, UploadedFile};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MediaSlot {
    Logo,
    Video,
    Photos,
    Documents,
}

impl MediaSlot {
    pub fn label(self) -> &'static str {
        match self {
            MediaSlot::Logo => "logo",
            MediaSlot::Video => "video",
            MediaSlot::Photos => "photos",
            MediaSlot::Documents => "documents",
        }
    }
}

/// Files staged in the form before submission, one slot per media kind.
/// Successful slots are cleared after upload; failed slots stay staged so
/// the user can retry. The `remove_*` flags mark media the user cleared in
/// the form without replacing.
#[derive(Clone, Debug, Default)]
pub struct PendingUploads {
    pub logo: Option<StagedFile>,
    pub video: Option<StagedFile>,
    pub photos: Vec<StagedFile>,
    pub documents: Vec<StagedFile>,
    pub remove_logo: bool,
    pub remove_video: bool,
    pub remove_documents: bool,
}

impl PendingUploads {
    pub fn has_staged(&self) -> bool {
        self.logo.is_some()
            || self.video.is_some()
            || !self.photos.is_empty()
            || !self.documents.is_empty()
    }
}

/// Outcome of one slot's upload: either the resolved URLs or the error,
/// never both.
#[derive(Clone, Debug)]
pub struct SlotOutcome {
    pub slot: MediaSlot,
    pub urls: Vec<String>,
    pub error: Option<String>,
}

impl SlotOutcome {
    fn succeeded(slot: MediaSlot, urls: Vec<String>) -> Self {
        Self {
            slot,
            urls,
            error: None,
        }
    }

    fn failed(slot: MediaSlot, message: String) -> Self {
        Self {
            slot,
            urls: Vec::new(),
            error: Some(message),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct UploadReport {
    pub outcomes: Vec<SlotOutcome>,
}

impl UploadReport {
    pub fn has_errors(&self) -> bool {
        self.outcomes.iter().any(|outcome| outcome.error.is_some())
    }

    pub fn errors(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|outcome| {
                outcome
                    .error
                    .as_ref()
                    .map(|err| format!("{}: {err}", outcome.slot.label()))
            })
            .collect()
    }

    pub fn urls(&self, slot: MediaSlot) -> &[String] {
        self.outcomes
            .iter()
            .find(|outcome| outcome.slot == slot && outcome.error.is_none())
            .map(|outcome| outcome.urls.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_url(&self, slot: MediaSlot) -> Option<&str> {
        self.urls(slot).first().map(String::as_str)
    }
}

fn single_outcome(
    slot: MediaSlot,
    result: Option<ConsoleResult<UploadedFile>>,
) -> Option<SlotOutcome> {
    result.map(|result| match result {
        Ok(file) => SlotOutcome::succeeded(slot, vec![file.url]),
        Err(error) => SlotOutcome::failed(slot, error.user_message()),
    })
}

fn batch_outcome(
    slot: MediaSlot,
    result: Option<ConsoleResult<Vec<UploadedFile>>>,
) -> Option<SlotOutcome> {
    result.map(|result| match result {
        Ok(files) => {
            SlotOutcome::succeeded(slot, files.into_iter().map(|file| file.url).collect())
        }
        Err(error) => SlotOutcome::failed(slot, error.user_message()),
    })
}

/// Uploads every staged slot concurrently and joins on all of them. One
/// slot's failure never aborts its siblings; the report carries each slot's
/// outcome independently so the caller can decide whether a partial result
/// is worth committing.
pub async fn upload_all<S: AdminApi>(api: &S, pending: &mut PendingUploads) -> UploadReport {
    let (logo, video, photos, documents) = futures::join!(
        async {
            match &pending.logo {
                Some(file) => Some(api.upload_logo(file).await),
                None => None,
            }
        },
        async {
            match &pending.video {
                Some(file) => Some(api.upload_video(file).await),
                None => None,
            }
        },
        async {
            if pending.photos.is_empty() {
                None
            } else {
                Some(api.upload_photos(&pending.photos).await)
            }
        },
        async {
            if pending.documents.is_empty() {
                None
            } else {
                Some(api.upload_documents(&pending.documents).await)
            }
        },
    );

    let mut report = UploadReport::default();
    for outcome in [
        single_outcome(MediaSlot::Logo, logo),
        single_outcome(MediaSlot::Video, video),
        batch_outcome(MediaSlot::Photos, photos),
        batch_outcome(MediaSlot::Documents, documents),
    ]
    .into_iter()
    .flatten()
    {
        if outcome.error.is_none() {
            match outcome.slot {
                MediaSlot::Logo => pending.logo = None,
                MediaSlot::Video => pending.video = None,
                MediaSlot::Photos => pending.photos.clear(),
                MediaSlot::Documents => pending.documents.clear(),
            }
        }
        report.outcomes.push(outcome);
    }
    report
}

/// New upload wins; otherwise an explicit removal clears the field (JSON
/// null on the wire); otherwise the previously persisted value stands.
fn resolve_single(uploaded: Option<&str>, previous: Option<&Value>, removed: bool) -> Value {
    match uploaded {
        Some(url) => json!(url),
        None if removed => Value::Null,
        None => previous.cloned().unwrap_or(Value::Null),
    }
}

fn previous_list(previous: Option<&Value>, field: &str) -> Vec<Value> {
    previous
        .and_then(|record| record.get(field))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Folds resolved media URLs into the mutation payload. Photos append to the
/// persisted list; the other slots replace it.
pub fn apply_media(
    form: &mut Value,
    report: &UploadReport,
    previous: Option<&Value>,
    pending: &PendingUploads,
) {
    form["logo"] = resolve_single(
        report.first_url(MediaSlot::Logo),
        previous.and_then(|record| record.get("logo")),
        pending.remove_logo,
    );
    form["video"] = resolve_single(
        report.first_url(MediaSlot::Video),
        previous.and_then(|record| record.get("video")),
        pending.remove_video,
    );

    let mut photos = previous_list(previous, "photos");
    photos.extend(report.urls(MediaSlot::Photos).iter().map(|url| json!(url)));
    form["photos"] = Value::Array(photos);

    let new_documents = report.urls(MediaSlot::Documents);
    form["documents"] = if !new_documents.is_empty() {
        json!(new_documents)
    } else if pending.remove_documents {
        Value::Null
    } else {
        previous
            .and_then(|record| record.get("documents"))
            .cloned()
            .unwrap_or(Value::Null)
    };
}
