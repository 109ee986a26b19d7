use chrono::Utc;
use serde_json::{Value, json};

use rentdesk::console::{ConsoleContext, activate_section};
use rentdesk::modal::{
    Approve, Decline, ModalMode, confirm_delete, open_add, open_delete, open_edit, open_view,
    submit,
};
use rentdesk::notifications::NotificationKind;
use rentdesk::preferences;
use rentdesk::sections::Section;
use rentdesk::services::{InMemoryApi, StagedFile};
use rentdesk::uploads::PendingUploads;

#[tokio::test]
async fn deleting_a_listing_hits_its_endpoint_exactly_once() {
    let api = InMemoryApi::new_with_sample();
    let mut ctx = ConsoleContext::default();
    activate_section(&api, &mut ctx, Section::Listings, Utc::now()).await.unwrap();
    let refetches_before = api.count_calls("GET /properties");

    open_delete(&mut ctx, api.listing("p-42").unwrap());
    confirm_delete(&api, &mut ctx, Utc::now()).await.unwrap();

    assert_eq!(api.count_calls("DELETE /properties/p-42"), 1);
    assert_eq!(ctx.notifications.count_of(NotificationKind::Success), 1);
    assert_eq!(api.count_calls("GET /properties"), refetches_before + 1);
    assert_eq!(ctx.modal.mode, ModalMode::None);
    assert!(ctx.modal.selected.is_none());
    assert!(api.listing("p-42").is_none());
}

// Partial upload failure end to end: the good slots land on the created
// record, the bad slot is reported, and the user's consent gates the save.
#[tokio::test]
async fn partial_upload_keeps_good_slots_on_the_saved_record() {
    let api = InMemoryApi::new_with_sample();
    api.fail_uploads(&["video"]);
    let mut ctx = ConsoleContext::default();
    activate_section(&api, &mut ctx, Section::Complexes, Utc::now()).await.unwrap();

    let mut pending = PendingUploads {
        logo: Some(StagedFile::new("crest.png", "image/png", vec![1])),
        video: Some(StagedFile::new("tour.mp4", "video/mp4", vec![2])),
        photos: vec![
            StagedFile::new("front.jpg", "image/jpeg", vec![3]),
            StagedFile::new("lobby.jpg", "image/jpeg", vec![4]),
        ],
        ..PendingUploads::default()
    };

    open_add(&mut ctx);
    submit(
        &api,
        &mut ctx,
        json!({"name": "Hillside Court", "address": "9 Hill Rd"}),
        &mut pending,
        &mut Approve,
        Utc::now(),
    )
    .await
    .unwrap();

    // Failed slot stays staged for a retry; succeeded slots were consumed.
    assert!(pending.video.is_some());
    assert!(pending.logo.is_none());
    assert!(pending.photos.is_empty());

    let error = ctx.notifications.last_of(NotificationKind::Error).unwrap();
    assert!(error.message.contains("video"));

    let created = ctx
        .active_state()
        .items
        .iter()
        .find(|row| row["name"] == "Hillside Court")
        .cloned()
        .unwrap();
    assert!(created["logo"].as_str().unwrap().contains("crest.png"));
    assert_eq!(created["video"], Value::Null);
    assert_eq!(created["photos"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn role_change_is_gated_on_explicit_confirmation() {
    let api = InMemoryApi::new_with_sample();
    let mut ctx = ConsoleContext::default();
    activate_section(&api, &mut ctx, Section::Accounts, Utc::now()).await.unwrap();
    let form = json!({"name": "Maple Tenant", "email": "maple@rentdesk.test", "role": "landlord"});

    open_edit(&mut ctx, api.account("u-1").unwrap());
    submit(
        &api,
        &mut ctx,
        form.clone(),
        &mut PendingUploads::default(),
        &mut Decline,
        Utc::now(),
    )
    .await
    .unwrap();
    assert_eq!(api.account("u-1").unwrap()["role"], "tenant");
    assert_eq!(api.count_calls("PUT /users/u-1"), 0);

    submit(
        &api,
        &mut ctx,
        form,
        &mut PendingUploads::default(),
        &mut Approve,
        Utc::now(),
    )
    .await
    .unwrap();
    assert_eq!(api.account("u-1").unwrap()["role"], "landlord");
    assert_eq!(api.count_calls("PUT /users/u-1/role"), 1);
}

// Full preferences lifecycle through the view modal: lazy load on open,
// absent-then-created, updated, deleted, reloaded after each step.
#[tokio::test]
async fn tenant_preferences_lifecycle() {
    let api = InMemoryApi::new_with_sample();
    let mut ctx = ConsoleContext::default();
    activate_section(&api, &mut ctx, Section::Accounts, Utc::now()).await.unwrap();

    open_view(&api, &mut ctx, api.account("u-1").unwrap(), Utc::now()).await.unwrap();
    assert!(ctx.prefs.loaded);
    assert!(!ctx.prefs.exists());

    preferences::save(&api, &mut ctx, &json!({"max_price": 1500, "pets": true}), Utc::now())
        .await
        .unwrap();
    assert!(ctx.prefs.exists());
    assert_eq!(api.count_calls("POST /users/u-1/preferences"), 1);

    preferences::save(&api, &mut ctx, &json!({"max_price": 1200, "pets": true}), Utc::now())
        .await
        .unwrap();
    assert_eq!(api.count_calls("PUT /users/u-1/preferences"), 1);
    assert_eq!(ctx.prefs.record.as_ref().unwrap().data["max_price"], 1200);

    preferences::delete(&api, &mut ctx, &mut Approve, Utc::now()).await.unwrap();
    assert!(!ctx.prefs.exists());
    assert!(ctx.prefs.loaded);
    assert_eq!(ctx.notifications.count_of(NotificationKind::Success), 3);
}
