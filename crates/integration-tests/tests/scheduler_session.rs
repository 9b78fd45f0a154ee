//! Stage sessions running against the in-memory store with paused time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{event, slot_ids};
use cs_core::{
    ApprovalState, ContentKind, EventDirectory, ModerationStore, ScriptedRandom, SubmissionDraft,
    SubmissionRecord,
};
use cs_rotation::StageScheduler;
use cs_store_memory::MemoryStore;
use serde_json::json;

fn store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.put_event(event("gala", json!({ "imgCount": 2, "imgTimer": 2 })));
    store.put_event(event("expo", json!({})));
    store
}

fn session(store: &Arc<MemoryStore>, event_id: &str) -> StageScheduler {
    StageScheduler::new(
        event_id,
        store.clone(),
        store.clone(),
        Box::new(ScriptedRandom::default()),
    )
}

async fn approved(store: &MemoryStore, event_id: &str, media_type: &str, body: &str) -> SubmissionRecord {
    let draft = SubmissionDraft {
        media_type: media_type.into(),
        image: (media_type != "text").then(|| format!("https://cdn.example/{body}.jpg")),
        text: Some(body.into()),
        sender: None,
    };
    let record = store.submit(event_id, draft).await.unwrap();
    store.set_status(event_id, &record.id, ApprovalState::Approved).await.unwrap().unwrap()
}

#[tokio::test(start_paused = true)]
async fn moderator_flow_reaches_the_stage() {
    let store = store();
    let stage = session(&store, "gala");
    stage.start().await.unwrap();
    assert_eq!(stage.snapshot().image.len(), 2);

    let photo = approved(&store, "gala", "image", "cake").await;
    let clip = approved(&store, "gala", "video", "toast").await;
    // pending submissions never show
    store
        .submit("gala", SubmissionDraft {
            media_type: "text".into(),
            image: None,
            text: Some("hold please".into()),
            sender: None,
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(4_100)).await;
    let snap = stage.snapshot();
    assert_eq!(slot_ids(&snap.image), vec![Some(photo.id.clone()), Some(clip.id.clone())]);
    assert!(snap.text.iter().all(Option::is_none));

    // retraction is visible without waiting for a tick
    let mut updates = stage.subscribe();
    updates.borrow_and_update();
    store.set_status("gala", &photo.id, ApprovalState::Pending).await.unwrap();
    updates.changed().await.unwrap();
    assert_eq!(slot_ids(&updates.borrow().image), vec![None, Some(clip.id.clone())]);

    stage.stop();
}

#[tokio::test(start_paused = true)]
async fn sessions_for_different_events_are_isolated() {
    let store = store();
    let gala = session(&store, "gala");
    let expo = session(&store, "expo");
    gala.start().await.unwrap();
    expo.start().await.unwrap();

    approved(&store, "gala", "text", "gala-only").await;
    tokio::time::sleep(Duration::from_millis(5_100)).await;

    assert_eq!(gala.snapshot().text.iter().flatten().count(), 1);
    assert_eq!(expo.snapshot().text.iter().flatten().count(), 0);
    assert_eq!(expo.snapshot().image.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn settings_written_to_the_directory_reach_the_running_stage() {
    let store = store();
    let stage = session(&store, "expo");
    stage.start().await.unwrap();

    let mut updates = stage.subscribe();
    updates.borrow_and_update();
    let raw = serde_json::from_value(json!({ "textCount": 2, "textTimer": 1 })).unwrap();
    store.update_settings("expo", raw).await.unwrap();
    updates.changed().await.unwrap();

    assert_eq!(updates.borrow().text.len(), 2);
    assert_eq!(
        stage.with_stage(|s| s.rotation(ContentKind::Text).tick_period()),
        Duration::from_secs(1)
    );
}

#[tokio::test(start_paused = true)]
async fn disabling_the_event_freezes_rotation_until_re_enabled() {
    let store = store();
    let stage = session(&store, "expo");
    stage.start().await.unwrap();

    let mut updates = stage.subscribe();
    updates.borrow_and_update();
    store.set_disabled("expo", true).unwrap();
    updates.changed().await.unwrap();

    approved(&store, "expo", "text", "waiting").await;
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(stage.snapshot().text.iter().flatten().count(), 0);

    store.set_disabled("expo", false).unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(stage.snapshot().text[0].is_some());
}

#[tokio::test]
async fn start_is_refused_for_unknown_or_disabled_events() {
    let store = store();
    assert!(session(&store, "nope").start().await.is_err());

    store.set_disabled("expo", true).unwrap();
    assert!(session(&store, "expo").start().await.is_err());
    assert!(session(&store, "").start().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn stopped_session_keeps_its_last_slots() {
    let store = store();
    let stage = session(&store, "gala");
    stage.start().await.unwrap();
    approved(&store, "gala", "image", "one").await;
    tokio::time::sleep(Duration::from_millis(2_100)).await;
    stage.stop();

    let frozen = stage.snapshot();
    approved(&store, "gala", "image", "two").await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(stage.snapshot(), frozen);
    assert_eq!(slot_ids(&frozen.image).iter().flatten().count(), 1);
}
