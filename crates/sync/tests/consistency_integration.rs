//! End-to-end consistency scenarios over the in-memory store.

mod common;

use common::{harness, sign_in, wait_until};

use domain::models::EventDraft;

#[tokio::test]
async fn test_reservation_lifecycle_end_to_end() {
    let h = harness();

    sign_in(&h.auth, "host-1");
    let event = h
        .engine
        .create_event(EventDraft::new("Night market", "Lisbon", "host-1"))
        .await
        .unwrap();
    assert_eq!(event.attendees_count, 0);

    sign_in(&h.auth, "u-1");
    let first = h.engine.reserve(&event, 1, None).await.unwrap();
    sign_in(&h.auth, "u-2");
    h.engine.reserve(&event, 1, None).await.unwrap();

    assert_eq!(h.engine.reservations.active_count(&event.id).await, 2);
    assert!(h.engine.is_going(&event.id).await);

    h.engine.reservations.cancel(&first.id).await.unwrap();
    assert_eq!(h.engine.reservations.active_count(&event.id).await, 1);

    sign_in(&h.auth, "u-1");
    assert!(!h.engine.is_going(&event.id).await);
}

#[tokio::test]
async fn test_validator_blocks_write_before_any_store_call() {
    let h = harness();
    let err = h
        .engine
        .create_event(EventDraft::new("", "Lisbon", "host-1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        persistence::repositories::RepoError::Invalid(_)
    ));
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn test_rating_recompute_is_idempotent_end_to_end() {
    let h = harness();
    sign_in(&h.auth, "host-1");
    let event = h
        .engine
        .create_event(EventDraft::new("Wine tasting", "Porto", "host-1"))
        .await
        .unwrap();

    h.engine.reviews.add(&event.id, "u-1", 4, "good").await.unwrap();
    h.engine.reviews.add(&event.id, "u-2", 5, "great").await.unwrap();

    let first = h.engine.reviews.recalculate(&event.id).await.unwrap();
    let second = h.engine.reviews.recalculate(&event.id).await.unwrap();
    assert_eq!(first, second);

    let loaded = h.engine.events.get(&event.id).await.unwrap();
    assert_eq!(loaded.rating, 4.5);
    assert_eq!(loaded.review_count, 2);
}

#[tokio::test]
async fn test_offline_write_falls_back_to_optimistic_cache_copy() {
    let h = harness();
    h.store.set_unavailable(true);

    let err = h
        .engine
        .create_event(EventDraft::new("Pop-up bakery", "Braga", "host-1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        persistence::repositories::RepoError::Store(_)
    ));

    let cached = h.engine.cache.snapshot();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].title, "Pop-up bakery");
    assert!(cached[0].id.starts_with("local-"));
}

#[tokio::test]
async fn test_expulsion_cascades_and_bans() {
    let h = harness();
    sign_in(&h.auth, "host-1");
    let event = h
        .engine
        .create_event(EventDraft::new("Block party", "Lisbon", "host-1"))
        .await
        .unwrap();

    h.engine.users.ensure("u-1", None, None).await.unwrap();
    sign_in(&h.auth, "u-1");
    h.engine.reserve(&event, 2, None).await.unwrap();
    assert_eq!(h.engine.reservations.active_count(&event.id).await, 2);

    sign_in(&h.auth, "host-1");
    h.engine.expel_user(&event, "u-1").await.unwrap();

    assert_eq!(h.engine.reservations.active_count(&event.id).await, 0);
    let profile = h.engine.users.get("u-1").await.unwrap();
    assert!(profile.is_banned_from(&event.id));

    let transcript = h.engine.chat.transcript(&event.id).await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(
        transcript[0].message_type,
        domain::models::MessageType::System
    );

    // A banned user cannot reserve again.
    sign_in(&h.auth, "u-1");
    assert!(h.engine.reserve(&event, 1, None).await.is_err());
}

#[tokio::test]
async fn test_host_notifications_are_fire_and_forget() {
    let h = harness();
    sign_in(&h.auth, "host-1");
    let event = h
        .engine
        .create_event(EventDraft::new("First show", "Faro", "host-1"))
        .await
        .unwrap();

    let notifier = h.notifier.clone();
    wait_until(move || notifier.sent_count() >= 1).await;
    let sent = h.notifier.sent();
    assert_eq!(sent[0].0, "host-1");

    sign_in(&h.auth, "guest-1");
    h.engine.reserve(&event, 1, None).await.unwrap();
    let notifier = h.notifier.clone();
    wait_until(move || notifier.sent_count() >= 2).await;
}

#[tokio::test]
async fn test_delete_event_cleans_up_images_best_effort() {
    use domain::services::images::ImageStore;
    use fake::faker::address::en::CityName;
    use fake::Fake;

    let h = harness();
    sign_in(&h.auth, "host-1");

    h.images.upload("events/host-1/1_0_a.jpg", &[0]).await.unwrap();
    h.images.fail_on("events/host-1/1_1_b.jpg");

    let city: String = CityName().fake();
    let mut draft = EventDraft::new("Closing party", city, "host-1");
    draft.images = vec![
        "events/host-1/1_0_a.jpg".to_string(),
        "events/host-1/1_1_b.jpg".to_string(),
    ];
    let event = h.engine.create_event(draft).await.unwrap();

    let outcome = h.engine.delete_event(&event).await.unwrap();
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);
    assert!(h.engine.events.get(&event.id).await.is_none());
    assert_eq!(h.images.stored_count(), 0);
}

#[tokio::test]
async fn test_reserve_rejected_when_rsvp_disabled() {
    let h = harness();
    sign_in(&h.auth, "host-1");
    let mut draft = EventDraft::new("Invite only", "Lisbon", "host-1");
    draft.allow_rsvp = false;
    let event = h.engine.create_event(draft).await.unwrap();

    sign_in(&h.auth, "u-1");
    assert!(h.engine.reserve(&event, 1, None).await.is_err());
    assert_eq!(h.engine.reservations.active_count(&event.id).await, 0);
}
