//! Integration tests for accounts and the event catalogue

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::Duration;
use gatherly_social::notifications::{Notification, NotificationTag};
use gatherly_social::types::{
    Event, EventId, EventUpdate, NewEvent, Page, Paged, PersonName, ProfileUpdate, UserId,
};
use gatherly_social::{App, AuthContext, Config, SocialError};
use gatherly_testing::{test_clock, test_epoch, ManualClock, RecordingEventBus};
use std::sync::Arc;

fn app() -> App {
    App::with_parts(
        Config::default(),
        Arc::new(test_clock()),
        Arc::new(RecordingEventBus::new()),
    )
}

fn details(name: &str, days_from_now: i64) -> NewEvent {
    NewEvent {
        name: name.to_string(),
        description: Some("bring snacks".to_string()),
        location: None,
        date: test_epoch() + Duration::days(days_from_now),
    }
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn registration_rejects_duplicate_email_case_insensitively() {
    let app = app();
    let accounts = app.accounts();
    accounts
        .register(UserId::new(), PersonName::new("Ada", "Lovelace"), "ada@example.com", false)
        .await
        .unwrap();

    let error = accounts
        .register(UserId::new(), PersonName::new("Ada", "Byron"), "ADA@example.com", false)
        .await
        .unwrap_err();

    assert!(matches!(error, SocialError::InvalidInput(_)));
}

#[tokio::test]
async fn profile_update_changes_only_given_fields() {
    let app = app();
    let accounts = app.accounts();
    let ada = accounts
        .register(UserId::new(), PersonName::new("Ada", "Lovelace"), "ada@example.com", false)
        .await
        .unwrap();
    let ctx = AuthContext::user(ada.id);

    let updated = accounts
        .update_profile(
            &ctx,
            ProfileUpdate {
                company: Some("Analytical Engines".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.company.as_deref(), Some("Analytical Engines"));
    assert_eq!(updated.email, "ada@example.com");
    assert!(!updated.is_admin);

    let error = accounts
        .update_profile(&ctx, ProfileUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(error, SocialError::InvalidInput(_)));
}

#[tokio::test]
async fn activation_notifies_once() {
    let app = app();
    let accounts = app.accounts();
    let ada = accounts
        .register(UserId::new(), PersonName::new("Ada", "Lovelace"), "ada@example.com", false)
        .await
        .unwrap();

    assert!(accounts.activate_account(ada.id).await.unwrap().is_activated);
    assert!(accounts.activate_account(ada.id).await.unwrap().is_activated);
    app.settle().await;
    app.notification_dispatcher().run().await.unwrap();

    let inbox = app.inbox().inbox(&ada.id);
    assert_eq!(inbox, vec![Notification::account_activated()]);
    assert_eq!(inbox[0].tag, NotificationTag::Activate);
}

#[tokio::test]
async fn deleted_account_is_returned_and_gone() {
    let app = app();
    let accounts = app.accounts();
    let ada = accounts
        .register(UserId::new(), PersonName::new("Ada", "Lovelace"), "ada@example.com", false)
        .await
        .unwrap();
    let ctx = AuthContext::user(ada.id);

    let removed = accounts.delete_account(&ctx).await.unwrap();
    assert_eq!(removed.id, ada.id);
    assert!(matches!(
        accounts.get_user(ada.id).await,
        Err(SocialError::NotFound { entity: "user", .. })
    ));
    assert!(matches!(
        accounts.delete_account(&ctx).await,
        Err(SocialError::NotFound { .. })
    ));
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn create_announces_to_everyone() {
    let app = app();
    let owner = AuthContext::user(UserId::new());

    let event = app
        .events()
        .create_event(&owner, EventId::new(), details("  Picnic ", 2))
        .await
        .unwrap();
    assert_eq!(event.name, "Picnic");
    assert_eq!(event.created_by, owner.user_id);

    app.settle().await;
    app.notification_dispatcher().run().await.unwrap();
    assert_eq!(app.inbox().broadcasts(), vec![Notification::new_event("Picnic")]);
}

#[tokio::test]
async fn blank_name_is_invalid() {
    let app = app();
    let error = app
        .events()
        .create_event(&AuthContext::user(UserId::new()), EventId::new(), details("   ", 1))
        .await
        .unwrap_err();

    assert!(matches!(error, SocialError::InvalidInput(_)));
    assert_eq!(app.events().list_events(Page::default()).await.total, 0);
}

#[tokio::test]
async fn only_the_owner_updates() {
    let app = app();
    let owner = AuthContext::user(UserId::new());
    let admin = AuthContext::admin(UserId::new());
    let event = app
        .events()
        .create_event(&owner, EventId::new(), details("Picnic", 2))
        .await
        .unwrap();
    let rename = EventUpdate {
        name: Some("Barbecue".to_string()),
        ..EventUpdate::default()
    };

    let error = app
        .events()
        .update_event(&admin, event.id, rename.clone())
        .await
        .unwrap_err();
    assert!(matches!(error, SocialError::Forbidden { .. }));

    let updated = app.events().update_event(&owner, event.id, rename).await.unwrap();
    assert_eq!(updated.name, "Barbecue");
    assert_eq!(updated.description, event.description);
}

#[tokio::test]
async fn owner_or_admin_deletes() {
    let app = app();
    let owner = AuthContext::user(UserId::new());
    let stranger = AuthContext::user(UserId::new());
    let admin = AuthContext::admin(UserId::new());
    let events = app.events();
    let first = events
        .create_event(&owner, EventId::new(), details("First", 1))
        .await
        .unwrap();
    let second = events
        .create_event(&owner, EventId::new(), details("Second", 2))
        .await
        .unwrap();

    assert!(matches!(
        events.delete_event(&stranger, first.id).await,
        Err(SocialError::Forbidden { .. })
    ));
    assert_eq!(events.delete_event(&owner, first.id).await.unwrap().id, first.id);
    assert_eq!(events.delete_event(&admin, second.id).await.unwrap().name, "Second");
    assert!(matches!(
        events.get_event(first.id).await,
        Err(SocialError::NotFound { entity: "event", .. })
    ));

    app.settle().await;
    app.notification_dispatcher().run().await.unwrap();
    let broadcasts = app.inbox().broadcasts();
    assert!(broadcasts.contains(&Notification::event_deleted("First")));
    assert!(broadcasts.contains(&Notification::event_deleted("Second")));
}

#[tokio::test]
async fn listings_page_and_filter() {
    let app = app();
    let ada = AuthContext::user(UserId::new());
    let bob = AuthContext::user(UserId::new());
    let events = app.events();
    for (ctx, name, days) in [
        (&ada, "Past", -3),
        (&bob, "Tomorrow", 1),
        (&ada, "Next week", 7),
    ] {
        events
            .create_event(ctx, EventId::new(), details(name, days))
            .await
            .unwrap();
    }

    let names = |page: Paged<Event>| {
        page.items.into_iter().map(|e| e.name).collect::<Vec<_>>()
    };

    assert_eq!(
        names(events.list_events(Page::default()).await),
        vec!["Next week", "Tomorrow", "Past"]
    );
    assert_eq!(
        names(events.upcoming_events(Page::default()).await),
        vec!["Next week", "Tomorrow"]
    );
    assert_eq!(
        names(events.events_by_user(ada.user_id, Page::new(2, 1)).await),
        vec!["Past"]
    );
}

#[tokio::test]
async fn upcoming_follows_the_clock() {
    let clock = ManualClock::new(test_epoch());
    let app = App::with_parts(
        Config::default(),
        Arc::new(clock.clone()),
        Arc::new(RecordingEventBus::new()),
    );
    let owner = AuthContext::user(UserId::new());
    for (name, days) in [("Soon", 1), ("Later", 5)] {
        app.events()
            .create_event(&owner, EventId::new(), details(name, days))
            .await
            .unwrap();
    }
    assert_eq!(app.events().upcoming_events(Page::default()).await.total, 2);

    clock.advance(Duration::days(2));
    let upcoming = app.events().upcoming_events(Page::default()).await;
    assert_eq!(upcoming.total, 1);
    assert_eq!(upcoming.items[0].name, "Later");

    clock.advance(Duration::days(3));
    assert_eq!(app.events().upcoming_events(Page::default()).await.total, 0);
}
