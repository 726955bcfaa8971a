//! Integration tests for follow, unfollow, block and unblock
//!
//! Drives the relationship manager through a real user store and checks both
//! the typed outcomes and the notifications that reach the inbox.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use gatherly_social::identity::{
    BlockOutcome, DropFollowerOutcome, FollowOutcome, RemoveFollowerOutcome, UnblockOutcome,
    UnfollowOutcome,
};
use gatherly_social::notifications::{Notification, NOTIFICATION_TOPIC};
use gatherly_social::types::{PersonName, UserId};
use gatherly_social::{App, AuthContext, Config, SocialError};
use gatherly_testing::{init_tracing, test_clock, RecordingEventBus};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

fn app() -> (App, RecordingEventBus) {
    init_tracing();
    let bus = RecordingEventBus::new();
    let app = App::with_parts(Config::default(), Arc::new(test_clock()), Arc::new(bus.clone()));
    (app, bus)
}

async fn register(app: &App, first: &str, is_admin: bool) -> UserId {
    app.accounts()
        .register(
            UserId::new(),
            PersonName::new(first, "Tester"),
            format!("{}@example.com", first.to_lowercase()),
            is_admin,
        )
        .await
        .unwrap()
        .id
}

// ============================================================================
// Follow
// ============================================================================

#[tokio::test]
async fn self_follow_is_rejected_and_changes_nothing() {
    let (app, bus) = app();
    let ada = register(&app, "Ada", false).await;
    let before = app.accounts().get_user(ada).await.unwrap();

    let outcome = app
        .relationships()
        .follow_user(&AuthContext::user(ada), ada)
        .await
        .unwrap();

    assert_eq!(outcome, FollowOutcome::SelfFollowRejected);
    assert_eq!(app.accounts().get_user(ada).await.unwrap(), before);
    app.settle().await;
    assert!(bus.events_on(NOTIFICATION_TOPIC).is_empty());
}

#[tokio::test]
async fn follow_is_recorded_on_both_sides_and_is_idempotent() {
    let (app, _bus) = app();
    let ada = register(&app, "Ada", false).await;
    let bob = register(&app, "Bob", false).await;
    let relationships = app.relationships();
    let as_ada = AuthContext::user(ada);

    let FollowOutcome::Followed(profile) = relationships.follow_user(&as_ada, bob).await.unwrap()
    else {
        panic!("first follow should succeed");
    };
    assert_eq!(profile.user.id, bob);
    assert_eq!(profile.followers.len(), 1);
    assert_eq!(profile.followers[0].first_name, "Ada");

    let ada_before = app.accounts().get_user(ada).await.unwrap();
    let bob_before = app.accounts().get_user(bob).await.unwrap();

    let again = relationships.follow_user(&as_ada, bob).await.unwrap();
    assert!(matches!(again, FollowOutcome::AlreadyFollowing(_)));
    assert_eq!(app.accounts().get_user(ada).await.unwrap(), ada_before);
    assert_eq!(app.accounts().get_user(bob).await.unwrap(), bob_before);
    assert_eq!(ada_before.followings, vec![bob]);
    assert_eq!(bob_before.followers, vec![ada]);
}

#[tokio::test]
async fn follow_notifies_the_target() {
    let (app, _bus) = app();
    let ada = register(&app, "Ada", false).await;
    let bob = register(&app, "Bob", false).await;

    app.relationships()
        .follow_user(&AuthContext::user(ada), bob)
        .await
        .unwrap();
    app.settle().await;
    let dispatched = app.notification_dispatcher().run().await.unwrap();

    assert_eq!(dispatched, 1);
    assert_eq!(app.inbox().inbox(&bob), vec![Notification::new_follower("Ada")]);
    assert!(app.inbox().inbox(&ada).is_empty());
}

#[tokio::test]
async fn follow_of_unknown_user_is_not_found() {
    let (app, _bus) = app();
    let ada = register(&app, "Ada", false).await;

    let error = app
        .relationships()
        .follow_user(&AuthContext::user(ada), UserId::new())
        .await
        .unwrap_err();

    assert!(matches!(error, SocialError::NotFound { entity: "user", .. }));
}

// ============================================================================
// Unfollow / remove follower
// ============================================================================

#[tokio::test]
async fn unfollow_removes_the_edge_on_both_sides() {
    let (app, _bus) = app();
    let ada = register(&app, "Ada", false).await;
    let bob = register(&app, "Bob", false).await;
    let relationships = app.relationships();
    let as_ada = AuthContext::user(ada);
    relationships.follow_user(&as_ada, bob).await.unwrap();

    let outcome = relationships.unfollow_user(&as_ada, bob).await.unwrap();

    let UnfollowOutcome::Unfollowed(Some(profile)) = outcome else {
        panic!("expected Unfollowed with a profile, got {outcome:?}");
    };
    assert!(profile.followers.is_empty());
    assert!(app.accounts().get_user(ada).await.unwrap().followings.is_empty());
    assert_eq!(
        relationships.unfollow_user(&as_ada, bob).await.unwrap(),
        UnfollowOutcome::NotFollowing
    );
}

#[tokio::test]
async fn unfollow_of_deleted_user_cleans_up_the_dangling_id() {
    let (app, _bus) = app();
    let ada = register(&app, "Ada", false).await;
    let bob = register(&app, "Bob", false).await;
    let as_ada = AuthContext::user(ada);
    app.relationships().follow_user(&as_ada, bob).await.unwrap();
    app.accounts().delete_account(&AuthContext::user(bob)).await.unwrap();

    let profile = app.relationships().profile(ada).await.unwrap();
    assert_eq!(profile.user.followings, vec![bob]);
    assert!(profile.followings.is_empty());

    let outcome = app.relationships().unfollow_user(&as_ada, bob).await.unwrap();
    assert_eq!(outcome, UnfollowOutcome::Unfollowed(None));
    assert!(app.accounts().get_user(ada).await.unwrap().followings.is_empty());
}

#[tokio::test]
async fn remove_follower_takes_the_actor_off_the_targets_list() {
    let (app, _bus) = app();
    let ada = register(&app, "Ada", false).await;
    let bob = register(&app, "Bob", false).await;
    let as_ada = AuthContext::user(ada);
    app.relationships().follow_user(&as_ada, bob).await.unwrap();

    let outcome = app.relationships().remove_follower(&as_ada, bob).await.unwrap();

    let RemoveFollowerOutcome::Removed(profile) = outcome else {
        panic!("expected Removed, got {outcome:?}");
    };
    assert_eq!(profile.user.id, bob);
    assert!(profile.user.followers.is_empty());
    assert!(app.accounts().get_user(bob).await.unwrap().followers.is_empty());
    assert!(app.accounts().get_user(ada).await.unwrap().followings.is_empty());
    assert_eq!(
        app.relationships().remove_follower(&as_ada, bob).await.unwrap(),
        RemoveFollowerOutcome::NotFollowing
    );
}

#[tokio::test]
async fn remove_follower_of_unknown_user_is_not_found() {
    let (app, _bus) = app();
    let ada = register(&app, "Ada", false).await;

    let error = app
        .relationships()
        .remove_follower(&AuthContext::user(ada), UserId::new())
        .await
        .unwrap_err();

    assert!(matches!(error, SocialError::NotFound { entity: "user", .. }));
}

#[tokio::test]
async fn drop_follower_removes_both_sides() {
    let (app, _bus) = app();
    let ada = register(&app, "Ada", false).await;
    let bob = register(&app, "Bob", false).await;
    app.relationships()
        .follow_user(&AuthContext::user(ada), bob)
        .await
        .unwrap();

    let as_bob = AuthContext::user(bob);
    let outcome = app.relationships().drop_follower(&as_bob, ada).await.unwrap();

    assert!(matches!(outcome, DropFollowerOutcome::Dropped(ref p) if p.followers.is_empty()));
    assert!(app.accounts().get_user(ada).await.unwrap().followings.is_empty());
    assert_eq!(
        app.relationships().drop_follower(&as_bob, ada).await.unwrap(),
        DropFollowerOutcome::NotAFollower
    );
}

// ============================================================================
// Block / unblock
// ============================================================================

#[tokio::test]
async fn admin_blocks_and_non_admin_is_forbidden() {
    let (app, _bus) = app();
    let admin = register(&app, "Root", true).await;
    let bob = register(&app, "Bob", false).await;
    let mallory = register(&app, "Mallory", false).await;
    let relationships = app.relationships();

    let blocked = relationships
        .block_user(&AuthContext::admin(admin), mallory)
        .await
        .unwrap();
    assert!(matches!(blocked, BlockOutcome::Blocked(ref p) if p.user.blocked == vec![mallory]));

    let error = relationships
        .block_user(&AuthContext::user(bob), mallory)
        .await
        .unwrap_err();
    assert!(matches!(error, SocialError::Forbidden { .. }));
    assert!(app.accounts().get_user(bob).await.unwrap().blocked.is_empty());
}

#[tokio::test]
async fn repeated_block_keeps_a_single_entry() {
    let (app, _bus) = app();
    let admin = register(&app, "Root", true).await;
    let mallory = register(&app, "Mallory", false).await;
    let as_admin = AuthContext::admin(admin);

    app.relationships().block_user(&as_admin, mallory).await.unwrap();
    let again = app.relationships().block_user(&as_admin, mallory).await.unwrap();

    assert!(matches!(again, BlockOutcome::AlreadyBlocked(_)));
    assert_eq!(app.accounts().get_user(admin).await.unwrap().blocked, vec![mallory]);
}

#[tokio::test]
async fn unblock_of_absent_id_leaves_the_list_identical() {
    let (app, _bus) = app();
    let admin = register(&app, "Root", true).await;
    let mallory = register(&app, "Mallory", false).await;
    let bob = register(&app, "Bob", false).await;
    let as_admin = AuthContext::admin(admin);
    app.relationships().block_user(&as_admin, mallory).await.unwrap();
    let before = app.accounts().get_user(admin).await.unwrap().blocked;

    let outcome = app.relationships().unblock_user(&as_admin, bob).await.unwrap();

    assert_eq!(outcome, UnblockOutcome::NotBlocked);
    assert_eq!(app.accounts().get_user(admin).await.unwrap().blocked, before);

    let outcome = app.relationships().unblock_user(&as_admin, mallory).await.unwrap();
    assert!(matches!(outcome, UnblockOutcome::Unblocked(ref p) if p.user.blocked.is_empty()));
}

#[tokio::test]
async fn admin_may_block_themselves() {
    let (app, _bus) = app();
    let admin = register(&app, "Root", true).await;

    let outcome = app
        .relationships()
        .block_user(&AuthContext::admin(admin), admin)
        .await
        .unwrap();

    assert!(matches!(outcome, BlockOutcome::Blocked(ref p) if p.user.blocked == vec![admin]));
}

#[tokio::test]
async fn unblock_requires_admin() {
    let (app, _bus) = app();
    let bob = register(&app, "Bob", false).await;
    let mallory = register(&app, "Mallory", false).await;

    let error = app
        .relationships()
        .unblock_user(&AuthContext::user(bob), mallory)
        .await
        .unwrap_err();

    assert_eq!(error, SocialError::Forbidden { action: "unblock user" });
}
