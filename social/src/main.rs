//! Gatherly demo
//!
//! Wires every store in process, starts the notification dispatcher and walks
//! through a short scenario: two users, a follow, an event and its RSVPs, a
//! post with votes.
//!
//! ```bash
//! RUST_LOG=gatherly=debug cargo run --bin gatherly
//! ```

use anyhow::Context;
use chrono::{Duration, Utc};
use gatherly_social::events::RsvpOutcome;
use gatherly_social::identity::FollowOutcome;
use gatherly_social::types::{EventId, NewEvent, Page, PersonName, PostId, RsvpChoice, UserId, VoteDirection};
use gatherly_social::{App, AuthContext, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = App::new(config);
    let dispatcher = app
        .notification_dispatcher()
        .start()
        .await
        .context("starting notification dispatcher")?;

    let accounts = app.accounts();
    let ada = accounts
        .register(UserId::new(), PersonName::new("Ada", "Lovelace"), "ada@example.com", false)
        .await?;
    let root = accounts
        .register(UserId::new(), PersonName::new("Root", "Admin"), "root@example.com", true)
        .await?;
    accounts.activate_account(ada.id).await?;
    tracing::info!(ada = %ada.id, root = %root.id, "Users registered");

    let as_ada = AuthContext::user(ada.id);
    let as_root = AuthContext::admin(root.id);

    match app.relationships().follow_user(&as_ada, root.id).await? {
        FollowOutcome::Followed(profile) => {
            tracing::info!(followers = profile.followers.len(), "Ada follows Root");
        },
        other => tracing::info!(?other, "Follow was a no-op"),
    }

    let event = app
        .events()
        .create_event(
            &as_root,
            EventId::new(),
            NewEvent {
                name: "Launch party".to_string(),
                description: Some("Drinks on the roof".to_string()),
                location: Some("HQ".to_string()),
                date: Utc::now() + Duration::days(7),
            },
        )
        .await?;

    let rsvp = app.rsvp();
    for choice in [RsvpChoice::Yes, RsvpChoice::No] {
        match rsvp.respond(&as_ada, event.id, choice).await? {
            RsvpOutcome::Responded(recorded) => tracing::info!(%recorded, "RSVP recorded"),
            outcome => tracing::info!(?outcome, "RSVP not recorded"),
        }
    }
    let upcoming = app.events().upcoming_events(Page::default()).await;
    tracing::info!(upcoming = upcoming.total, "Upcoming events");

    let post = app
        .posts()
        .create_post(&as_ada, PostId::new(), "Who else is coming?")
        .await?;
    let outcome = app.posts().vote(&as_root, post.id, VoteDirection::Up).await?;
    tracing::info!(?outcome, "Vote cast");

    app.shutdown().await.context("shutting down stores")?;
    dispatcher.abort();
    Ok(())
}
