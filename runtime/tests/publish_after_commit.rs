//! Integration tests for reducers that publish to the event bus after a commit.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use futures::StreamExt;
use gatherly_core::environment::Clock;
use gatherly_core::event::{Event, SerializedEvent};
use gatherly_core::event_bus::EventBus;
use gatherly_core::{effect::Effect, reducer::Reducer, smallvec, DateTime, SmallVec, Utc};
use gatherly_runtime::{LocalEventBus, Store};
use gatherly_testing::{test_clock, FailingEventBus, FixedClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Greeted {
    name: String,
    at: DateTime<Utc>,
}

impl Event for Greeted {
    fn event_type(&self) -> &'static str {
        "Greeted.v1"
    }
}

#[derive(Clone, Debug)]
enum GreeterAction {
    Greet(String),
}

#[derive(Default)]
struct GreeterState {
    greeted: Vec<String>,
}

struct GreeterEnv {
    clock: FixedClock,
    bus: Arc<dyn EventBus>,
}

struct GreeterReducer;

impl Reducer for GreeterReducer {
    type State = GreeterState;
    type Action = GreeterAction;
    type Environment = GreeterEnv;

    fn reduce(
        &self,
        state: &mut GreeterState,
        action: GreeterAction,
        env: &GreeterEnv,
    ) -> SmallVec<[Effect; 4]> {
        let GreeterAction::Greet(name) = action;
        state.greeted.push(name.clone());

        let event = Greeted {
            name,
            at: env.clock.now(),
        };
        let bus = Arc::clone(&env.bus);
        smallvec![Effect::detached(async move {
            let Ok(serialized) = SerializedEvent::from_event(&event) else {
                return;
            };
            if let Err(error) = bus.publish("greetings", &serialized).await {
                tracing::warn!(%error, "publish failed");
            }
        })]
    }
}

fn store(bus: Arc<dyn EventBus>) -> Store<GreeterState, GreeterAction, GreeterEnv, GreeterReducer> {
    Store::new(
        GreeterState::default(),
        GreeterReducer,
        GreeterEnv {
            clock: test_clock(),
            bus,
        },
    )
}

#[tokio::test]
async fn subscriber_receives_event_published_by_effect() {
    let bus = LocalEventBus::new();
    let mut stream = bus.subscribe(&["greetings"]).await.unwrap();
    let store = store(Arc::new(bus.clone()));

    let handle = store.send(GreeterAction::Greet("ada".into())).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("event arrives")
        .expect("stream open")
        .expect("no lag");
    let decoded: Greeted = received.decode("Greeted.v1").unwrap();
    assert_eq!(decoded.name, "ada");
    assert_eq!(decoded.at, test_clock().now());
}

#[tokio::test]
async fn failed_publish_leaves_state_committed() {
    let store = store(Arc::new(FailingEventBus));

    store.send(GreeterAction::Greet("grace".into())).await.unwrap();
    store.settle().await;

    assert_eq!(store.state(|s| s.greeted.clone()).await, vec!["grace"]);
}
