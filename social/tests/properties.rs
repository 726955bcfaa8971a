//! Property tests for the relationship and RSVP invariants
//!
//! Arbitrary operation sequences are fed straight into the reducers; after
//! every step the invariants must still hold.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use gatherly_core::reducer::Reducer;
use gatherly_social::events::{EventAction, EventReducer, EventState, RsvpOutcome, RsvpPolicy};
use gatherly_social::identity::{UserAction, UserReducer, UserState};
use gatherly_social::types::{EventId, NewEvent, PersonName, RsvpChoice, UserId};
use gatherly_social::SocialEnvironment;
use gatherly_testing::{test_clock, test_epoch, RecordingEventBus};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

const USERS: usize = 4;

fn env() -> SocialEnvironment {
    SocialEnvironment::new(Arc::new(test_clock()), Arc::new(RecordingEventBus::new()))
}

fn arb_choice() -> impl Strategy<Value = RsvpChoice> {
    prop::sample::select(RsvpChoice::ALL.to_vec())
}

#[derive(Clone, Copy, Debug)]
enum Edge {
    Follow(usize, usize),
    Unfollow(usize, usize),
    RemoveFollower(usize, usize),
    DropFollower(usize, usize),
    Block(usize, usize),
    Unblock(usize, usize),
}

fn arb_edge() -> impl Strategy<Value = Edge> {
    (0..6_u8, 0..USERS, 0..USERS).prop_map(|(kind, a, b)| match kind {
        0 => Edge::Follow(a, b),
        1 => Edge::Unfollow(a, b),
        2 => Edge::RemoveFollower(a, b),
        3 => Edge::DropFollower(a, b),
        4 => Edge::Block(a, b),
        _ => Edge::Unblock(a, b),
    })
}

fn registered_users(reducer: &UserReducer, env: &SocialEnvironment) -> (UserState, Vec<UserId>) {
    let mut state = UserState::new();
    let ids: Vec<UserId> = (0..USERS).map(|_| UserId::new()).collect();
    for (n, id) in ids.iter().enumerate() {
        let _ = reducer.reduce(
            &mut state,
            UserAction::Register {
                id: *id,
                name: PersonName::new(format!("User{n}"), "Tester"),
                email: format!("user{n}@example.com"),
                is_admin: n == 0,
            },
            env,
        );
    }
    (state, ids)
}

fn assert_relationship_invariants(state: &UserState) -> Result<(), TestCaseError> {
    for user in state.users.values() {
        let unique: HashSet<_> = user.followings.iter().collect();
        prop_assert_eq!(unique.len(), user.followings.len());
        let unique: HashSet<_> = user.followers.iter().collect();
        prop_assert_eq!(unique.len(), user.followers.len());
        let unique: HashSet<_> = user.blocked.iter().collect();
        prop_assert_eq!(unique.len(), user.blocked.len());
        if !user.is_admin {
            prop_assert!(user.blocked.is_empty());
        }
        prop_assert!(!user.follows(&user.id));

        for target in &user.followings {
            let target = state.get(target).unwrap();
            prop_assert!(target.is_followed_by(&user.id));
        }
        for follower in &user.followers {
            let follower = state.get(follower).unwrap();
            prop_assert!(follower.follows(&user.id));
        }
    }
    Ok(())
}

proptest! {
    /// Follow edges stay duplicate-free, never self-referential and always
    /// present on both endpoints; blocked lists never hold a duplicate and
    /// only ever grow for the administrator.
    #[test]
    fn relationship_lists_stay_consistent(edges in proptest::collection::vec(arb_edge(), 1..40)) {
        let reducer = UserReducer::new();
        let env = env();
        let (mut state, ids) = registered_users(&reducer, &env);

        for edge in edges {
            let action = match edge {
                Edge::Follow(a, b) => UserAction::Follow { actor: ids[a], target: ids[b] },
                Edge::Unfollow(a, b) => UserAction::Unfollow { actor: ids[a], target: ids[b] },
                Edge::RemoveFollower(a, b) => {
                    UserAction::RemoveFollower { actor: ids[a], target: ids[b] }
                },
                Edge::DropFollower(a, b) => {
                    UserAction::DropFollower { actor: ids[a], follower: ids[b] }
                },
                Edge::Block(a, b) => {
                    UserAction::Block { actor: ids[a], actor_is_admin: a == 0, target: ids[b] }
                },
                Edge::Unblock(a, b) => {
                    UserAction::Unblock { actor: ids[a], actor_is_admin: a == 0, target: ids[b] }
                },
            };
            let _ = reducer.reduce(&mut state, action, &env);
            assert_relationship_invariants(&state)?;
        }
    }

    /// A repeated follow leaves state exactly as the first one did.
    #[test]
    fn follow_is_idempotent(a in 0..USERS, b in 0..USERS) {
        let reducer = UserReducer::new();
        let env = env();
        let (mut state, ids) = registered_users(&reducer, &env);
        let follow = UserAction::Follow { actor: ids[a], target: ids[b] };

        let _ = reducer.reduce(&mut state, follow.clone(), &env);
        let after_first = state.users.clone();
        let _ = reducer.reduce(&mut state, follow, &env);

        prop_assert_eq!(&state.users, &after_first);
        if a == b {
            prop_assert!(state.users.values().all(|user| user.followings.is_empty()));
        }
    }

    /// No user ends up in more than one RSVP list, whatever the policy, and
    /// without the change policy the first answer is the one that sticks.
    #[test]
    fn rsvp_lists_stay_exclusive(
        allow_response_change in any::<bool>(),
        responses in proptest::collection::vec((0..USERS, arb_choice()), 1..40),
    ) {
        let reducer = EventReducer::with_policy(RsvpPolicy { allow_response_change });
        let env = env();
        let mut state = EventState::new();
        let event_id = EventId::new();
        let users: Vec<UserId> = (0..USERS).map(|_| UserId::new()).collect();
        let _ = reducer.reduce(
            &mut state,
            EventAction::Create {
                id: event_id,
                owner: users[0],
                details: NewEvent {
                    name: "Picnic".to_string(),
                    description: None,
                    location: None,
                    date: test_epoch(),
                },
            },
            &env,
        );

        let mut first_answers: Vec<Option<RsvpChoice>> = vec![None; USERS];
        for (user, choice) in responses {
            let _ = reducer.reduce(
                &mut state,
                EventAction::Respond { event_id, user_id: users[user], choice },
                &env,
            );
            let outcome = state.last_rsvp.unwrap();
            match first_answers[user] {
                None => {
                    prop_assert_eq!(outcome, RsvpOutcome::Responded(choice));
                    first_answers[user] = Some(choice);
                },
                Some(_) if allow_response_change => {},
                Some(first) => prop_assert_eq!(outcome, RsvpOutcome::AlreadyResponded(first)),
            }

            let rsvp = &state.get(&event_id).unwrap().rsvp;
            prop_assert!(rsvp.violations().is_empty());
            prop_assert_eq!(rsvp.total(), first_answers.iter().flatten().count());
        }
    }
}
