//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::store::Snapshot;
use crate::transport::{Exchange, ExchangeStatus, NewThread, SessionIds, TransportError};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::Assistant), Just(Role::System)]
}

fn arb_message() -> impl Strategy<Value = Message> {
    (arb_role(), "[a-zA-Z*_ ]{1,30}").prop_map(|(role, content)| Message::new(role, content))
}

fn arb_thread_mode() -> impl Strategy<Value = Mode> {
    prop_oneof![
        Just(Mode::Active),
        Just(Mode::AwaitingMoreInfo),
        Just(Mode::Closed),
    ]
}

fn arb_lockout() -> impl Strategy<Value = Lockout> {
    prop_oneof![
        3 => Just(Lockout::None),
        1 => Just(Lockout::Thread),
        1 => Just(Lockout::Session),
    ]
}

fn arb_uninitialized_state() -> impl Strategy<Value = ChatState> {
    (
        any::<bool>(),
        any::<bool>(),
        proptest::collection::vec(arb_message(), 0..3),
    )
        .prop_map(|(processing, offline, messages)| ChatState {
            messages,
            processing,
            offline,
            ..ChatState::default()
        })
}

fn arb_session_state() -> impl Strategy<Value = ChatState> {
    (
        "s[a-z0-9]{4}",
        "t[a-z0-9]{4}",
        arb_thread_mode(),
        proptest::collection::vec(arb_message(), 0..6),
        any::<bool>(),
        arb_lockout(),
        any::<bool>(),
    )
        .prop_map(
            |(session_id, thread_id, mode, messages, processing, lockout, offline)| ChatState {
                session_id: Some(session_id),
                thread_id: Some(thread_id),
                mode,
                messages,
                processing,
                lockout,
                offline,
            },
        )
}

fn arb_state() -> impl Strategy<Value = ChatState> {
    prop_oneof![
        1 => arb_uninitialized_state(),
        4 => arb_session_state(),
    ]
}

fn arb_category() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("INVALID_SESSION_ID".to_string())),
        Just(Some("MISSING_HEADER".to_string())),
        Just(Some("INVALID_THREAD_ID".to_string())),
        Just(Some("THREAD_ID_NOT_FOUND".to_string())),
        Just(Some("THREAD_ID_ALREADY_EXISTS".to_string())),
        Just(Some("CLOSED_THREAD".to_string())),
        Just(Some("DATABASE_ERROR".to_string())),
        "[A-Z_]{3,12}".prop_map(Some),
    ]
}

fn arb_transport_error() -> impl Strategy<Value = TransportError> {
    (arb_category(), "[a-zA-Z. ]{0,30}")
        .prop_map(|(category, message)| TransportError::new(category, message))
}

fn arb_status() -> impl Strategy<Value = ExchangeStatus> {
    prop_oneof![
        3 => Just(ExchangeStatus::MoreInfo),
        1 => Just(ExchangeStatus::MatchFound),
        1 => "[A-Z_]{3,10}".prop_map(ExchangeStatus::from),
    ]
}

fn arb_snapshot() -> impl Strategy<Value = Option<Snapshot>> {
    prop_oneof![Just(None), arb_session_state().prop_map(|s| s.snapshot())]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_snapshot().prop_map(|restored| Event::Boot { restored }),
        "[a-zA-Z ]{0,20}".prop_map(Event::user_submit),
        Just(Event::NewChatRequested),
        ("s[a-z0-9]{4}", "t[a-z0-9]{4}").prop_map(|(session_id, thread_id)| {
            Event::SessionCreated {
                ids: SessionIds {
                    session_id,
                    thread_id,
                },
            }
        }),
        "t[a-z0-9]{4}".prop_map(|thread_id| Event::ThreadCreated {
            thread: NewThread { thread_id }
        }),
        ("[a-zA-Z ]{1,20}", arb_status()).prop_map(|(result_text, status)| {
            Event::ExchangeCompleted {
                exchange: Exchange {
                    result_text,
                    status,
                },
            }
        }),
        arb_transport_error().prop_map(|error| Event::RequestFailed { error }),
    ]
}

fn is_backend_outcome(event: &Event) -> bool {
    matches!(
        event,
        Event::SessionCreated { .. }
            | Event::ThreadCreated { .. }
            | Event::ExchangeCompleted { .. }
            | Event::RequestFailed { .. }
    )
}

fn fresh_thread() -> ChatState {
    ChatState {
        session_id: Some("s1".to_string()),
        thread_id: Some("t1".to_string()),
        mode: Mode::Active,
        ..ChatState::default()
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_thread_id_defined_outside_uninitialized(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            if result.new_state.mode != Mode::Uninitialized {
                prop_assert!(result.new_state.thread_id.is_some());
                prop_assert!(result.new_state.session_id.is_some());
            }
        }
    }

    #[test]
    fn prop_at_most_one_backend_call_gated_by_flag(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            let calls: Vec<usize> = result
                .effects
                .iter()
                .enumerate()
                .filter(|(_, e)| e.is_backend_call())
                .map(|(i, _)| i)
                .collect();
            prop_assert!(calls.len() <= 1);
            if let Some(&call) = calls.first() {
                prop_assert!(!state.processing);
                prop_assert!(result.new_state.processing);
                // Backend call is always the last effect, after any write-through.
                prop_assert_eq!(call, result.effects.len() - 1);
            }
        }
    }

    #[test]
    fn prop_processing_rejects_user_actions(mut state in arb_state(), text in "[a-z]{1,10}") {
        state.processing = true;
        prop_assert!(transition(&state, Event::user_submit(text)).is_err());
        prop_assert!(transition(&state, Event::NewChatRequested).is_err());
        let boot = Event::Boot { restored: None };
        prop_assert!(transition(&state, boot).is_err());
    }

    #[test]
    fn prop_backend_outcomes_clear_flag(state in arb_state(), event in arb_event()) {
        let outcome = is_backend_outcome(&event);
        if let Ok(result) = transition(&state, event) {
            if outcome {
                prop_assert!(!result.new_state.processing);
            }
        }
    }

    #[test]
    fn prop_log_is_append_only_within_a_thread(state in arb_state(), event in arb_event()) {
        let resets = matches!(event, Event::SessionCreated { .. } | Event::ThreadCreated { .. } | Event::Boot { .. });
        if let Ok(result) = transition(&state, event) {
            if !resets {
                prop_assert!(result.new_state.messages.len() >= state.messages.len());
                prop_assert_eq!(&result.new_state.messages[..state.messages.len()], &state.messages[..]);
                prop_assert!(result.new_state.messages.len() - state.messages.len() <= 1);
            }
        }
    }

    #[test]
    fn prop_failures_keep_identifiers(mut state in arb_session_state(), error in arb_transport_error()) {
        state.processing = true;
        let result = transition(&state, Event::RequestFailed { error }).unwrap();
        prop_assert_eq!(&result.new_state.session_id, &state.session_id);
        prop_assert_eq!(&result.new_state.thread_id, &state.thread_id);
        prop_assert!(result.effects.contains(&Effect::PersistSnapshot));
        prop_assert_eq!(result.new_state.messages.last().map(|m| m.role), Some(Role::System));
    }

    #[test]
    fn prop_successful_exchanges_double_the_log(
        statuses in proptest::collection::vec(arb_status(), 1..8),
        texts in proptest::collection::vec("[a-zA-Z][a-zA-Z*_ ]{0,19}", 8),
    ) {
        let mut state = fresh_thread();
        let mut exchanges = 0;

        for (status, text) in statuses.into_iter().zip(texts) {
            let submitted = match transition(&state, Event::user_submit(text.clone())) {
                Ok(r) => r.new_state,
                Err(TransitionError::Rejected(reason)) => {
                    // Only a closed thread stops the loop here.
                    prop_assert_eq!(reason, RejectReason::ThreadClosed);
                    break;
                }
                Err(e) => return Err(TestCaseError::fail(e.to_string())),
            };
            let reply = format!("reply {exchanges}");
            let exchange = Exchange { result_text: reply.clone(), status };
            state = transition(&submitted, Event::ExchangeCompleted { exchange }).unwrap().new_state;
            exchanges += 1;

            let n = state.messages.len();
            prop_assert_eq!(&state.messages[n - 2], &Message::user(text.trim()));
            prop_assert_eq!(&state.messages[n - 1], &Message::assistant(reply));
        }

        prop_assert_eq!(state.messages.len(), 2 * exchanges);
        if state.mode == Mode::Closed {
            prop_assert_eq!(
                transition(&state, Event::user_submit("more")).unwrap_err(),
                TransitionError::Rejected(RejectReason::ThreadClosed)
            );
        }
    }

    #[test]
    fn prop_restore_round_trip(state in arb_session_state()) {
        let result = transition(&ChatState::default(), Event::Boot { restored: state.snapshot() }).unwrap();
        prop_assert_eq!(result.new_state.mode, state.mode);
        prop_assert_eq!(&result.new_state.messages, &state.messages);
        prop_assert!(!result.new_state.processing);
        prop_assert_eq!(result.new_state.lockout, Lockout::None);
    }
}
