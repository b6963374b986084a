//! Scan session reducer.
//!
//! One instance drives one scanning device: the staff gate, the scan
//! phase machine, and the single store call allowed in flight.
//!
//! # Flow
//!
//! 1. Staff submit a credential; scanning stays locked until admitted
//! 2. A decoded payload moves `idle → loading` and spawns a lookup
//! 3. The lookup verdict moves `loading → valid | used | invalid`
//! 4. On `valid` the operator may confirm; the commit moves to `used`
//!    (or `invalid` if the ticket vanished or the store failed)
//! 5. Reset returns to `idle`
//!
//! Lookups and commits run as abortable effects tagged with a token.
//! Cancel, reset and logout abort them; a result that arrives anyway is
//! dropped because its token no longer matches.

use crate::actions::ScannerAction;
use crate::environment::ScannerEnvironment;
use crate::error::StoreError;
use crate::extract::extract_ticket_id;
use crate::providers::{Admission, StaffAuthenticator, TicketStore};
use crate::state::{
    CheckInNotice, DeepLink, InFlight, Operation, ScanPhase, ScannerState, StaffSession,
};
use crate::ticket::{TicketId, TicketStatus};
use crate::verification::{self, CheckInResult, VerificationResult};
use futures::future::abortable;
use gatecheck_core::effect::Effect;
use gatecheck_core::environment::Clock;
use gatecheck_core::reducer::Reducer;
use gatecheck_core::{SmallVec, smallvec};
use std::marker::PhantomData;

type Effects = SmallVec<[Effect<ScannerAction>; 4]>;

/// Scan session reducer.
pub struct ScannerReducer<T, G, C> {
    _phantom: PhantomData<(T, G, C)>,
}

impl<T, G, C> ScannerReducer<T, G, C> {
    /// Create a new scanner reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T, G, C> Default for ScannerReducer<T, G, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, G, C> Clone for ScannerReducer<T, G, C> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T, G, C> std::fmt::Debug for ScannerReducer<T, G, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerReducer").finish()
    }
}

impl<T, G, C> ScannerReducer<T, G, C>
where
    T: TicketStore + Clone + 'static,
    G: StaffAuthenticator + Clone + 'static,
    C: Clock + Clone + 'static,
{
    /// Enter `loading` for `id` and spawn the lookup.
    fn begin_fetch(
        state: &mut ScannerState,
        id: TicketId,
        env: &ScannerEnvironment<T, G, C>,
    ) -> Effects {
        let token = state.issue_token();
        state.phase = ScanPhase::Loading;
        state.subject_id = Some(id.clone());
        state.ticket = None;
        state.fault = None;
        state.notice = None;

        tracing::debug!(ticket_id = %id, token, "Verifying ticket");

        let tickets = env.tickets.clone();
        let settings = env.operations.clone();
        let (lookup, abort) =
            abortable(async move { verification::verify_ticket(&tickets, &id, &settings).await });
        state.in_flight = Some(InFlight {
            operation: Operation::Fetch,
            token,
            abort,
        });

        smallvec![Effect::Future(Box::pin(async move {
            lookup
                .await
                .ok()
                .map(|result| ScannerAction::TicketFetched { token, result })
        }))]
    }

    /// Spawn the commit for the displayed ticket. The phase stays `valid`
    /// until the outcome arrives.
    fn begin_commit(
        state: &mut ScannerState,
        id: TicketId,
        env: &ScannerEnvironment<T, G, C>,
    ) -> Effects {
        let token = state.issue_token();
        state.notice = None;

        tracing::debug!(ticket_id = %id, token, "Committing check-in");

        let tickets = env.tickets.clone();
        let settings = env.operations.clone();
        let (commit, abort) =
            abortable(async move { verification::commit_check_in(&tickets, &id, &settings).await });
        state.in_flight = Some(InFlight {
            operation: Operation::Commit,
            token,
            abort,
        });

        smallvec![Effect::Future(Box::pin(async move {
            commit
                .await
                .ok()
                .map(|result| ScannerAction::CheckInFinished { token, result })
        }))]
    }

    /// Fire a pending deep link if the session can take a scan now.
    fn fire_deep_link(state: &mut ScannerState, env: &ScannerEnvironment<T, G, C>) -> Effects {
        if !state.accepts_scans() {
            return smallvec![Effect::None];
        }

        match state.deep_link.take() {
            Some(DeepLink::Pending(id)) => {
                state.deep_link = Some(DeepLink::Spent);
                tracing::info!(ticket_id = %id, "Verifying deep-linked ticket");
                Self::begin_fetch(state, id, env)
            },
            other => {
                state.deep_link = other;
                smallvec![Effect::None]
            },
        }
    }

    fn apply_verification(state: &mut ScannerState, result: VerificationResult) {
        match result {
            VerificationResult::Valid(ticket) => {
                state.phase = ScanPhase::Valid;
                state.ticket = Some(ticket);
            },
            VerificationResult::Used(ticket) => {
                state.phase = ScanPhase::Used;
                state.ticket = Some(ticket);
            },
            VerificationResult::Invalid => {
                state.phase = ScanPhase::Invalid;
                state.ticket = None;
            },
            VerificationResult::TransientFault(error) => {
                state.phase = ScanPhase::Invalid;
                state.ticket = None;
                state.fault = Some(error);
            },
        }
    }

    fn apply_check_in(state: &mut ScannerState, result: CheckInResult) {
        let notice = match result {
            CheckInResult::Committed => CheckInNotice::CheckedIn,
            CheckInResult::AlreadyUsed => CheckInNotice::AlreadyUsed,
            CheckInResult::NotFound => {
                state.phase = ScanPhase::Invalid;
                state.ticket = None;
                return;
            },
            CheckInResult::TransientFault(error) => {
                state.phase = ScanPhase::Invalid;
                state.ticket = None;
                state.fault = Some(error);
                return;
            },
        };

        state.phase = ScanPhase::Used;
        state.notice = Some(notice);
        if let Some(ticket) = state.ticket.as_mut() {
            ticket.status = TicketStatus::Used;
        }
    }
}

impl<T, G, C> Reducer for ScannerReducer<T, G, C>
where
    T: TicketStore + Clone + 'static,
    G: StaffAuthenticator + Clone + 'static,
    C: Clock + Clone + 'static,
{
    type State = ScannerState;
    type Action = ScannerAction;
    type Environment = ScannerEnvironment<T, G, C>;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════════
            // Staff gate
            // ═══════════════════════════════════════════════════════════════
            ScannerAction::SubmitCredential { credential } => {
                if state.is_admitted() {
                    tracing::debug!("Credential ignored: already admitted");
                    return smallvec![Effect::None];
                }

                // A newer submission supersedes any check still pending.
                let token = state.issue_token();
                state.pending_admission = Some(token);

                let gate = env.gate.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    Some(match gate.admit(&credential).await {
                        Admission::Admitted(identity) => {
                            ScannerAction::StaffAdmitted { token, identity }
                        },
                        Admission::Rejected => ScannerAction::StaffRejected { token },
                    })
                }))]
            },

            ScannerAction::StaffAdmitted { token, identity } => {
                if !state.answer_admission(token) {
                    tracing::debug!(token, "Dropped stale admission");
                    return smallvec![Effect::None];
                }

                tracing::info!(staff = identity.as_str(), "Staff admitted");
                state.staff = Some(StaffSession {
                    identity,
                    admitted_at: env.clock.now(),
                });
                state.rejected_attempts = 0;
                Self::fire_deep_link(state, env)
            },

            ScannerAction::StaffRejected { token } => {
                if !state.answer_admission(token) {
                    tracing::debug!(token, "Dropped stale rejection");
                    return smallvec![Effect::None];
                }

                state.rejected_attempts = state.rejected_attempts.saturating_add(1);
                tracing::warn!(attempts = state.rejected_attempts, "Staff credential rejected");
                smallvec![Effect::None]
            },

            ScannerAction::Logout => {
                state.reset_scan();
                state.pending_admission = None;
                if let Some(staff) = state.staff.take() {
                    tracing::info!(staff = staff.identity.as_str(), "Staff logged out");
                }
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // Scan input
            // ═══════════════════════════════════════════════════════════════
            ScannerAction::DeepLinkReceived { payload } => {
                if state.deep_link.is_some() {
                    tracing::debug!("Deep link ignored: one was already received");
                    return smallvec![Effect::None];
                }
                let Some(id) = extract_ticket_id(&payload) else {
                    return smallvec![Effect::None];
                };

                state.deep_link = Some(DeepLink::Pending(id));
                Self::fire_deep_link(state, env)
            },

            ScannerAction::PayloadScanned { payload } => {
                if !state.accepts_scans() {
                    tracing::debug!(
                        phase = ?state.phase,
                        admitted = state.is_admitted(),
                        busy = state.is_busy(),
                        "Scan ignored"
                    );
                    return smallvec![Effect::None];
                }
                let Some(id) = extract_ticket_id(&payload) else {
                    return smallvec![Effect::None];
                };

                state.camera_fault = None;
                Self::begin_fetch(state, id, env)
            },

            ScannerAction::CameraFault { message } => {
                tracing::warn!(message = %message, "Camera unavailable");
                state.camera_fault = Some(message);
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // Operator
            // ═══════════════════════════════════════════════════════════════
            ScannerAction::ConfirmCheckIn => {
                if !state.can_check_in() {
                    tracing::debug!(phase = ?state.phase, "Check-in not available");
                    return smallvec![Effect::None];
                }
                let Some(id) = state.subject_id.clone() else {
                    return smallvec![Effect::None];
                };

                Self::begin_commit(state, id, env)
            },

            ScannerAction::Retry => {
                if !state.can_retry() {
                    return smallvec![Effect::None];
                }
                let Some(id) = state.subject_id.clone() else {
                    return smallvec![Effect::None];
                };

                tracing::info!(ticket_id = %id, "Retrying after store fault");
                Self::begin_fetch(state, id, env)
            },

            ScannerAction::Cancel => {
                let Some(operation) = state.abort_in_flight() else {
                    return smallvec![Effect::None];
                };

                tracing::info!(?operation, "In-flight operation cancelled");
                state.phase = ScanPhase::Invalid;
                state.ticket = None;
                state.notice = None;
                state.fault = Some(StoreError::Cancelled);
                smallvec![Effect::None]
            },

            ScannerAction::Reset => {
                state.reset_scan();
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // Effect results
            // ═══════════════════════════════════════════════════════════════
            ScannerAction::TicketFetched { token, result } => {
                if state.complete(token) != Some(Operation::Fetch) {
                    tracing::debug!(token, "Dropped stale lookup result");
                    return smallvec![Effect::None];
                }

                Self::apply_verification(state, result);
                smallvec![Effect::None]
            },

            ScannerAction::CheckInFinished { token, result } => {
                if state.complete(token) != Some(Operation::Commit) {
                    tracing::debug!(token, "Dropped stale check-in result");
                    return smallvec![Effect::None];
                }

                Self::apply_check_in(state, result);
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::gate::SharedPinGate;
    use crate::mocks::InMemoryTicketStore;
    use crate::ticket::Ticket;
    use gatecheck_testing::{FixedClock, ReducerTest, assertions, test_clock, test_time};

    type TestReducer = ScannerReducer<InMemoryTicketStore, SharedPinGate, FixedClock>;
    type TestEnv = ScannerEnvironment<InMemoryTicketStore, SharedPinGate, FixedClock>;

    const PIN: &str = "4821";

    fn env_with(store: &InMemoryTicketStore) -> TestEnv {
        ScannerEnvironment::new(store.clone(), SharedPinGate::new(PIN), test_clock())
    }

    fn env() -> TestEnv {
        let store = InMemoryTicketStore::new();
        store.insert(Ticket::issued("abc", "Ana Quispe", "45879632"));
        env_with(&store)
    }

    fn admitted() -> ScannerState {
        ScannerState {
            staff: Some(StaffSession {
                identity: crate::providers::StaffIdentity("staff".to_string()),
                admitted_at: test_time(),
            }),
            ..ScannerState::default()
        }
    }

    /// Locked device with credential check 0 outstanding.
    fn awaiting_gate() -> ScannerState {
        ScannerState {
            pending_admission: Some(0),
            next_token: 1,
            ..ScannerState::default()
        }
    }

    /// Await every future effect and collect the actions they produce.
    async fn run_effects(effects: Effects) -> Vec<ScannerAction> {
        let mut actions = Vec::new();
        for effect in effects {
            if let Effect::Future(fut) = effect {
                actions.extend(fut.await);
            }
        }
        actions
    }

    /// Reduce `action`, then feed every produced action back until quiet.
    async fn settle(
        reducer: &TestReducer,
        state: &mut ScannerState,
        action: ScannerAction,
        env: &TestEnv,
    ) {
        let mut queue = vec![action];
        while let Some(next) = queue.pop() {
            let effects = reducer.reduce(state, next, env);
            queue.extend(run_effects(effects).await);
        }
    }

    #[test]
    fn test_scan_is_ignored_before_admission() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(ScannerState::default())
            .when_action(ScannerAction::PayloadScanned {
                payload: "abc".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Idle);
                assert_eq!(state.subject_id, None);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_scan_moves_idle_to_loading() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(admitted())
            .when_action(ScannerAction::PayloadScanned {
                payload: "https://x.test/scan?id=abc".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Loading);
                assert_eq!(state.subject_id, Some(TicketId::from("abc")));
                assert!(state.is_busy());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_blank_scan_is_a_non_event() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(admitted())
            .when_action(ScannerAction::PayloadScanned {
                payload: "   ".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Idle);
                assert!(!state.is_busy());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_second_scan_while_loading_is_ignored() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(admitted())
            .when_actions([
                ScannerAction::PayloadScanned {
                    payload: "abc".to_string(),
                },
                ScannerAction::PayloadScanned {
                    payload: "other".to_string(),
                },
            ])
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Loading);
                assert_eq!(state.subject_id, Some(TicketId::from("abc")));
                assert_eq!(state.next_token, 1);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_stale_lookup_result_is_dropped_after_reset() {
        let ticket = Ticket::issued("abc", "Ana Quispe", "45879632");
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(admitted())
            .when_actions([
                ScannerAction::PayloadScanned {
                    payload: "abc".to_string(),
                },
                ScannerAction::Reset,
                ScannerAction::TicketFetched {
                    token: 0,
                    result: VerificationResult::Valid(ticket),
                },
            ])
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Idle);
                assert_eq!(state.ticket, None);
            })
            .run();
    }

    #[test]
    fn test_cancel_during_lookup_is_a_retryable_invalid() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(admitted())
            .when_actions([
                ScannerAction::PayloadScanned {
                    payload: "abc".to_string(),
                },
                ScannerAction::Cancel,
            ])
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Invalid);
                assert_eq!(state.fault, Some(StoreError::Cancelled));
                assert!(state.can_retry());
            })
            .run();
    }

    #[test]
    fn test_camera_fault_is_a_banner_only() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(ScannerState {
                phase: ScanPhase::Used,
                ..admitted()
            })
            .when_action(ScannerAction::CameraFault {
                message: "permission denied".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Used);
                assert_eq!(state.camera_fault.as_deref(), Some("permission denied"));
            })
            .run();
    }

    #[test]
    fn test_deep_link_waits_for_admission() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(ScannerState::default())
            .when_action(ScannerAction::DeepLinkReceived {
                payload: "https://x.test/scan?id=abc".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Idle);
                assert_eq!(state.deep_link, Some(DeepLink::Pending(TicketId::from("abc"))));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_deep_link_fires_on_admission() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(awaiting_gate())
            .when_actions([
                ScannerAction::DeepLinkReceived {
                    payload: "abc".to_string(),
                },
                ScannerAction::StaffAdmitted {
                    token: 0,
                    identity: crate::providers::StaffIdentity("staff".to_string()),
                },
            ])
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Loading);
                assert_eq!(state.deep_link, Some(DeepLink::Spent));
                assert_eq!(
                    state.staff.as_ref().map(|staff| staff.admitted_at),
                    Some(test_time())
                );
            })
            .then_effects(|effects| assertions::assert_has_future_effect(effects))
            .run();
    }

    #[test]
    fn test_deep_link_waits_while_a_verdict_is_shown() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(ScannerState {
                phase: ScanPhase::Valid,
                subject_id: Some(TicketId::from("T1")),
                ticket: Some(Ticket::issued("T1", "Luis Huamán", "70112233")),
                ..admitted()
            })
            .when_action(ScannerAction::DeepLinkReceived {
                payload: "abc".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Valid);
                assert_eq!(state.subject_id, Some(TicketId::from("T1")));
                assert_eq!(state.deep_link, Some(DeepLink::Pending(TicketId::from("abc"))));
                assert!(!state.is_busy());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_deep_link_waits_while_loading() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(admitted())
            .when_actions([
                ScannerAction::PayloadScanned {
                    payload: "T1".to_string(),
                },
                ScannerAction::DeepLinkReceived {
                    payload: "abc".to_string(),
                },
            ])
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Loading);
                assert_eq!(state.subject_id, Some(TicketId::from("T1")));
                assert_eq!(state.deep_link, Some(DeepLink::Pending(TicketId::from("abc"))));
                assert_eq!(state.next_token, 1);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_deep_link_held_behind_a_verdict_is_spent_by_reset() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(ScannerState {
                phase: ScanPhase::Used,
                ..admitted()
            })
            .when_actions([
                ScannerAction::DeepLinkReceived {
                    payload: "abc".to_string(),
                },
                ScannerAction::Reset,
            ])
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Idle);
                assert_eq!(state.deep_link, Some(DeepLink::Spent));
                assert_eq!(state.next_token, 0);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_ignored_scan_keeps_camera_banner() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(ScannerState {
                phase: ScanPhase::Used,
                camera_fault: Some("permission denied".to_string()),
                ..admitted()
            })
            .when_action(ScannerAction::PayloadScanned {
                payload: "abc".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Used);
                assert_eq!(state.camera_fault.as_deref(), Some("permission denied"));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_accepted_scan_clears_camera_banner() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(ScannerState {
                camera_fault: Some("permission denied".to_string()),
                ..admitted()
            })
            .when_action(ScannerAction::PayloadScanned {
                payload: "abc".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Loading);
                assert_eq!(state.camera_fault, None);
            })
            .run();
    }

    #[test]
    fn test_reset_discards_unconsumed_deep_link() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(awaiting_gate())
            .when_actions([
                ScannerAction::DeepLinkReceived {
                    payload: "abc".to_string(),
                },
                ScannerAction::Reset,
                ScannerAction::StaffAdmitted {
                    token: 0,
                    identity: crate::providers::StaffIdentity("staff".to_string()),
                },
            ])
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Idle);
                assert_eq!(state.deep_link, Some(DeepLink::Spent));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[tokio::test]
    async fn test_wrong_pin_keeps_scanner_locked() {
        let reducer = TestReducer::new();
        let env = env();
        let mut state = ScannerState::default();

        settle(
            &reducer,
            &mut state,
            ScannerAction::SubmitCredential {
                credential: "0000".to_string(),
            },
            &env,
        )
        .await;

        assert!(!state.is_admitted());
        assert_eq!(state.rejected_attempts, 1);
    }

    #[tokio::test]
    async fn test_abc_scenario() {
        let store = InMemoryTicketStore::new();
        store.insert(Ticket::issued("abc", "Ana Quispe", "45879632"));
        let reducer = TestReducer::new();
        let env = env_with(&store);
        let mut state = ScannerState::default();

        settle(
            &reducer,
            &mut state,
            ScannerAction::SubmitCredential {
                credential: PIN.to_string(),
            },
            &env,
        )
        .await;
        assert!(state.is_admitted());

        let scan = || ScannerAction::PayloadScanned {
            payload: "abc".to_string(),
        };

        settle(&reducer, &mut state, scan(), &env).await;
        assert_eq!(state.phase, ScanPhase::Valid);

        settle(&reducer, &mut state, ScannerAction::ConfirmCheckIn, &env).await;
        assert_eq!(state.phase, ScanPhase::Used);
        assert_eq!(state.notice, Some(CheckInNotice::CheckedIn));
        assert_eq!(store.status(&TicketId::from("abc")), Some(TicketStatus::Used));

        settle(&reducer, &mut state, ScannerAction::Reset, &env).await;
        assert_eq!(state.phase, ScanPhase::Idle);
        assert_eq!(state.subject_id, None);

        settle(&reducer, &mut state, scan(), &env).await;
        assert_eq!(state.phase, ScanPhase::Used);
        assert_eq!(state.notice, None);
        assert!(!state.can_check_in());
        assert_eq!(store.commit_calls(), 1);
    }

    #[tokio::test]
    async fn test_losing_the_race_reports_already_used() {
        let store = InMemoryTicketStore::new();
        store.insert(Ticket::issued("abc", "Ana Quispe", "45879632"));
        let reducer = TestReducer::new();
        let env = env_with(&store);
        let mut state = admitted();

        settle(
            &reducer,
            &mut state,
            ScannerAction::PayloadScanned {
                payload: "abc".to_string(),
            },
            &env,
        )
        .await;
        assert_eq!(state.phase, ScanPhase::Valid);

        // Another device wins between this device's read and commit.
        store
            .commit_check_in(&TicketId::from("abc"))
            .await
            .expect("other device");

        settle(&reducer, &mut state, ScannerAction::ConfirmCheckIn, &env).await;
        assert_eq!(state.phase, ScanPhase::Used);
        assert_eq!(state.notice, Some(CheckInNotice::AlreadyUsed));
        assert!(state.ticket.as_ref().is_some_and(Ticket::is_used));
    }

    #[tokio::test]
    async fn test_commit_fault_then_retry_shows_used() {
        let store = InMemoryTicketStore::new();
        store.insert(Ticket::issued("abc", "Ana Quispe", "45879632"));
        store.apply_then_fail_next_commit(StoreError::Unavailable("reply lost".into()));
        let reducer = TestReducer::new();
        let env = env_with(&store);
        let mut state = admitted();

        settle(
            &reducer,
            &mut state,
            ScannerAction::PayloadScanned {
                payload: "abc".to_string(),
            },
            &env,
        )
        .await;
        settle(&reducer, &mut state, ScannerAction::ConfirmCheckIn, &env).await;

        assert_eq!(state.phase, ScanPhase::Invalid);
        assert!(matches!(state.fault, Some(StoreError::Unavailable(_))));
        assert_eq!(state.ticket, None);

        settle(&reducer, &mut state, ScannerAction::Retry, &env).await;
        assert_eq!(state.phase, ScanPhase::Used);
        assert_eq!(state.fault, None);
    }

    #[tokio::test]
    async fn test_retry_is_refused_for_a_genuine_not_found() {
        let reducer = TestReducer::new();
        let env = env();
        let mut state = admitted();

        settle(
            &reducer,
            &mut state,
            ScannerAction::PayloadScanned {
                payload: "zzz".to_string(),
            },
            &env,
        )
        .await;
        assert_eq!(state.phase, ScanPhase::Invalid);
        assert_eq!(state.fault, None);

        let effects = reducer.reduce(&mut state, ScannerAction::Retry, &env);
        assertions::assert_no_effects(&effects);
        assert_eq!(state.phase, ScanPhase::Invalid);
    }

    #[tokio::test]
    async fn test_logout_cancels_and_locks() {
        let reducer = TestReducer::new();
        let env = env();
        let mut state = admitted();

        let effects = reducer.reduce(
            &mut state,
            ScannerAction::PayloadScanned {
                payload: "abc".to_string(),
            },
            &env,
        );
        reducer.reduce(&mut state, ScannerAction::Logout, &env);

        assert!(run_effects(effects).await.is_empty(), "aborted lookup yields nothing");
        assert!(!state.is_admitted());
        assert_eq!(state.phase, ScanPhase::Idle);
        assert!(!state.is_busy());
    }

    #[tokio::test]
    async fn test_logout_discards_pending_admission() {
        let reducer = TestReducer::new();
        let env = env();
        let mut state = ScannerState::default();

        let effects = reducer.reduce(
            &mut state,
            ScannerAction::SubmitCredential {
                credential: PIN.to_string(),
            },
            &env,
        );
        reducer.reduce(&mut state, ScannerAction::Logout, &env);

        for action in run_effects(effects).await {
            assert!(matches!(action, ScannerAction::StaffAdmitted { .. }));
            reducer.reduce(&mut state, action, &env);
        }

        assert!(!state.is_admitted());
        assert_eq!(state.pending_admission, None);
    }

    #[tokio::test]
    async fn test_superseded_credential_answer_is_dropped() {
        let reducer = TestReducer::new();
        let env = env();
        let mut state = ScannerState::default();

        let wrong = reducer.reduce(
            &mut state,
            ScannerAction::SubmitCredential {
                credential: "0000".to_string(),
            },
            &env,
        );
        let right = reducer.reduce(
            &mut state,
            ScannerAction::SubmitCredential {
                credential: PIN.to_string(),
            },
            &env,
        );

        for action in run_effects(wrong).await {
            reducer.reduce(&mut state, action, &env);
        }
        assert_eq!(state.rejected_attempts, 0);
        assert!(!state.is_admitted());

        for action in run_effects(right).await {
            reducer.reduce(&mut state, action, &env);
        }
        assert!(state.is_admitted());
        assert_eq!(state.pending_admission, None);
    }
}
