//! Global state derivation for work orders.
//!
//! The global state of an order is a pure function of the partial states of
//! its assignments. It is never stored authoritatively on its own: every
//! mutation that touches a partial state recomputes the global state through
//! [`derive_global_state`] before committing.

use crate::order::WorkState;

/// Fold a set of partial states into a single global state.
///
/// Rules are evaluated top to bottom, first match wins:
///
/// 1. no assignments                                  -> `New`
/// 2. every assignment completed                      -> `Completed`
/// 3. any assignment timed out                        -> `TimedOut`
/// 4. any assignment in progress                      -> `InProgress`
/// 5. any assignment pending                          -> `Pending`
/// 6. any assignment closed without solution          -> `ClosedNoSolution`
/// 7. every assignment still merely assigned          -> `Assigned`
/// 8. anything else                                   -> `Pending`
///
/// Rule order is load-bearing. A mix of pending and closed-no-solution
/// assignments resolves to `Pending` because rule 5 fires before rule 6
/// gets a look; clients depend on that precedence.
pub fn derive_global_state(states: &[WorkState]) -> WorkState {
    if states.is_empty() {
        return WorkState::New;
    }
    if states.iter().all(|s| *s == WorkState::Completed) {
        WorkState::Completed
    } else if states.contains(&WorkState::TimedOut) {
        WorkState::TimedOut
    } else if states.contains(&WorkState::InProgress) {
        WorkState::InProgress
    } else if states.contains(&WorkState::Pending) {
        WorkState::Pending
    } else if states.contains(&WorkState::ClosedNoSolution) {
        WorkState::ClosedNoSolution
    } else if states.iter().all(|s| *s == WorkState::Assigned) {
        WorkState::Assigned
    } else {
        // Reachable only for mixes of completed and assigned work: something
        // is done, something has not started, so the order is still waiting.
        WorkState::Pending
    }
}
