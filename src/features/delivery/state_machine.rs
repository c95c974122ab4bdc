//! # Delivery State Machine
//!
//! Per-occurrence delivery lifecycle: `Pending → Fired → {Snoozed,
//! Completed, Dismissed}`. The Fired transition is driven exclusively by
//! alarm delivery; resolution is single-flight so concurrent user actions
//! (or duplicate OS deliveries) collapse to one effective execution per
//! occurrence. State lives in memory only and is discarded once resolved;
//! the persisted outcome is always a reminder mutation, never this state.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Explicit single-flight claim map instead of per-handler flags
//! - 1.0.0: Initial fire/resolve tracking

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info};

use crate::core::base_reminder_id;
use crate::features::scheduling::AlarmKind;

/// Delivery lifecycle of one occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    /// Alarm registered, not yet due
    Pending,
    /// At least one alert for this occurrence has been delivered. Main and
    /// LeadTime are tracked separately so the later alert still presents,
    /// while a duplicate delivery of the same alert is swallowed.
    Fired { main_seen: bool, lead_seen: bool },
    /// Resolved by snoozing into a brand-new reminder
    Snoozed { snoozed_to: String },
    /// Resolved by marking the underlying reminder done
    Completed,
    /// Alert acknowledged without touching the reminder
    Dismissed,
}

impl DeliveryState {
    fn fired(kind: AlarmKind) -> Self {
        DeliveryState::Fired {
            main_seen: kind == AlarmKind::Main,
            lead_seen: kind == AlarmKind::LeadTime,
        }
    }
}

impl std::fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryState::Pending => write!(f, "pending"),
            DeliveryState::Fired { .. } => write!(f, "fired"),
            DeliveryState::Snoozed { snoozed_to } => write!(f, "snoozed -> {snoozed_to}"),
            DeliveryState::Completed => write!(f, "completed"),
            DeliveryState::Dismissed => write!(f, "dismissed"),
        }
    }
}

/// Tracks delivery state and resolution claims per occurrence key.
pub struct DeliveryStateMachine {
    states: DashMap<String, DeliveryState>,
    /// Single-flight claims. An entry here means a resolution is in
    /// progress or already happened; claims from successful resolutions are
    /// kept as tombstones so late duplicate actions stay no-ops.
    claims: DashMap<String, ()>,
}

impl DeliveryStateMachine {
    pub fn new() -> Self {
        DeliveryStateMachine {
            states: DashMap::new(),
            claims: DashMap::new(),
        }
    }

    /// Record an alarm registration so observers can see the occurrence as
    /// pending before it fires.
    pub fn mark_pending(&self, occurrence_key: &str) {
        self.states
            .entry(occurrence_key.to_string())
            .or_insert(DeliveryState::Pending);
    }

    /// Record an alarm delivery. Returns `true` when the alert should be
    /// presented; `false` swallows a duplicate delivery of the same alert
    /// kind, or any delivery for an occurrence already being resolved.
    pub fn mark_fired(&self, occurrence_key: &str, kind: AlarmKind) -> bool {
        if self.claims.contains_key(occurrence_key) {
            debug!("fire for {occurrence_key} arrived after resolution, ignoring");
            return false;
        }
        match self.states.entry(occurrence_key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(DeliveryState::fired(kind));
                true
            }
            Entry::Occupied(mut slot) => match slot.get().clone() {
                DeliveryState::Pending => {
                    slot.insert(DeliveryState::fired(kind));
                    true
                }
                DeliveryState::Fired {
                    main_seen,
                    lead_seen,
                } => {
                    let duplicate = match kind {
                        AlarmKind::Main => main_seen,
                        AlarmKind::LeadTime => lead_seen,
                    };
                    if duplicate {
                        debug!("duplicate {kind} fire for {occurrence_key} ignored");
                        return false;
                    }
                    slot.insert(DeliveryState::Fired {
                        main_seen: main_seen || kind == AlarmKind::Main,
                        lead_seen: lead_seen || kind == AlarmKind::LeadTime,
                    });
                    true
                }
                _ => false,
            },
        }
    }

    /// Claim the right to resolve one occurrence. Returns `false` when a
    /// resolution is already in flight or already happened.
    pub fn try_claim(&self, occurrence_key: &str) -> bool {
        match self.claims.entry(occurrence_key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(());
                true
            }
        }
    }

    /// Give a claim back without resolving, so the caller can retry (used
    /// on transient failures).
    pub fn release(&self, occurrence_key: &str) {
        self.claims.remove(occurrence_key);
    }

    /// Record a terminal outcome and discard the occurrence's state. The
    /// claim stays behind as a tombstone.
    pub fn resolve(&self, occurrence_key: &str, outcome: DeliveryState) {
        info!("occurrence {occurrence_key} resolved: {outcome}");
        self.states.remove(occurrence_key);
    }

    /// Current state, if the occurrence is being tracked.
    pub fn state(&self, occurrence_key: &str) -> Option<DeliveryState> {
        self.states.get(occurrence_key).map(|s| s.clone())
    }

    /// Drop all tracking for a reminder (deletion / completion paths).
    pub fn discard_for(&self, reminder_id: &str) {
        self.states
            .retain(|key, _| base_reminder_id(key) != reminder_id);
        self.claims
            .retain(|key, _| base_reminder_id(key) != reminder_id);
    }
}

impl Default for DeliveryStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_fire_presents() {
        let machine = DeliveryStateMachine::new();
        assert!(machine.mark_fired("occ-1", AlarmKind::Main));
        assert!(matches!(
            machine.state("occ-1"),
            Some(DeliveryState::Fired { main_seen: true, .. })
        ));
    }

    #[test]
    fn test_duplicate_fire_is_swallowed() {
        let machine = DeliveryStateMachine::new();
        assert!(machine.mark_fired("occ-1", AlarmKind::Main));
        assert!(!machine.mark_fired("occ-1", AlarmKind::Main));
    }

    #[test]
    fn test_lead_then_main_both_present() {
        let machine = DeliveryStateMachine::new();
        assert!(machine.mark_fired("occ-1", AlarmKind::LeadTime));
        assert!(machine.mark_fired("occ-1", AlarmKind::Main));
        assert!(!machine.mark_fired("occ-1", AlarmKind::Main));
        assert!(!machine.mark_fired("occ-1", AlarmKind::LeadTime));
    }

    #[test]
    fn test_claim_is_single_flight() {
        let machine = DeliveryStateMachine::new();
        machine.mark_fired("occ-1", AlarmKind::Main);
        assert!(machine.try_claim("occ-1"));
        assert!(!machine.try_claim("occ-1"));
    }

    #[test]
    fn test_release_allows_retry() {
        let machine = DeliveryStateMachine::new();
        machine.mark_fired("occ-1", AlarmKind::Main);
        assert!(machine.try_claim("occ-1"));
        machine.release("occ-1");
        assert!(machine.try_claim("occ-1"));
    }

    #[test]
    fn test_resolved_state_is_discarded_and_claim_tombstoned() {
        let machine = DeliveryStateMachine::new();
        machine.mark_fired("occ-1", AlarmKind::Main);
        assert!(machine.try_claim("occ-1"));
        machine.resolve("occ-1", DeliveryState::Completed);

        assert!(machine.state("occ-1").is_none());
        assert!(!machine.try_claim("occ-1"));
        // A straggling fire after resolution stays silent
        assert!(!machine.mark_fired("occ-1", AlarmKind::Main));
    }

    #[test]
    fn test_discard_for_clears_reminder_and_occurrences() {
        let machine = DeliveryStateMachine::new();
        machine.mark_fired("rem-1", AlarmKind::Main);
        machine.mark_fired("rem-1_occurrence_1717234200000", AlarmKind::Main);
        machine.mark_fired("rem-2", AlarmKind::Main);
        machine.try_claim("rem-1");

        machine.discard_for("rem-1");
        assert!(machine.state("rem-1").is_none());
        assert!(machine.state("rem-1_occurrence_1717234200000").is_none());
        assert!(machine.state("rem-2").is_some());
        assert!(machine.try_claim("rem-1"));
    }

    #[tokio::test]
    async fn test_concurrent_fires_present_once() {
        let machine = Arc::new(DeliveryStateMachine::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let machine = machine.clone();
            handles.push(tokio::spawn(async move {
                machine.mark_fired("occ-race", AlarmKind::Main)
            }));
        }
        let mut presented = 0;
        for handle in handles {
            if handle.await.unwrap() {
                presented += 1;
            }
        }
        assert_eq!(presented, 1);
    }

    #[tokio::test]
    async fn test_concurrent_claims_resolve_once() {
        let machine = Arc::new(DeliveryStateMachine::new());
        machine.mark_fired("occ-race", AlarmKind::Main);
        let mut handles = Vec::new();
        for _ in 0..16 {
            let machine = machine.clone();
            handles.push(tokio::spawn(async move { machine.try_claim("occ-race") }));
        }
        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }
}
