//! Integration tests for the tip registry.
//!
//! These tests walk handles through their whole life: registration, tips,
//! partial and full withdrawals, renames, controller changes, pauses, and
//! snapshot/restore, checking the registry's bookkeeping at every step.

use std::rc::Rc;

use chrono::Duration;
use tipjar_contracts::tip_registry::{
    AccountView, InMemoryValueTransfer, RegistryError, RegistryEvent, RegistryState, TipRegistry,
};
use tipjar_protocol::clock::{Clock, ManualClock};
use tipjar_protocol::config::{RegistryConfig, UNIT};
use tipjar_protocol::identity::Address;

/// Helper: a registry wired to an in-memory bank and a manual clock.
struct Harness {
    registry: TipRegistry,
    bank: Rc<InMemoryValueTransfer>,
    clock: Rc<ManualClock>,
}

fn harness() -> Harness {
    let bank = Rc::new(InMemoryValueTransfer::new());
    let clock = Rc::new(ManualClock::at_unix(1_735_689_600));
    let registry = TipRegistry::new(
        &RegistryConfig::new(owner(), sink()),
        Box::new(Rc::clone(&clock)),
        Box::new(Rc::clone(&bank)),
    )
    .unwrap();
    Harness {
        registry,
        bank,
        clock,
    }
}

fn owner() -> Address {
    Address::derive("owner")
}

fn sink() -> Address {
    Address::derive("fee-sink")
}

fn agent() -> Address {
    Address::derive("agent")
}

fn fan() -> Address {
    Address::derive("fan")
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn tip_one_unit_to_emberclawd() {
    let h = harness();
    h.registry.register("emberclawd", agent()).unwrap();
    h.registry.tip("emberclawd", fan(), UNIT).unwrap();

    let view = h.registry.resolve("emberclawd").unwrap();
    assert_eq!(view.balance, 980_000_000_000_000_000);
    assert_eq!(view.total_received, 980_000_000_000_000_000);
    assert_eq!(view.tip_count, 1);
    assert_eq!(h.bank.received(sink()), 20_000_000_000_000_000);
}

#[test]
fn partial_withdrawal_after_two_unit_tip() {
    let h = harness();
    h.registry.register("emberclawd", agent()).unwrap();
    h.registry.tip("emberclawd", fan(), 2 * UNIT).unwrap();

    let sent = h.registry.withdraw_amount(agent(), UNIT / 2).unwrap();
    assert_eq!(sent, UNIT / 2);
    assert_eq!(h.bank.received(agent()), UNIT / 2);

    let view = h.registry.resolve("emberclawd").unwrap();
    assert_eq!(view.balance, 1_460_000_000_000_000_000);
    // History is untouched by withdrawals.
    assert_eq!(view.total_received, 1_960_000_000_000_000_000);
    assert_eq!(h.registry.custodied(), view.balance);
}

#[test]
fn rename_carries_balance_and_frees_old_name() {
    let h = harness();
    h.registry.register("oldname", agent()).unwrap();
    h.registry.tip("oldname", fan(), UNIT).unwrap();
    h.registry.tip("oldname", fan(), UNIT).unwrap();
    let before = h.registry.resolve("oldname").unwrap();

    h.clock.advance(Duration::days(3));
    h.registry.register("newname", agent()).unwrap();

    assert_eq!(h.registry.resolve("oldname").unwrap(), AccountView::default());
    assert!(h.registry.is_name_available("oldname"));

    let after = h.registry.resolve("newname").unwrap();
    assert_eq!(after.controller, agent());
    assert_eq!(after.balance, before.balance);
    assert_eq!(after.total_received, before.total_received);
    assert_eq!(after.tip_count, 2);
    assert_eq!(after.registered_at, Some(h.clock.now()));

    // Renames are not new agents.
    assert_eq!(h.registry.total_agents(), 1);
    assert_eq!(h.registry.name_of(agent()).as_deref(), Some("newname"));
    assert!(matches!(
        h.registry.events().last(),
        Some(RegistryEvent::AgentUpdated { old_name, new_name, .. })
            if old_name == "oldname" && new_name == "newname"
    ));
}

#[test]
fn freed_name_can_be_claimed_by_someone_else() {
    let h = harness();
    h.registry.register("oldname", agent()).unwrap();
    h.registry.register("newname", agent()).unwrap();
    h.registry.register("OldName", fan()).unwrap();

    let view = h.registry.resolve("oldname").unwrap();
    assert_eq!(view.controller, fan());
    assert_eq!(view.balance, 0);
    assert_eq!(h.registry.total_agents(), 2);
}

#[test]
fn pause_then_unpause_restores_operation() {
    let h = harness();
    h.registry.register("emberclawd", agent()).unwrap();
    h.registry.pause(owner()).unwrap();

    assert_eq!(
        h.registry.register("second", fan()),
        Err(RegistryError::EnforcedPause)
    );
    assert_eq!(
        h.registry.tip("emberclawd", fan(), UNIT),
        Err(RegistryError::EnforcedPause)
    );
    assert_eq!(h.registry.withdraw(agent()), Err(RegistryError::EnforcedPause));

    h.registry.unpause(owner()).unwrap();
    h.registry.register("second", fan()).unwrap();
    h.registry.tip("emberclawd", fan(), UNIT).unwrap();
    assert!(h.registry.withdraw(agent()).is_ok());
}

#[test]
fn controller_handoff_keeps_history_with_name() {
    let h = harness();
    let new_key = Address::derive("agent-rotated-key");
    h.registry.register("emberclawd", agent()).unwrap();
    h.registry.tip("emberclawd", fan(), UNIT).unwrap();

    h.registry.update_controller(agent(), new_key).unwrap();
    h.registry.tip("emberclawd", fan(), UNIT).unwrap();

    let view = h.registry.resolve("emberclawd").unwrap();
    assert_eq!(view.controller, new_key);
    assert_eq!(view.tip_count, 2);
    assert_eq!(h.registry.withdraw(new_key).unwrap(), view.balance);

    // The old key is free to register a fresh handle.
    h.registry.register("agent-old-key", agent()).unwrap();
    assert_eq!(h.registry.total_agents(), 2);
}

#[test]
fn sink_change_redirects_fees() {
    let h = harness();
    let new_sink = Address::derive("treasury");
    h.registry.register("emberclawd", agent()).unwrap();
    h.registry.tip("emberclawd", fan(), UNIT).unwrap();
    h.registry.set_fee_recipient(owner(), new_sink).unwrap();
    h.registry.tip("emberclawd", fan(), UNIT).unwrap();

    assert_eq!(h.bank.received(sink()), UNIT / 50);
    assert_eq!(h.bank.received(new_sink), UNIT / 50);
    assert_eq!(h.registry.total_fees_collected(), UNIT / 25);
}

// ---------------------------------------------------------------------------
// Audit Log
// ---------------------------------------------------------------------------

#[test]
fn one_event_per_state_change() {
    let h = harness();
    h.registry.register("emberclawd", agent()).unwrap();
    h.registry.tip("emberclawd", fan(), UNIT).unwrap();
    h.registry.withdraw(agent()).unwrap();
    // Failures add nothing.
    let _ = h.registry.withdraw(agent());
    let _ = h.registry.tip("emberclawd", agent(), UNIT);

    let kinds: Vec<&str> = h.registry.events().iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec!["agent_registered", "fees_collected", "tipped", "withdrawn"]
    );
}

#[test]
fn drained_events_render_as_json_lines() {
    let h = harness();
    h.registry.register("emberclawd", agent()).unwrap();
    let lines: Vec<String> = h
        .registry
        .drain_events()
        .iter()
        .map(|e| e.to_json().unwrap())
        .collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("emberclawd"));
    assert!(h.registry.events().is_empty());
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[test]
fn snapshot_restore_round_trip() {
    let h = harness();
    h.registry.register("emberclawd", agent()).unwrap();
    h.registry.register("sidekick", fan()).unwrap();
    h.registry.tip("emberclawd", fan(), 3 * UNIT).unwrap();

    let bytes = h.registry.snapshot().encode().unwrap();
    let state = RegistryState::decode(&bytes).unwrap();
    let restored = TipRegistry::restore(
        state,
        Box::new(ManualClock::at_unix(1_735_689_600)),
        Box::new(InMemoryValueTransfer::new()),
    )
    .unwrap();

    assert_eq!(restored.state_root(), h.registry.state_root());
    assert_eq!(
        restored.resolve("emberclawd").unwrap(),
        h.registry.resolve("emberclawd").unwrap()
    );
    assert_eq!(restored.owner(), owner());
    assert!(restored.withdraw(agent()).is_ok());
}

#[test]
fn restore_rejects_tampered_state() {
    let h = harness();
    h.registry.register("emberclawd", agent()).unwrap();
    h.registry.tip("emberclawd", fan(), UNIT).unwrap();

    let json = serde_json::to_string(&h.registry.snapshot()).unwrap();
    // Inflate custody without a matching balance.
    let custodied = h.registry.custodied().to_string();
    let tampered = json.replace(
        &format!("\"custodied\":{}", custodied),
        "\"custodied\":1",
    );
    let state: RegistryState = serde_json::from_str(&tampered).unwrap();

    let result = TipRegistry::restore(
        state,
        Box::new(ManualClock::at_unix(0)),
        Box::new(InMemoryValueTransfer::new()),
    );
    assert!(matches!(result, Err(RegistryError::InvalidSnapshot(_))));
}
