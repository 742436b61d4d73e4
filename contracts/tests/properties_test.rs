//! Property tests for the tip registry.
//!
//! Random operation sequences against a registry wired to an in-memory
//! bank, checking conservation of value and the registry invariants after
//! every step.

use std::rc::Rc;

use proptest::prelude::*;
use tipjar_contracts::tip_registry::{
    normalize, InMemoryValueTransfer, RegistryError, TipRegistry,
};
use tipjar_protocol::clock::ManualClock;
use tipjar_protocol::config::{split_fee, Amount, RegistryConfig, MIN_TIP, UNIT};
use tipjar_protocol::identity::Address;

const NAMES: &[&str] = &["ember", "EMBER", "clawd", "nova", "agent-7", "x_y"];

#[derive(Debug, Clone)]
enum Op {
    Register { name: usize, who: usize },
    Tip { name: usize, who: usize, amount: Amount },
    Withdraw { who: usize },
    WithdrawAmount { who: usize, amount: Amount },
    UpdateController { who: usize, to: usize },
    ToggleSink,
}

fn party(i: usize) -> Address {
    Address::derive(&format!("party-{}", i))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let who = 0usize..5;
    let name = 0usize..NAMES.len();
    let amount = MIN_TIP..(5 * UNIT);
    prop_oneof![
        (name.clone(), who.clone()).prop_map(|(name, who)| Op::Register { name, who }),
        (name, who.clone(), amount.clone())
            .prop_map(|(name, who, amount)| Op::Tip { name, who, amount }),
        who.clone().prop_map(|who| Op::Withdraw { who }),
        (who.clone(), 0..(3 * UNIT))
            .prop_map(|(who, amount)| Op::WithdrawAmount { who, amount }),
        (who.clone(), who).prop_map(|(who, to)| Op::UpdateController { who, to }),
        Just(Op::ToggleSink),
    ]
}

proptest! {
    #[test]
    fn fee_plus_net_is_amount(amount in MIN_TIP..Amount::MAX / 10_000) {
        let (fee, net) = split_fee(amount).unwrap();
        prop_assert_eq!(fee + net, amount);
        prop_assert_eq!(fee, amount * 200 / 10_000);
    }

    #[test]
    fn self_tip_rejected_for_any_amount(amount in MIN_TIP..=Amount::MAX) {
        let registry = TipRegistry::new(
            &RegistryConfig::new(Address::derive("owner"), Address::derive("sink")),
            Box::new(ManualClock::at_unix(0)),
            Box::new(InMemoryValueTransfer::new()),
        ).unwrap();
        registry.register("ember", party(0)).unwrap();

        prop_assert_eq!(
            registry.tip("ember", party(0), amount),
            Err(RegistryError::CannotTipSelf)
        );
        prop_assert_eq!(registry.custodied(), 0);
        prop_assert_eq!(registry.total_tipped(), 0);
    }

    #[test]
    fn normalization_is_idempotent(raw in "[A-Za-z0-9_-]{1,32}") {
        let once = normalize(&raw).unwrap();
        prop_assert_eq!(normalize(&once).unwrap(), once.clone());
        prop_assert_eq!(once, raw.to_ascii_lowercase());
    }

    #[test]
    fn anything_outside_charset_is_rejected(
        prefix in "[a-z]{0,8}",
        bad in "[^A-Za-z0-9_-]",
    ) {
        let raw = format!("{}{}", prefix, bad);
        prop_assert!(normalize(&raw).is_err());
    }

    #[test]
    fn tip_credits_net_plus_refunded_fee(amount in MIN_TIP..(1_000 * UNIT), sink_up in any::<bool>()) {
        let bank = Rc::new(InMemoryValueTransfer::new());
        let sink = Address::derive("sink");
        if !sink_up {
            bank.reject(sink, "down");
        }
        let registry = TipRegistry::new(
            &RegistryConfig::new(Address::derive("owner"), sink),
            Box::new(ManualClock::at_unix(0)),
            Box::new(Rc::clone(&bank)),
        ).unwrap();
        registry.register("ember", party(0)).unwrap();

        let receipt = registry.tip("ember", party(1), amount).unwrap();
        let balance = registry.resolve("ember").unwrap().balance;
        prop_assert_eq!(balance + bank.received(sink), amount);
        prop_assert_eq!(receipt.net_amount + receipt.fee, amount);
        prop_assert_eq!(receipt.fee_forwarded, sink_up);
    }

    #[test]
    fn value_is_conserved(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let bank = Rc::new(InMemoryValueTransfer::new());
        let sink = Address::derive("sink");
        let registry = TipRegistry::new(
            &RegistryConfig::new(Address::derive("owner"), sink),
            Box::new(ManualClock::at_unix(0)),
            Box::new(Rc::clone(&bank)),
        ).unwrap();
        let mut sink_up = true;

        for op in ops {
            let _ = match op {
                Op::Register { name, who } => registry.register(NAMES[name], party(who)).map(|_| ()),
                Op::Tip { name, who, amount } => registry.tip(NAMES[name], party(who), amount).map(|_| ()),
                Op::Withdraw { who } => registry.withdraw(party(who)).map(|_| ()),
                Op::WithdrawAmount { who, amount } => registry.withdraw_amount(party(who), amount).map(|_| ()),
                Op::UpdateController { who, to } => registry.update_controller(party(who), party(to)),
                Op::ToggleSink => {
                    sink_up = !sink_up;
                    if sink_up { bank.accept(sink) } else { bank.reject(sink, "down") }
                    Ok(())
                }
            };

            let state = registry.snapshot();
            prop_assert!(state.verify_integrity().is_ok(), "{:?}", state.verify_integrity());

            // Everything ever tipped is either still in custody or has left
            // through the bank (fees to the sink, withdrawals to controllers).
            prop_assert_eq!(
                registry.custodied() + bank.total_delivered(),
                registry.total_tipped()
            );
            prop_assert_eq!(bank.received(sink), registry.total_fees_collected());
        }
    }
}
