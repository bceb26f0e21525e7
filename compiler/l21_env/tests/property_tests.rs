//! Property-based tests for the store and scope-chain resolution.
//!
//! These use proptest to generate random stores and binding sequences and
//! check the contracts evaluators depend on:
//! 1. Every address handed out by `extend` reads back its value
//! 2. `set` is visible on legal addresses and invisible on illegal ones
//! 3. Resolution prefers inner frames, then newer global bindings

#![expect(clippy::unwrap_used, reason = "Tests can panic")]
#![allow(
    clippy::doc_markdown,
    clippy::redundant_closure_for_method_calls,
    reason = "Proptest macros generate code with these patterns"
)]

use l21_env::{make_extension, resolve, Address, Env, EnvStoreError, Session, Store, Value};
use proptest::prelude::*;

// -- Generation Strategies --

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::int),
        any::<bool>().prop_map(Value::bool),
        "[a-z]{0,8}".prop_map(|s| Value::string(s.as_str())),
        "[a-z]{1,8}".prop_map(|s| Value::symbol(s.as_str())),
        Just(Value::Void),
    ]
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-e]").unwrap()
}

fn store_from(values: &[Value]) -> (Store, Vec<Address>) {
    let mut store = Store::new();
    let addresses = values.iter().map(|v| store.extend(v.clone())).collect();
    (store, addresses)
}

proptest! {
    #[test]
    fn extend_then_apply_round_trips(
        values in prop::collection::vec(value_strategy(), 0..32),
        extra in value_strategy(),
    ) {
        let (mut store, addresses) = store_from(&values);
        let fresh = store.extend(extra.clone());

        prop_assert_eq!(store.apply(fresh), Ok(&extra));
        for (address, value) in addresses.iter().zip(&values) {
            prop_assert_eq!(store.apply(*address), Ok(value));
        }
    }

    #[test]
    fn set_then_apply_reads_new_value(
        values in prop::collection::vec(value_strategy(), 1..32),
        pick in any::<prop::sample::Index>(),
        replacement in value_strategy(),
    ) {
        let (mut store, addresses) = store_from(&values);
        let target = addresses[pick.index(addresses.len())];
        store.set(target, replacement.clone());

        prop_assert_eq!(store.apply(target), Ok(&replacement));
        prop_assert_eq!(store.len(), values.len());
    }

    #[test]
    fn set_out_of_range_changes_nothing(
        values in prop::collection::vec(value_strategy(), 0..16),
        offset in 0_i64..64,
        replacement in value_strategy(),
    ) {
        let (mut store, _) = store_from(&values);
        let before = store.clone();
        let size = i64::try_from(values.len()).unwrap();
        let illegal = Address::try_from(size + offset).unwrap();

        store.set(illegal, replacement);
        prop_assert_eq!(store, before);
    }

    #[test]
    fn apply_out_of_range_fails(
        values in prop::collection::vec(value_strategy(), 0..16),
        raw in -64_i64..128,
    ) {
        let (store, _) = store_from(&values);
        let size = i64::try_from(values.len()).unwrap();
        let result = Address::try_from(raw).and_then(|address| store.apply(address).cloned());

        if (0..size).contains(&raw) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(EnvStoreError::IllegalAddress { address: raw }));
        }
    }

    #[test]
    fn global_lookup_is_newest_binding(
        names in prop::collection::vec(name_strategy(), 1..24),
        probe in name_strategy(),
    ) {
        let mut session: Session = Session::new();
        let mut expected = None;
        for (i, name) in names.iter().enumerate() {
            let address = session.define_global(name.clone(), Value::int(i64::try_from(i).unwrap()));
            if *name == probe {
                expected = Some(address);
            }
        }

        let global = session.global_env();
        match expected {
            Some(address) => prop_assert_eq!(resolve(&global, &probe), Ok(address)),
            None => prop_assert!(resolve(&global, &probe).unwrap_err().is_var_not_found()),
        }
    }

    #[test]
    fn inner_frames_shadow_outer(
        frames in prop::collection::vec(prop::collection::vec(name_strategy(), 0..4), 0..6),
        globals in prop::collection::vec(name_strategy(), 0..4),
        probe in name_strategy(),
    ) {
        let mut store = Store::new();
        let root = Env::global();
        let mut global_hit = None;
        for name in &globals {
            let address = store.extend(Value::Void);
            root.global_frame().borrow_mut().add_binding(name.clone(), address);
            if *name == probe {
                global_hit = Some(address);
            }
        }

        // Innermost-first, first listed pairing within a frame.
        let mut env = root;
        let mut innermost_hit = None;
        for names in &frames {
            let addresses: Vec<Address> = names.iter().map(|_| store.extend(Value::Void)).collect();
            if let Some(pos) = names.iter().position(|n| *n == probe) {
                innermost_hit = Some(addresses[pos]);
            }
            env = make_extension(names.iter().cloned(), addresses, &env).unwrap();
        }

        match innermost_hit.or(global_hit) {
            Some(address) => prop_assert_eq!(resolve(&env, &probe), Ok(address)),
            None => prop_assert!(resolve(&env, &probe).is_err()),
        }
    }

    #[test]
    fn lookup_reflects_latest_assignment(
        initial in value_strategy(),
        updates in prop::collection::vec(value_strategy(), 0..8),
    ) {
        let mut session: Session = Session::new();
        session.define_global("x", initial.clone());
        let global = session.global_env();
        let frame = session.extend_env(["y"], [Value::Void], &global).unwrap();

        let mut current = initial;
        for update in updates {
            session.assign(&frame, "x", update.clone()).unwrap();
            current = update;
        }
        prop_assert_eq!(session.lookup(&global, "x"), Ok(&current));
        prop_assert_eq!(session.lookup(&frame, "x"), Ok(&current));
    }
}

#[test]
fn init_tracing_is_idempotent() {
    l21_env::init_tracing();
    l21_env::init_tracing();

    let mut session: Session = Session::new();
    session.define_global("x", Value::int(1));
    assert!(session.lookup(&session.global_env(), "x").is_ok());
}
