// Test-specific lint overrides: property tests use unwrap/expect freely.
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Model-based property test for the name registry.
//!
//! Random sequences of registrations and teardowns are applied both to a
//! [`Registry`] and to a plain `HashMap` model of which session owns each
//! name. After every step the registry's key set and owners must match the
//! model exactly, including after name takeovers.

use std::collections::HashMap;

use linechat_relay::registry::{Registry, SessionHandle, SessionId};
use linechat_relay::sink::Sink;
use proptest::prelude::*;

const NAMES: [&str; 4] = ["alice", "bob", "carol", "A"];

#[derive(Debug, Clone)]
enum Op {
    /// A new session registers `NAMES[i]`.
    Register(usize),
    /// The `n`-th session ever created tears down.
    Teardown(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..NAMES.len()).prop_map(Op::Register),
        (0..32usize).prop_map(Op::Teardown),
    ]
}

proptest! {
    #[test]
    fn registry_matches_owner_model(ops in prop::collection::vec(arb_op(), 1..64)) {
        let registry = Registry::new();
        let mut model: HashMap<String, SessionId> = HashMap::new();
        let mut sessions: Vec<(String, SessionId)> = Vec::new();
        let mut receivers = Vec::new();

        for op in ops {
            match op {
                Op::Register(i) => {
                    let name = NAMES[i].to_string();
                    let (sink, rx) = Sink::channel(1);
                    receivers.push(rx);
                    let id = SessionId::new();
                    let previous = registry.register(&name, SessionHandle::new(id, sink));

                    prop_assert_eq!(previous.map(|h| h.id()), model.get(&name).copied());
                    model.insert(name.clone(), id);
                    sessions.push((name, id));
                }
                Op::Teardown(n) => {
                    let Some((name, id)) = sessions.get(n).cloned() else { continue };
                    let removed = registry.unregister(&name, id);
                    let owned = model.get(&name) == Some(&id);
                    prop_assert_eq!(removed, owned);
                    if owned {
                        model.remove(&name);
                    }
                }
            }

            let mut expected: Vec<_> = model.keys().cloned().collect();
            expected.sort();
            prop_assert_eq!(registry.names(), expected);
            for (name, id) in &model {
                prop_assert_eq!(registry.owner(name), Some(*id));
            }
        }
    }
}
