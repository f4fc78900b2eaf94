//! Property-based tests for client line parsing.
//!
//! Uses proptest to verify:
//! 1. Any line not starting with `@` is relayed verbatim as public text.
//! 2. `@<target> <body>` always yields exactly that target and body.
//! 3. A marker with only a target is always malformed.
//! 4. Arbitrary input never panics the parser.

use linechat_proto::command::Command;
use proptest::prelude::*;

/// Display names as clients type them: no whitespace.
fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.-]{1,24}"
}

/// Message bodies: start with a non-space, may contain spaces later.
fn arb_body() -> impl Strategy<Value = String> {
    "[A-Za-z0-9!?.,][A-Za-z0-9!?.,@ ]{0,64}"
}

proptest! {
    #[test]
    fn non_marker_lines_are_public(line in "[^@][^\r\n]{0,80}") {
        prop_assert_eq!(Command::parse(&line), Command::Public(&line));
    }

    #[test]
    fn private_command_extracts_target_and_body(
        target in arb_name(),
        body in arb_body(),
        gap in " {1,3}",
    ) {
        let line = format!("@{target}{gap}{body}");
        prop_assert_eq!(
            Command::parse(&line),
            Command::Private { target: &target, body: &body }
        );
    }

    #[test]
    fn spaced_marker_extracts_target_and_body(target in arb_name(), body in arb_body()) {
        let line = format!("@ {target} {body}");
        prop_assert_eq!(
            Command::parse(&line),
            Command::Private { target: &target, body: &body }
        );
    }

    #[test]
    fn target_without_body_is_malformed(target in arb_name(), tail in " {0,4}") {
        let line = format!("@{target}{tail}");
        prop_assert_eq!(Command::parse(&line), Command::Malformed);
    }

    #[test]
    fn parse_never_panics(line in any::<String>()) {
        let _ = Command::parse(&line);
    }
}
