//! Property-based tests for the error classifier.

use flashgen_llm::{classify, ErrorKind, RawFailure};
use proptest::prelude::*;

fn arb_raw_failure() -> impl Strategy<Value = RawFailure> {
    prop_oneof![
        ".{0,40}".prop_map(RawFailure::InvalidInput),
        ".{0,40}".prop_map(RawFailure::Schema),
        ".{0,40}".prop_map(RawFailure::Parse),
        (100u16..600, ".{0,40}").prop_map(|(status, message)| RawFailure::Status { status, message }),
        ".{0,40}".prop_map(RawFailure::Transport),
    ]
}

proptest! {
    #[test]
    fn classification_is_pure(raw in arb_raw_failure()) {
        let first = classify(&raw);
        let second = classify(&raw.clone());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.raw(), &raw);
        prop_assert_eq!(first.message(), raw.to_string());
    }

    #[test]
    fn only_throttling_and_server_errors_retry(raw in arb_raw_failure()) {
        let c = classify(&raw);
        if c.retryable() {
            prop_assert!(matches!(c.kind(), ErrorKind::RateLimit | ErrorKind::Unknown));
            let is_retry_status = matches!(raw, RawFailure::Status { status, .. } if status == 429 || (500..600).contains(&status));
            prop_assert!(is_retry_status);
        }
    }

    #[test]
    fn client_errors_never_retry(status in 400u16..500, message in "[a-z ]{0,30}") {
        prop_assume!(status != 429);
        let c = classify(&RawFailure::Status { status, message });
        prop_assert!(!c.retryable());
    }

    #[test]
    fn server_errors_always_retry(status in 500u16..600, message in "[a-z ]{0,30}") {
        // A message naming a parse problem is a parsing error, not a transient one.
        prop_assume!(!message.contains("parse") && !message.contains("format"));
        let c = classify(&RawFailure::Status { status, message });
        prop_assert_eq!(c.kind(), ErrorKind::Unknown);
        prop_assert!(c.retryable());
    }

    #[test]
    fn validation_wins_over_message_content(message in ".{0,40}") {
        let c = classify(&RawFailure::Schema(format!("parse {message}")));
        prop_assert_eq!(c.kind(), ErrorKind::Validation);
    }
}

#[test]
fn details_carry_the_raw_failure() {
    let c = classify(&RawFailure::Status {
        status: 502,
        message: "bad gateway".into(),
    });
    let json = serde_json::to_value(&c).expect("serialize");
    assert_eq!(json["type"], "unknown");
    assert_eq!(json["retryable"], true);
    assert_eq!(json["details"]["detail"]["status"], 502);
}
