//! Push normalization properties.
//!
//! Any push body yields exactly one well-formed notification: parsed payloads
//! are normalized, anything else produces the fallback.

use proptest::prelude::*;

use flatscout_worker::events::PushEvent;
use flatscout_worker::push::{prepare, PushOutcome};
use flatscout_worker::WorkerConfig;

fn arb_priority() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        Just("high".to_string()),
        Just("urgent".to_string()),
        "[a-z]{0,8}",
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 1..256)) {
        let config = WorkerConfig::default();
        let outcome = prepare(&PushEvent::new(Some(bytes)), &config);
        let filled = match outcome {
            PushOutcome::Shown { title, options } | PushOutcome::Fallback { title, options } => {
                !title.is_empty() && !options.body.is_empty() && !options.tag.is_empty()
            }
            PushOutcome::Ignored => false,
        };
        prop_assert!(filled);
    }

    #[test]
    fn interaction_follows_priority(
        title in prop::option::of("[A-Za-z ]{0,20}"),
        body in prop::option::of("[A-Za-z ]{0,40}"),
        priority in arb_priority(),
    ) {
        let config = WorkerConfig::default();
        let payload = serde_json::json!({ "title": title, "body": body, "priority": priority });
        let outcome = prepare(&PushEvent::with_text(&payload.to_string()), &config);

        let PushOutcome::Shown { title: shown_title, options } = outcome else {
            return Err(TestCaseError::fail("valid JSON must not fall back"));
        };

        let urgent = priority.as_deref() == Some("urgent");
        let interactive = urgent || priority.as_deref() == Some("high");
        prop_assert_eq!(options.require_interaction, interactive);
        if urgent {
            prop_assert_eq!(&options.vibrate, &config.notifications.urgent_vibration);
        } else {
            prop_assert_eq!(&options.vibrate, &config.notifications.default_vibration);
        }
        prop_assert!(!shown_title.is_empty());
        prop_assert!(!options.body.is_empty());
    }
}
