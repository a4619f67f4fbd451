//! Property-based tests for the transcript reducer.

use proptest::prelude::*;
use streamchat_model::{ErrorKind, IncrementMode, Role};

use super::*;

#[derive(Clone, Debug)]
enum Op {
    Submit(String),
    /// `lag` is how many generations behind the current one the event is
    /// tagged with.
    Increment { lag: u64, text: String },
    Finish { lag: u64, failure: Option<ErrorKind> },
    Clear,
}

fn arb_error_kind() -> impl Strategy<Value = ErrorKind> {
    prop_oneof![
        Just(ErrorKind::Network),
        Just(ErrorKind::Provider),
        Just(ErrorKind::StreamInterrupted),
        Just(ErrorKind::InvalidResponse),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => "[a-z ]{0,8}".prop_map(Op::Submit),
        5 => (0u64..3, "[a-zA-Z ]{0,12}")
            .prop_map(|(lag, text)| Op::Increment { lag, text }),
        2 => (0u64..3, proptest::option::of(arb_error_kind()))
            .prop_map(|(lag, failure)| Op::Finish { lag, failure }),
        1 => Just(Op::Clear),
    ]
}

fn arb_mode() -> impl Strategy<Value = IncrementMode> {
    prop_oneof![Just(IncrementMode::Cumulative), Just(IncrementMode::Delta)]
}

fn apply(transcript: &mut Transcript, op: &Op) -> bool {
    let current = transcript.generation();
    match op {
        Op::Submit(text) => transcript.submit(text, "model").is_ok(),
        Op::Increment { lag, text } => {
            transcript.apply_increment(current.saturating_sub(*lag), text)
        }
        Op::Finish { lag, failure } => {
            let generation = current.saturating_sub(*lag);
            let outcome = match failure {
                Some(kind) => Err(StreamFailure::new(*kind, "failed")),
                None => Ok(()),
            };
            transcript.finish(generation, outcome)
        }
        Op::Clear => {
            transcript.clear();
            true
        }
    }
}

fn check_shape(transcript: &Transcript) -> Result<(), TestCaseError> {
    let messages = transcript.conversation().messages();

    // Every assistant message answers the user message right before it.
    for (idx, msg) in messages.iter().enumerate() {
        if msg.role() == Role::Assistant {
            prop_assert!(idx > 0);
            prop_assert_eq!(messages[idx - 1].role(), Role::User);
            prop_assert!(msg.model().is_some());
        } else {
            prop_assert!(msg.model().is_none());
        }
    }

    match transcript.stage() {
        Stage::Sending => {
            prop_assert_eq!(messages.last().map(Message::role), Some(Role::User));
        }
        Stage::Streaming => {
            prop_assert_eq!(
                messages.last().map(Message::role),
                Some(Role::Assistant)
            );
        }
        Stage::Idle | Stage::Errored => {}
    }

    let pending = transcript.status() == StreamStatus::Pending;
    prop_assert_eq!(pending, transcript.stage().is_in_flight());
    let errored = matches!(transcript.status(), StreamStatus::Error(_));
    prop_assert_eq!(errored, transcript.stage() == Stage::Errored);
    Ok(())
}

proptest! {
    #[test]
    fn shape_holds_after_any_sequence(
        mode in arb_mode(),
        ops in proptest::collection::vec(arb_op(), 0..40),
    ) {
        let mut transcript = Transcript::new(mode);
        for op in &ops {
            apply(&mut transcript, op);
            check_shape(&transcript)?;
        }
    }

    #[test]
    fn rejected_events_change_nothing(
        mode in arb_mode(),
        ops in proptest::collection::vec(arb_op(), 0..40),
    ) {
        let mut transcript = Transcript::new(mode);
        for op in &ops {
            let before = transcript.clone();
            if !apply(&mut transcript, op) {
                prop_assert_eq!(transcript.conversation(), before.conversation());
                prop_assert_eq!(transcript.stage(), before.stage());
                prop_assert_eq!(transcript.status(), before.status());
                prop_assert_eq!(transcript.generation(), before.generation());
            }
        }
    }

    #[test]
    fn increments_only_touch_the_reply(
        mode in arb_mode(),
        ops in proptest::collection::vec(arb_op(), 0..40),
    ) {
        let mut transcript = Transcript::new(mode);
        for op in &ops {
            let before = transcript.conversation().messages().to_vec();
            let accepted = apply(&mut transcript, op);
            let Op::Increment { text, .. } = op else {
                continue;
            };
            if !accepted {
                continue;
            }

            let after = transcript.conversation().messages();
            let (reply, earlier) = after.split_last().unwrap();
            prop_assert_eq!(reply.role(), Role::Assistant);
            prop_assert!(before.starts_with(earlier));
            if mode == IncrementMode::Cumulative {
                prop_assert_eq!(reply.content(), text.as_str());
            } else {
                prop_assert!(reply.content().ends_with(text.as_str()));
            }
        }
    }

    #[test]
    fn generation_never_goes_back(
        ops in proptest::collection::vec(arb_op(), 0..40),
    ) {
        let mut transcript = Transcript::default();
        let mut last = transcript.generation();
        for op in &ops {
            apply(&mut transcript, op);
            prop_assert!(transcript.generation() >= last);
            last = transcript.generation();
        }
    }
}
