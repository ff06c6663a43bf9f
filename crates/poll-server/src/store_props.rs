
use proptest::prelude::*;
use crate::store::{parse_option_list, PollError, PollOps, PollStore};
use std::collections::HashSet;

fn label() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,12}"
}

proptest! {
    // Ids are fresh and reads return exactly what was created
    #[test]
    fn test_create_then_read(
        polls in prop::collection::vec(
            (label(), prop::collection::vec(label(), 2..8)),
            1..20,
        )
    ) {
        let store = PollStore::new();
        let mut seen = HashSet::new();

        for (question, options) in &polls {
            let id = store.create(question, options.clone()).unwrap();
            prop_assert!(seen.insert(id.clone()), "id {} reused", id);

            let poll = store.read(&id).unwrap();
            prop_assert_eq!(&poll.question, question);
            prop_assert_eq!(poll.options.len(), options.len());
            for (option, text) in poll.options.iter().zip(options) {
                prop_assert_eq!(&option.text, text);
                prop_assert_eq!(option.votes, 0);
            }
        }
    }

    // k votes on one option yield exactly k, others untouched
    #[test]
    fn test_vote_counts(
        option_count in 2..10usize,
        target_seed in any::<usize>(),
        k in 0..50u64,
    ) {
        let store = PollStore::new();
        let options: Vec<String> = (0..option_count).map(|i| format!("opt{}", i)).collect();
        let id = store.create("Q", options).unwrap();
        let target = target_seed % option_count;

        for _ in 0..k {
            store.vote(&id, target as i64).unwrap();
        }

        let poll = store.read(&id).unwrap();
        for (i, option) in poll.options.iter().enumerate() {
            let expected = if i == target { k } else { 0 };
            prop_assert_eq!(option.votes, expected, "option {}", i);
        }
    }

    // Every index outside [0, N) is rejected with the same error as a missing poll
    #[test]
    fn test_out_of_range_vote(
        option_count in 2..10usize,
        index in prop_oneof![i64::MIN..0i64, 10i64..i64::MAX],
    ) {
        let store = PollStore::new();
        let options: Vec<String> = (0..option_count).map(|i| format!("opt{}", i)).collect();
        let id = store.create("Q", options).unwrap();

        let err = store.vote(&id, index).unwrap_err();
        prop_assert_eq!(&err, &PollError::vote_target_not_found());
        prop_assert_eq!(err, store.vote("missing", 0).unwrap_err());

        let poll = store.read(&id).unwrap();
        prop_assert!(poll.options.iter().all(|o| o.votes == 0));
    }

    // Reads are idempotent between votes
    #[test]
    fn test_read_idempotent(votes in prop::collection::vec(0..3i64, 0..20)) {
        let store = PollStore::new();
        let id = store.create("Q", vec!["a".into(), "b".into(), "c".into()]).unwrap();
        for index in votes {
            store.vote(&id, index).unwrap();
        }
        prop_assert_eq!(store.read(&id).unwrap(), store.read(&id).unwrap());
    }

    // Normalized entries are trimmed and never empty
    #[test]
    fn test_option_list_normalization(raw in "[a-z ,]{0,40}") {
        let parsed = parse_option_list(&raw);
        for entry in &parsed {
            prop_assert!(!entry.is_empty());
            prop_assert_eq!(entry.trim(), entry.as_str());
            prop_assert!(!entry.contains(','));
        }
        let expected = raw.split(',').filter(|s| !s.trim().is_empty()).count();
        prop_assert_eq!(parsed.len(), expected);
    }
}
