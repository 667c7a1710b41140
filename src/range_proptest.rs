//! Property-based tests for range expansion and compression.

#[cfg(test)]
mod proptest_tests {
    use crate::range::{compress, expand, expand_list, Sequence};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn numbered_names() -> impl Strategy<Value = Vec<String>> {
        (
            "[a-z]{1,3}",
            prop::collection::vec((0u64..300, 1usize..4), 1..40),
        )
            .prop_map(|(prefix, numbers)| {
                numbers
                    .into_iter()
                    .map(|(n, width)| format!("{}{:0width$}", prefix, n, width = width))
                    .collect()
            })
    }

    proptest! {
        /// Property: expanding a compressed list gives back the same set of names
        #[test]
        fn compress_then_expand_is_identity(names in numbered_names()) {
            let compressed = compress(&names);
            let expanded: BTreeSet<String> = expand_list(&compressed).unwrap().into_iter().collect();
            let original: BTreeSet<String> = names.into_iter().collect();
            prop_assert_eq!(expanded, original, "compressed form was {}", compressed);
        }

        /// Property: mixing several prefixes and plain names still round-trips
        #[test]
        fn compress_round_trips_mixed_lists(
            a in numbered_names(),
            b in numbered_names(),
            plain in prop::collection::vec("[a-z]{2,6}", 0..5),
        ) {
            let names: Vec<String> = a.into_iter().chain(plain).chain(b).collect();
            let compressed = compress(&names);
            let expanded: BTreeSet<String> = expand_list(&compressed).unwrap().into_iter().collect();
            let original: BTreeSet<String> = names.into_iter().collect();
            prop_assert_eq!(expanded, original, "compressed form was {}", compressed);
        }

        /// Property: a contiguous range compresses to a single bracket
        #[test]
        fn contiguous_range_compresses_to_one_run(start in 0u64..1000, len in 2u64..50) {
            let expr = format!("n[{}-{}]", start, start + len - 1);
            let names = expand(&expr).unwrap();
            prop_assert_eq!(names.len() as u64, len);
            prop_assert_eq!(compress(&names), expr);
        }

        /// Property: every expanded name is distinct
        #[test]
        fn expand_yields_distinct_names(start in 0u64..500, len in 1u64..200, step in 1u64..5) {
            let expr = format!("x[{}-{}/{}]", start, start + len - 1, step);
            let names = expand(&expr).unwrap();
            let unique: BTreeSet<&String> = names.iter().collect();
            prop_assert_eq!(unique.len(), names.len());
        }

        /// Property: the sequence advances by exactly one per call
        #[test]
        fn sequence_is_consecutive(base in 0u64..200, count in 1usize..50) {
            let mut seq = Sequence::new();
            for i in 0..count {
                let expanded = seq.expand(&format!("host[{}]", base)).unwrap();
                prop_assert_eq!(expanded, format!("host{}", base + i as u64));
            }
            prop_assert_eq!(seq.current(), count as u64);
        }
    }
}
