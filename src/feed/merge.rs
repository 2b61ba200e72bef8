use std::collections::HashMap;

use crate::item::Item;

/// Reconciles a freshly parsed item list against the previously held one.
///
/// - An incoming item whose identity key matches an existing item carries
///   the existing item forward, replacing `content`/`stripped_content`/
///   `updated` with the incoming values when the content differs or the
///   incoming `updated` is newer. `viewed` and `notified` always survive:
///   a content edit does not re-surface an already-seen item as new.
/// - An incoming item with no match is new; its flags start false.
/// - Existing items absent from `incoming` are retained as-is. A publisher
///   rotating entries out of its document does not delete local history;
///   callers wanting pruning must do it explicitly outside this engine.
/// - Duplicate identity keys within `incoming` collapse onto one entry
///   (later occurrences update the earlier one).
///
/// The result is sorted descending by `published` with a stable sort over
/// the existing-then-appended order, so ties keep existing-list order
/// first and incoming order after that, and undated items sort last.
///
/// Guarantees: no duplicate identity keys; result size is never below
/// `existing.len()`.
pub fn merge(existing: &[Item], incoming: Vec<Item>) -> Vec<Item> {
    let mut merged: Vec<Item> = existing.to_vec();
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(position, item)| (item.identity_key(), position))
        .collect();

    for item in incoming {
        let key = item.identity_key();
        match index.get(&key) {
            Some(&position) => {
                let held = &merged[position];
                let content_changed = item.content != held.content;
                let updated_is_newer = match (item.updated, held.updated) {
                    (Some(incoming_at), Some(held_at)) => incoming_at > held_at,
                    (Some(_), None) => true,
                    _ => false,
                };
                if content_changed || updated_is_newer {
                    let mut replacement = held.clone();
                    replacement.content = item.content;
                    replacement.stripped_content = item.stripped_content;
                    replacement.updated = item.updated;
                    merged[position] = replacement;
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(item);
            }
        }
    }

    // Stable descending sort; the comparator treats an absent published
    // date as earliest, which lands undated items at the tail
    merged.sort_by(|a, b| b.compare_by_published(a));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> Option<DateTime<Utc>> {
        Some(Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn linked(link: &str, published: Option<DateTime<Utc>>, content: &str) -> Item {
        Item {
            link: Some(link.to_string()),
            published,
            content: content.to_string(),
            stripped_content: content.to_string(),
            ..Item::default()
        }
    }

    #[test]
    fn test_edit_and_new_item_in_one_pass() {
        // existing: [{link:"a", T2, viewed}], incoming: [{a, T2, "X2"}, {b, T3, "Y"}]
        let existing = vec![Item {
            viewed: true,
            ..linked("a", at(200), "X1")
        }];
        let incoming = vec![linked("a", at(200), "X2"), linked("b", at(300), "Y")];

        let merged = merge(&existing, incoming);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].link.as_deref(), Some("b"));
        assert!(!merged[0].viewed);
        assert!(!merged[0].notified);
        assert_eq!(merged[1].link.as_deref(), Some("a"));
        assert_eq!(merged[1].content, "X2");
        assert!(merged[1].viewed);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![linked("a", at(100), "A"), linked("b", at(200), "B")];
        let incoming = vec![linked("b", at(200), "B"), linked("c", at(300), "C")];

        let once = merge(&existing, incoming.clone());
        let twice = merge(&once, incoming);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_flags_survive_content_change() {
        let existing = vec![Item {
            viewed: true,
            notified: true,
            ..linked("a", at(100), "old")
        }];
        let incoming = vec![linked("a", at(100), "edited")];

        let merged = merge(&existing, incoming);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content, "edited");
        assert_eq!(merged[0].stripped_content, "edited");
        assert!(merged[0].viewed);
        assert!(merged[0].notified);
    }

    #[test]
    fn test_unchanged_match_keeps_existing_item() {
        let existing = vec![Item {
            viewed: true,
            ..linked("a", at(100), "same")
        }];
        let incoming = vec![linked("a", at(100), "same")];

        let merged = merge(&existing, incoming);
        assert_eq!(merged, existing);
    }

    #[test]
    fn test_newer_updated_replaces_content_fields() {
        let existing = vec![Item {
            updated: at(100),
            notified: true,
            ..linked("a", at(50), "v1")
        }];
        let incoming = vec![Item {
            updated: at(200),
            ..linked("a", at(50), "v1")
        }];

        let merged = merge(&existing, incoming);
        assert_eq!(merged[0].updated, at(200));
        assert!(merged[0].notified);
    }

    #[test]
    fn test_removed_entries_are_retained() {
        let existing = vec![linked("gone", at(100), "old"), linked("kept", at(200), "K")];
        let incoming = vec![linked("kept", at(200), "K")];

        let merged = merge(&existing, incoming);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|i| i.link.as_deref() == Some("gone")));
    }

    #[test]
    fn test_new_items_start_unflagged() {
        let existing = vec![];
        let incoming = vec![linked("a", at(100), "A")];

        let merged = merge(&existing, incoming);
        assert!(!merged[0].viewed);
        assert!(!merged[0].notified);
    }

    #[test]
    fn test_undated_items_sort_last_in_stable_order() {
        let existing = vec![linked("u1", None, "1"), linked("u2", None, "2")];
        let incoming = vec![linked("dated", at(100), "D"), linked("u3", None, "3")];

        let merged = merge(&existing, incoming);

        assert_eq!(merged[0].link.as_deref(), Some("dated"));
        // Undated: existing order first, then incoming order
        assert_eq!(merged[1].link.as_deref(), Some("u1"));
        assert_eq!(merged[2].link.as_deref(), Some("u2"));
        assert_eq!(merged[3].link.as_deref(), Some("u3"));
    }

    #[test]
    fn test_fallback_identity_matches_across_refreshes() {
        // No link on either side; title + published is the identity
        let existing = vec![Item {
            title: "Same post".into(),
            published: at(100),
            viewed: true,
            ..Item::default()
        }];
        let incoming = vec![Item {
            title: "Same post".into(),
            published: at(100),
            content: "now with content".into(),
            stripped_content: "now with content".into(),
            ..Item::default()
        }];

        let merged = merge(&existing, incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content, "now with content");
        assert!(merged[0].viewed);
    }

    #[test]
    fn test_duplicate_keys_within_incoming_collapse() {
        let existing = vec![];
        let incoming = vec![linked("a", at(100), "first"), linked("a", at(100), "second")];

        let merged = merge(&existing, incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content, "second");
    }

    #[test]
    fn test_ties_keep_existing_before_incoming() {
        let existing = vec![linked("e", at(100), "E")];
        let incoming = vec![linked("i", at(100), "I")];

        let merged = merge(&existing, incoming);
        assert_eq!(merged[0].link.as_deref(), Some("e"));
        assert_eq!(merged[1].link.as_deref(), Some("i"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Small item generator: link drawn from a tiny pool to force key
        /// collisions, published from a tiny range to force ties.
        fn arb_item() -> impl Strategy<Value = Item> {
            (
                prop::option::of(prop::sample::select(vec!["a", "b", "c", "d"])),
                prop::option::of(0i64..5),
                "[a-z]{0,8}",
                any::<bool>(),
                any::<bool>(),
            )
                .prop_map(|(link, published, content, viewed, notified)| Item {
                    link: link.map(str::to_string),
                    published: published.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
                    stripped_content: content.clone(),
                    content,
                    viewed,
                    notified,
                    ..Item::default()
                })
        }

        fn dedup_by_key(items: Vec<Item>) -> Vec<Item> {
            // Property inputs must satisfy the existing-list invariant
            let mut seen = std::collections::HashSet::new();
            items
                .into_iter()
                .filter(|i| seen.insert(i.identity_key()))
                .collect()
        }

        proptest! {
            #[test]
            fn merged_list_is_sorted_descending(
                existing in prop::collection::vec(arb_item(), 0..8),
                incoming in prop::collection::vec(arb_item(), 0..8),
            ) {
                let existing = dedup_by_key(existing);
                let merged = merge(&existing, incoming);
                for pair in merged.windows(2) {
                    prop_assert!(pair[0].published >= pair[1].published);
                }
            }

            #[test]
            fn merged_keys_are_unique(
                existing in prop::collection::vec(arb_item(), 0..8),
                incoming in prop::collection::vec(arb_item(), 0..8),
            ) {
                let existing = dedup_by_key(existing);
                let merged = merge(&existing, incoming);
                let mut keys: Vec<String> = merged.iter().map(Item::identity_key).collect();
                keys.sort();
                keys.dedup();
                prop_assert_eq!(keys.len(), merged.len());
            }

            #[test]
            fn merge_never_shrinks_existing(
                existing in prop::collection::vec(arb_item(), 0..8),
                incoming in prop::collection::vec(arb_item(), 0..8),
            ) {
                let existing = dedup_by_key(existing);
                let merged = merge(&existing, incoming);
                prop_assert!(merged.len() >= existing.len());
            }

            #[test]
            fn merge_twice_equals_merge_once(
                existing in prop::collection::vec(arb_item(), 0..8),
                incoming in prop::collection::vec(arb_item(), 0..8),
            ) {
                let existing = dedup_by_key(existing);
                // Incoming items arrive from normalization with clean flags
                let incoming: Vec<Item> = incoming
                    .into_iter()
                    .map(|mut i| { i.viewed = false; i.notified = false; i })
                    .collect();
                let once = merge(&existing, incoming.clone());
                let twice = merge(&once, incoming);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
