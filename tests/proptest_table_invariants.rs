//! Property-based invariant tests for the table controller.
//!
//! 1. Filtering yields an order-preserving subsequence of the dataset.
//! 2. Every kept record contains the search in a configured column.
//! 3. The empty search keeps everything.
//! 4. Filtering is idempotent.
//! 5. After a search or grouping change the selection sits at min(n - 1, 10).
//! 6. The highlight color never repeats across a selection change.
//! 7. Setting the search always lands on page 1.

use std::sync::Arc;

use ctv::color::{Palette, RandomColor};
use ctv::filter::{filter_indices, filter_records};
use ctv::paginator::GroupBy;
use ctv::record::Record;
use ctv::table::{AUTO_SELECT_INDEX, TableController};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn dataset_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(
        ("[a-cA-C]{0,5}", prop::option::of("[a-c]{0,3}")),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(name, code)| {
                let record = Record::new().with("name", name);
                match code {
                    Some(code) => record.with("code", code),
                    None => record,
                }
            })
            .collect()
    })
}

fn search_strategy() -> impl Strategy<Value = String> {
    "[a-cA-C]{0,2}"
}

fn columns() -> Vec<String> {
    vec!["name".to_string(), "code".to_string()]
}

fn controller(data: Vec<Record>, seed: u64) -> TableController {
    TableController::new(
        Arc::new(data),
        columns(),
        7,
        Box::new(RandomColor::seeded(Palette::default(), seed)),
    )
}

fn expected_position(n: usize) -> Option<usize> {
    n.checked_sub(1).map(|last| last.min(AUTO_SELECT_INDEX))
}

// ═════════════════════════════════════════════════════════════════════════
// 1-4. Filtering
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn filter_is_ordered_subsequence(data in dataset_strategy(), search in search_strategy()) {
        let hits = filter_indices(&data, &search, &columns());
        prop_assert!(hits.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(hits.iter().all(|&i| i < data.len()));
    }

    #[test]
    fn kept_records_contain_search(data in dataset_strategy(), search in search_strategy()) {
        let needle = search.to_lowercase();
        for record in filter_records(&data, &search, &columns()) {
            prop_assert!(
                columns().iter().any(|c| record.text(c).to_lowercase().contains(&needle)),
                "record {:?} does not contain {:?}", record, search
            );
        }
    }

    #[test]
    fn dropped_records_do_not_contain_search(data in dataset_strategy(), search in search_strategy()) {
        let hits = filter_indices(&data, &search, &columns());
        let needle = search.to_lowercase();
        for (idx, record) in data.iter().enumerate() {
            if !hits.contains(&idx) {
                prop_assert!(!columns().iter().any(|c| record.text(c).to_lowercase().contains(&needle)));
            }
        }
    }

    #[test]
    fn empty_search_keeps_all(data in dataset_strategy()) {
        prop_assert_eq!(filter_records(&data, "", &columns()), data);
    }

    #[test]
    fn filter_is_idempotent(data in dataset_strategy(), search in search_strategy()) {
        let once = filter_records(&data, &search, &columns());
        let twice = filter_records(&once, &search, &columns());
        prop_assert_eq!(once, twice);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-7. Controller rules
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn search_reselects_and_resets_page(
        data in dataset_strategy(),
        searches in prop::collection::vec(search_strategy(), 1..8),
        page in 1usize..10,
    ) {
        let mut table = controller(data, 11);
        for search in searches {
            table.jump_page(page);
            let previous = table.search().to_string();
            let before = table.selected_id();
            table.set_search(search.clone());
            prop_assert_eq!(table.page(), 1);
            if search != previous {
                prop_assert_eq!(table.selected_position(), expected_position(table.filtered_len()));
            } else {
                prop_assert_eq!(table.selected_id(), before);
            }
        }
    }

    #[test]
    fn grouping_reselects(data in dataset_strategy(), search in search_strategy()) {
        let mut table = controller(data, 12);
        table.set_search(search);
        if table.filtered_len() > 0 {
            table.select_position(0);
        }
        table.set_group(GroupBy::Continent);
        prop_assert_eq!(table.selected_position(), expected_position(table.filtered_len()));
        prop_assert!(table.page() <= table.max_page());
    }

    #[test]
    fn color_never_repeats_on_selection_change(
        data in dataset_strategy(),
        steps in prop::collection::vec((search_strategy(), any::<bool>()), 1..12),
        seed in any::<u64>(),
    ) {
        let mut table = controller(data, seed);
        for (search, next) in steps {
            let (id, color) = (table.selected_id(), table.color());
            table.set_search(search);
            if table.selected_id() != id {
                prop_assert_ne!(table.color(), color);
            }

            let (id, color) = (table.selected_id(), table.color());
            if next {
                table.select_next();
            } else {
                table.select_prev();
            }
            if table.selected_id() != id {
                prop_assert_ne!(table.color(), color);
            }
        }
    }

    #[test]
    fn page_data_is_a_slice_of_filtered(data in dataset_strategy(), search in search_strategy(), page in 1usize..8) {
        let mut table = controller(data, 13);
        table.set_search(search);
        table.jump_page(page);
        let filtered: Vec<&Record> = table.filtered_data().collect();
        let start = (table.page() - 1) * table.page_size();
        let page_records: Vec<&Record> = table.page_data().into_iter().map(|(_, r)| r).collect();
        prop_assert!(page_records.len() <= table.page_size());
        for (offset, record) in page_records.iter().enumerate() {
            prop_assert_eq!(*record, filtered[start + offset]);
        }
    }
}
