//! P-PAGINATION (`spec.md` §8): for any `(total_records, page_size)`,
//! `fetch_all` yields exactly `total_records` items with no duplicates, and
//! makes exactly `ceil(total_records/page_size)` calls (1 when `total=0`).

use comradarr_core::fetch_all;
use comradarr_core::connector::Page;
use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn fetch_all_yields_exact_count_no_dupes_and_minimal_calls(
        total in 0u32..5_000,
        page_size in 1u32..500,
    ) {
        let calls = AtomicU32::new(0);
        let result = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fetch_all(
                |page, size| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        let start = (page - 1) * size;
                        let end = (start + size).min(total);
                        let records: Vec<u32> = (start..end).collect();
                        Ok(Page { records, total_records: total as usize })
                    }
                },
                page_size,
                1,
            ));

        let records = result.unwrap();
        prop_assert_eq!(records.len(), total as usize);

        let unique: std::collections::HashSet<_> = records.iter().collect();
        prop_assert_eq!(unique.len(), records.len());

        let expected_calls = if total == 0 { 1 } else { (total + page_size - 1) / page_size };
        prop_assert_eq!(calls.load(Ordering::SeqCst), expected_calls);
    }
}
