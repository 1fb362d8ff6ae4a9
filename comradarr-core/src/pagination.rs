//! Paginated upstream fetch, strict and lenient (`spec.md` §4.B, §7, §8 P-PAGINATION).

use std::future::Future;

use crate::connector::{LenientPage, Page};
use crate::error::{ComradarrError, UpstreamError};

/// Default page size used when callers don't have a stronger opinion.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Fetches every record of a paginated envelope.
///
/// Stops once `page * page_size >= total_records`. An empty response
/// (`total_records == 0`) makes exactly one call.
pub async fn fetch_all<T, F, Fut>(
    mut fetcher: F,
    page_size: u32,
    start_page: u32,
) -> Result<Vec<T>, UpstreamError>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, UpstreamError>>,
{
    let mut out = Vec::new();
    let mut page = start_page;
    loop {
        let response = fetcher(page, page_size).await?;
        let total = response.total_records;
        out.extend(response.records);
        if (page as usize) * (page_size as usize) >= total {
            break;
        }
        page += 1;
    }
    Ok(out)
}

/// Fetches every record of a paginated envelope, validating each raw record
/// against `validate`. Malformed records are skipped and counted rather than
/// aborting the fetch; if an entire non-empty page fails validation, the
/// fetch raises [`ComradarrError::SchemaMismatch`] (fatal for this call, left
/// to the retry policy by the caller).
pub async fn fetch_all_lenient<R, T, F, Fut, V>(
    mut fetcher: F,
    mut validate: V,
    page_size: u32,
    start_page: u32,
) -> Result<LenientPage<T>, ComradarrError>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<R>, UpstreamError>>,
    V: FnMut(R) -> Option<T>,
{
    let mut out = LenientPage::default();
    let mut page = start_page;
    loop {
        let response = fetcher(page, page_size)
            .await
            .map_err(|e| ComradarrError::Upstream(e))?;
        let total = response.total_records;
        let page_len = response.records.len();
        let mut valid_in_page = 0usize;
        for raw in response.records {
            match validate(raw) {
                Some(value) => {
                    out.records.push(value);
                    valid_in_page += 1;
                }
                None => out.skipped += 1,
            }
        }
        if page_len > 0 && valid_in_page == 0 {
            return Err(ComradarrError::SchemaMismatch);
        }
        if (page as usize) * (page_size as usize) >= total {
            break;
        }
        page += 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn page_of(records: Vec<u32>, total: usize) -> Page<u32> {
        Page { records, total_records: total }
    }

    #[tokio::test]
    async fn exact_page_count_for_even_division() {
        let calls = AtomicU32::new(0);
        let result = fetch_all(
            |page, page_size| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    let start = (page - 1) * page_size;
                    let records: Vec<u32> = (start..start + page_size).collect();
                    Ok(page_of(records, 2500))
                }
            },
            1000,
            1,
        )
        .await
        .unwrap();
        assert_eq!(result.len(), 2500);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_response_makes_one_call() {
        let calls = AtomicU32::new(0);
        let result = fetch_all::<u32, _, _>(
            |_page, _page_size| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(page_of(vec![], 0)) }
            },
            1000,
            1,
        )
        .await
        .unwrap();
        assert!(result.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lenient_mode_counts_and_skips_malformed_records() {
        let result = fetch_all_lenient(
            |_page, _page_size| async move { Ok(page_of(vec![1, 0, 2, 0, 3], 5)) },
            |raw: u32| if raw == 0 { None } else { Some(raw) },
            1000,
            1,
        )
        .await
        .unwrap();
        assert_eq!(result.records, vec![1, 2, 3]);
        assert_eq!(result.skipped, 2);
    }

    #[tokio::test]
    async fn all_records_failing_is_schema_mismatch() {
        let result = fetch_all_lenient(
            |_page, _page_size| async move { Ok(page_of(vec![0, 0, 0], 3)) },
            |raw: u32| if raw == 0 { None } else { Some(raw) },
            1000,
            1,
        )
        .await;
        assert!(matches!(result, Err(ComradarrError::SchemaMismatch)));
    }
}
