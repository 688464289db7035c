//! Pagination walker
//!
//! Listings come back one page at a time with a `Link` header pointing at
//! the next one. The walker requests page 0, then keeps following the
//! `rel="next"` relation until there is none, decoding each page before it
//! asks for the next. Pages are never requested concurrently: the next cursor
//! only exists once the previous response is in.

use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::StoreError;
use crate::transport::{Page, TransportError};

/// Page requested first
pub const FIRST_PAGE: u32 = 0;

// `[^_]` keeps `per_page=` from matching
static NEXT_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^_]page=(\d+)").expect("valid page regex"));

/// Page number of the `rel="next"` relation in a `Link` header
pub fn next_page(link: &str) -> Option<u32> {
    let next = link
        .split(',')
        .find(|relation| relation.contains(r#"rel="next""#))?;
    NEXT_PAGE
        .captures(next)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Walk every page, decoding items as they arrive
///
/// `decode` may drop an item by returning `Ok(None)`. The first error, from
/// either a page request or a decode, aborts the walk and the items gathered
/// so far are discarded.
pub async fn walk<T, U, F, Fut, D>(mut fetch: F, mut decode: D) -> Result<Vec<U>, StoreError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, TransportError>>,
    D: FnMut(T) -> Result<Option<U>, StoreError>,
{
    let mut items = Vec::new();
    let mut page = FIRST_PAGE;

    loop {
        let Page {
            items: page_items,
            link,
        } = fetch(page).await?;

        if page_items.is_empty() {
            break;
        }

        tracing::trace!("page {} yielded {} items", page, page_items.len());
        for item in page_items {
            if let Some(decoded) = decode(item)? {
                items.push(decoded);
            }
        }

        match link.as_deref().and_then(next_page) {
            Some(next) if next > page => page = next,
            Some(next) => {
                tracing::warn!("next page {} does not advance past {}, stopping", next, page);
                break;
            }
            None => break,
        }
    }

    Ok(items)
}

/// Walk every page, keeping items as they are
pub async fn walk_all<T, F, Fut>(fetch: F) -> Result<Vec<T>, StoreError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, TransportError>>,
{
    walk(fetch, |item| Ok(Some(item))).await
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;

    const GITHUB_LINK: &str = r#"<https://api.github.com/repositories/1/issues?milestone=1&per_page=100&page=2>; rel="next", <https://api.github.com/repositories/1/issues?milestone=1&per_page=100&page=5>; rel="last""#;

    #[test]
    fn test_next_page() {
        assert_eq!(next_page(GITHUB_LINK), Some(2));
        assert_eq!(
            next_page(r#"<https://x/issues?page=1&per_page=100>; rel="next""#),
            Some(1)
        );
    }

    #[test]
    fn test_next_page_ignores_other_relations() {
        let link = r#"<https://x/issues?per_page=100&page=1>; rel="first", <https://x/issues?per_page=100&page=3>; rel="prev""#;
        assert_eq!(next_page(link), None);
        assert_eq!(next_page(""), None);
        assert_eq!(
            next_page(r#"<https://x/issues?per_page=100>; rel="next""#),
            None
        );
    }

    fn link_to(page: u32) -> Option<String> {
        Some(format!(
            "<https://x/issues?per_page=100&page={}>; rel=\"next\"",
            page
        ))
    }

    #[tokio::test]
    async fn test_walk_follows_links() {
        let requested = RefCell::new(Vec::new());

        let items = walk_all(|page| {
            requested.borrow_mut().push(page);
            let result = match page {
                0 => Page::new(vec![1, 2, 3], link_to(2)),
                2 => Page::new(vec![4, 5, 6], link_to(3)),
                _ => Page::new(vec![7], None),
            };
            async move { Ok(result) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(*requested.borrow(), vec![0, 2, 3]);
    }

    #[tokio::test]
    async fn test_walk_stops_on_empty_page() {
        let calls = RefCell::new(0);

        let items: Vec<u32> = walk_all(|page| {
            *calls.borrow_mut() += 1;
            let result = if page == 0 {
                Page::new(vec![1], link_to(1))
            } else {
                Page::new(Vec::new(), link_to(page + 1))
            };
            async move { Ok(result) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1]);
        assert_eq!(*calls.borrow(), 2);
    }

    #[tokio::test]
    async fn test_walk_counts_trailing_empty_page() {
        let entries: Vec<u32> = (0..250).collect();
        let calls = RefCell::new(0);

        // Every page links onward; the page after the data is empty.
        let items: Vec<u32> = walk_all(|page| {
            *calls.borrow_mut() += 1;
            let index = if page == 0 { 0 } else { page as usize - 1 };
            let chunk: Vec<u32> = entries.iter().copied().skip(index * 100).take(100).collect();
            let next = if page == 0 { 2 } else { page + 1 };
            async move { Ok(Page::new(chunk, link_to(next))) }
        })
        .await
        .unwrap();

        assert_eq!(items, entries);
        assert_eq!(*calls.borrow(), 250usize.div_ceil(100) + 1);
    }

    #[tokio::test]
    async fn test_walk_stops_when_link_does_not_advance() {
        let calls = RefCell::new(0);

        let items: Vec<u32> = walk_all(|_| {
            *calls.borrow_mut() += 1;
            async move { Ok(Page::new(vec![1], link_to(0))) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1]);
        assert_eq!(*calls.borrow(), 1);
    }

    #[tokio::test]
    async fn test_walk_discards_partial_results_on_failure() {
        let result: Result<Vec<u32>, _> = walk_all(|page| {
            let result = if page == 0 {
                Ok(Page::new(vec![1, 2], link_to(1)))
            } else {
                Err(TransportError::Request("connection reset".into()))
            };
            async move { result }
        })
        .await;

        assert!(matches!(
            result,
            Err(StoreError::Transport(TransportError::Request(_)))
        ));
    }

    #[tokio::test]
    async fn test_walk_decode_can_drop_and_fail() {
        let kept = walk(
            |_| async { Ok(Page::new(vec![1, 2, 3, 4], None)) },
            |n: u32| Ok((n % 2 == 0).then_some(n * 10)),
        )
        .await
        .unwrap();
        assert_eq!(kept, vec![20, 40]);

        let failed: Result<Vec<u32>, _> = walk(
            |_| async { Ok(Page::new(vec![1, 2], None)) },
            |n: u32| {
                if n == 2 {
                    Err(StoreError::InvalidCollectionName("x".into()))
                } else {
                    Ok(Some(n))
                }
            },
        )
        .await;
        assert!(failed.is_err());
    }
}
