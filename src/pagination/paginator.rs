/// Offset/limit pagination over one upstream resource
///
/// Pages are fetched sequentially: whether another page is requested depends
/// on the shape of the previous one.

use std::collections::HashSet;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::Entity;
use crate::upstream::{MarketDataSource, Params, UpstreamError};

/// When to stop requesting pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Continue only while `pagination.has_next` is true and the page is non-empty.
    HasNextFlag,
    /// Continue only while pages come back full.
    ShortPage,
}

/// What to do when a page fetch fails mid-pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop and keep what has been accumulated.
    BestEffort,
    /// Propagate the error; accumulated pages are dropped.
    FailFast,
}

/// Identity used to deduplicate entities across page boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKey {
    None,
    Field(&'static str),
    Fields(&'static [&'static str]),
}

impl IdentityKey {
    /// Key for `entity`, or `None` when it lacks the identifying fields.
    pub fn key_of(&self, entity: &Entity) -> Option<String> {
        match self {
            IdentityKey::None => None,
            IdentityKey::Field(field) => field_key(entity, field),
            IdentityKey::Fields(fields) => {
                let parts = fields
                    .iter()
                    .map(|field| field_key(entity, field))
                    .collect::<Option<Vec<_>>>()?;
                Some(parts.join("\u{1f}"))
            }
        }
    }
}

fn field_key(entity: &Entity, field: &str) -> Option<String> {
    match entity.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Description of one paginated resource fetch
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub path: &'static str,
    pub params: Params,
    pub page_size: usize,
    pub termination: Termination,
    pub failure_policy: FailurePolicy,
    pub identity: IdentityKey,
}

impl PageRequest {
    pub fn new(path: &'static str, params: Params, page_size: usize) -> Self {
        Self {
            path,
            params,
            page_size: page_size.max(1),
            termination: Termination::ShortPage,
            failure_policy: FailurePolicy::FailFast,
            identity: IdentityKey::None,
        }
    }

    pub fn terminating_on(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn identified_by(mut self, identity: IdentityKey) -> Self {
        self.identity = identity;
        self
    }
}

/// Entities gathered by one pagination run, unique on the identity key
#[derive(Debug, Default)]
pub struct AccumulatedDataset {
    items: Vec<Entity>,
    seen: HashSet<String>,
}

impl AccumulatedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page, skipping entities already seen. Returns how many were kept.
    pub fn merge(&mut self, page: Vec<Entity>, identity: IdentityKey) -> usize {
        let before = self.items.len();
        for entity in page {
            match identity.key_of(&entity) {
                Some(key) => {
                    if self.seen.insert(key) {
                        self.items.push(entity);
                    }
                }
                None => self.items.push(entity),
            }
        }
        self.items.len() - before
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<Entity> {
        self.items
    }
}

pub struct Paginator<'a> {
    source: &'a dyn MarketDataSource,
    max_pages: usize,
}

impl<'a> Paginator<'a> {
    pub fn new(source: &'a dyn MarketDataSource, max_pages: usize) -> Self {
        Self {
            source,
            max_pages: max_pages.max(1),
        }
    }

    pub async fn fetch_all(&self, request: &PageRequest) -> Result<Vec<Entity>, UpstreamError> {
        let mut dataset = AccumulatedDataset::new();
        let mut offset = 0usize;
        let mut pages = 0usize;

        loop {
            if pages >= self.max_pages {
                warn!(
                    path = request.path,
                    pages,
                    accumulated = dataset.len(),
                    "Page ceiling reached; stopping pagination"
                );
                break;
            }

            let mut params = request.params.clone();
            params.set("offset", offset);
            params.set("limit", request.page_size);

            let page = match self.source.fetch_resource(request.path, &params).await {
                Ok(page) => page,
                Err(e) => match request.failure_policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::BestEffort => {
                        warn!(
                            path = request.path,
                            offset,
                            accumulated = dataset.len(),
                            error = %e,
                            "Page fetch failed; keeping partial results"
                        );
                        break;
                    }
                },
            };
            pages += 1;

            let page_len = page.len();
            let has_next = page.has_next;
            let kept = dataset.merge(page.items, request.identity);
            debug!(path = request.path, offset, page_len, kept, "Fetched page");

            let more = page_len > 0
                && match request.termination {
                    Termination::HasNextFlag => has_next == Some(true),
                    Termination::ShortPage => page_len >= request.page_size,
                };
            if !more {
                break;
            }
            offset += request.page_size;
        }

        debug!(path = request.path, pages, total = dataset.len(), "Pagination complete");
        Ok(dataset.into_items())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{entities, page, ScriptedUpstream};
    use serde_json::json;

    const PATH: &str = "nft/marketplace/traders";

    fn sized_pages(sizes: Vec<usize>) -> ScriptedUpstream {
        ScriptedUpstream::new(move |_, params| {
            let offset: usize = params.get("offset").unwrap().parse().unwrap();
            let index = offset / 30;
            let size = sizes.get(index).copied().unwrap_or(0);
            Ok(page(entities(offset, size), None))
        })
    }

    #[tokio::test]
    async fn test_short_page_terminates_after_three_calls() {
        let upstream = sized_pages(vec![30, 30, 17]);
        let paginator = Paginator::new(&upstream, 50);
        let request = PageRequest::new(PATH, Params::new().with("blockchain", "ethereum"), 30)
            .identified_by(IdentityKey::Field("id"));

        let items = paginator.fetch_all(&request).await.unwrap();
        assert_eq!(items.len(), 77);
        assert_eq!(upstream.call_count(), 3);

        let offsets: Vec<String> = upstream
            .calls()
            .iter()
            .map(|(_, p)| p.get("offset").unwrap().to_string())
            .collect();
        assert_eq!(offsets, vec!["0", "30", "60"]);
        assert!(upstream.calls().iter().all(|(_, p)| p.get("limit") == Some("30")));
    }

    #[tokio::test]
    async fn test_empty_first_page_stops_immediately() {
        let upstream = sized_pages(vec![]);
        let paginator = Paginator::new(&upstream, 50);
        let request = PageRequest::new(PATH, Params::new(), 30);

        let items = paginator.fetch_all(&request).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_across_pages_are_kept_once() {
        let upstream = ScriptedUpstream::new(|_, params| match params.get("offset") {
            Some("0") => Ok(page(
                vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})],
                None,
            )),
            Some("3") => Ok(page(vec![json!({"id": "c"}), json!({"id": "d"})], None)),
            _ => Ok(page(vec![], None)),
        });
        let paginator = Paginator::new(&upstream, 50);
        let request = PageRequest::new(PATH, Params::new(), 3).identified_by(IdentityKey::Field("id"));

        let items = paginator.fetch_all(&request).await.unwrap();
        let ids: Vec<&str> = items.iter().map(|e| e["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_has_next_flag_drives_termination() {
        let upstream = ScriptedUpstream::new(|_, params| {
            let offset: usize = params.get("offset").unwrap().parse().unwrap();
            // Full pages, but the flag says stop after the second
            Ok(page(entities(offset, 10), Some(offset < 10)))
        });
        let paginator = Paginator::new(&upstream, 50);
        let request = PageRequest::new(PATH, Params::new(), 10).terminating_on(Termination::HasNextFlag);

        let items = paginator.fetch_all(&request).await.unwrap();
        assert_eq!(items.len(), 20);
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_has_next_without_flag_stops() {
        let upstream = ScriptedUpstream::new(|_, params| {
            let offset: usize = params.get("offset").unwrap().parse().unwrap();
            Ok(page(entities(offset, 10), None))
        });
        let paginator = Paginator::new(&upstream, 50);
        let request = PageRequest::new(PATH, Params::new(), 10).terminating_on(Termination::HasNextFlag);

        assert_eq!(paginator.fetch_all(&request).await.unwrap().len(), 10);
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn test_best_effort_keeps_partial_results() {
        let upstream = ScriptedUpstream::new(|path, params| match params.get("offset") {
            Some("0") => Ok(page(entities(0, 30), None)),
            _ => Err(ScriptedUpstream::remote_error(path, 503)),
        });
        let paginator = Paginator::new(&upstream, 50);
        let request = PageRequest::new(PATH, Params::new(), 30).on_failure(FailurePolicy::BestEffort);

        let items = paginator.fetch_all(&request).await.unwrap();
        assert_eq!(items.len(), 30);
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fail_fast_propagates() {
        let upstream = ScriptedUpstream::new(|path, params| match params.get("offset") {
            Some("0") => Ok(page(entities(0, 30), None)),
            _ => Err(ScriptedUpstream::remote_error(path, 429)),
        });
        let paginator = Paginator::new(&upstream, 50);
        let request = PageRequest::new(PATH, Params::new(), 30).on_failure(FailurePolicy::FailFast);

        let err = paginator.fetch_all(&request).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
    }

    #[tokio::test]
    async fn test_page_ceiling_bounds_endless_upstream() {
        let upstream = ScriptedUpstream::new(|_, params| {
            let offset: usize = params.get("offset").unwrap().parse().unwrap();
            Ok(page(entities(offset, 5), Some(true)))
        });
        let paginator = Paginator::new(&upstream, 4);
        let request = PageRequest::new(PATH, Params::new(), 5)
            .terminating_on(Termination::HasNextFlag)
            .identified_by(IdentityKey::Field("id"));

        let items = paginator.fetch_all(&request).await.unwrap();
        assert_eq!(upstream.call_count(), 4);
        assert_eq!(items.len(), 20);
    }

    #[test]
    fn test_composite_identity_requires_every_field() {
        let identity = IdentityKey::Fields(&["contract_address", "token_id"]);
        let full = json!({"contract_address": "0xabc", "token_id": 7}).as_object().cloned().unwrap();
        let partial = json!({"contract_address": "0xabc"}).as_object().cloned().unwrap();
        assert_eq!(identity.key_of(&full), Some("0xabc\u{1f}7".to_string()));
        assert_eq!(identity.key_of(&partial), None);

        let mut dataset = AccumulatedDataset::new();
        assert_eq!(dataset.merge(vec![full.clone(), partial.clone()], identity), 2);
        assert_eq!(dataset.merge(vec![full, partial], identity), 1);
        assert_eq!(dataset.len(), 3);
    }
}
