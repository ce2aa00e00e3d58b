/// Concurrent settle-all fan-out across upstream resources
///
/// Each resource is fetched independently and its outcome captured on its
/// own; one failing resource never fails the aggregate.

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::core::Entity;
use crate::pagination::{PageRequest, Paginator};
use crate::upstream::{MarketDataSource, Params, RawResourcePage, UpstreamError};
use super::snapshot::Snapshot;

#[derive(Debug, Clone)]
enum Plan {
    Single { path: &'static str, params: Params },
    Paginated(PageRequest),
}

/// One named resource in a multi-resource query
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub name: &'static str,
    plan: Plan,
}

impl ResourceRequest {
    /// One page, no pagination.
    pub fn single(name: &'static str, path: &'static str, params: Params) -> Self {
        Self {
            name,
            plan: Plan::Single { path, params },
        }
    }

    pub fn paginated(name: &'static str, request: PageRequest) -> Self {
        Self {
            name,
            plan: Plan::Paginated(request),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ResourceOutcome {
    Ready(Vec<Entity>),
    Failed(UpstreamError),
}

impl ResourceOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ResourceOutcome::Ready(_))
    }
}

/// Outcome of every resource in one aggregation, in request order
#[derive(Debug, Clone, Default)]
pub struct SettledResources {
    outcomes: Vec<(&'static str, ResourceOutcome)>,
}

impl SettledResources {
    pub fn outcome(&self, name: &str) -> Option<&ResourceOutcome> {
        self.outcomes.iter().find(|(n, _)| *n == name).map(|(_, o)| o)
    }

    /// Items of a resource; empty when it failed or was never requested.
    pub fn items(&self, name: &str) -> &[Entity] {
        match self.outcome(name) {
            Some(ResourceOutcome::Ready(items)) => items,
            _ => &[],
        }
    }

    /// The resource's primary record (index 0).
    pub fn first(&self, name: &str) -> Option<&Entity> {
        self.items(name).first()
    }

    pub fn snapshot(&self, name: &str) -> Snapshot<'_> {
        Snapshot::new(self.first(name))
    }

    pub fn failure(&self, name: &str) -> Option<&UpstreamError> {
        match self.outcome(name) {
            Some(ResourceOutcome::Failed(e)) => Some(e),
            _ => None,
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = (&'static str, &UpstreamError)> + '_ {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            ResourceOutcome::Failed(e) => Some((*name, e)),
            ResourceOutcome::Ready(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

pub struct Aggregator<'a> {
    source: &'a dyn MarketDataSource,
    paginator: Paginator<'a>,
}

impl<'a> Aggregator<'a> {
    pub fn new(source: &'a dyn MarketDataSource, max_pages: usize) -> Self {
        Self {
            source,
            paginator: Paginator::new(source, max_pages),
        }
    }

    pub fn paginator(&self) -> &Paginator<'a> {
        &self.paginator
    }

    /// Fetch every resource concurrently and wait for all of them to settle.
    pub async fn aggregate(&self, requests: Vec<ResourceRequest>) -> SettledResources {
        let outcomes = join_all(requests.into_iter().map(|request| self.settle(request))).await;

        let settled = SettledResources { outcomes };
        for (name, error) in settled.failed() {
            warn!(
                resource = name,
                status = ?error.status(),
                error = %error,
                "Resource unavailable; substituting defaults"
            );
        }
        debug!(resources = settled.len(), "Aggregation settled");
        settled
    }

    /// Single-resource fetch whose failure propagates to the caller.
    pub async fn fetch_one(&self, path: &str, params: &Params) -> Result<RawResourcePage, UpstreamError> {
        self.source.fetch_resource(path, params).await
    }

    async fn settle(&self, request: ResourceRequest) -> (&'static str, ResourceOutcome) {
        let result = match &request.plan {
            Plan::Single { path, params } => self
                .source
                .fetch_resource(path, params)
                .await
                .map(|page| page.items),
            Plan::Paginated(page_request) => self.paginator.fetch_all(page_request).await,
        };

        let outcome = match result {
            Ok(items) => ResourceOutcome::Ready(items),
            Err(e) => ResourceOutcome::Failed(e),
        };
        (request.name, outcome)
    }
}
