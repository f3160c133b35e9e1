//! Authorized scatter-gather listing.
//!
//! Resolves the namespaces a caller may read, queries each one, skips
//! namespaces that answer `Forbidden` and concatenates the rest. Any other
//! per-namespace error fails the whole listing. Namespaces are queried
//! concurrently but results are concatenated in namespace-name order.

use std::future::Future;

use futures::{StreamExt, TryStreamExt, stream};
use svcplane_core::auth::AuthInfo;
use svcplane_core::context::RequestContext;
use svcplane_core::error::{PlaneError, PlaneResult};
use svcplane_core::predicate::{Predicate, empty_or_contains};
use svcplane_core::repository::NamespacePermissions;
use tracing::debug;

pub struct ScatterGatherLister<N> {
    permissions: N,
    max_concurrency: usize,
}

impl<N: NamespacePermissions> ScatterGatherLister<N> {
    pub fn new(permissions: N, max_concurrency: usize) -> Self {
        Self {
            permissions,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Namespaces `auth` may read, sorted, de-duplicated and narrowed to
    /// `namespace_filter` (empty means no narrowing).
    pub async fn namespaces(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        namespace_filter: &[String],
    ) -> PlaneResult<Vec<String>> {
        let mut namespaces = ctx.run(self.permissions.authorized_namespaces(auth)).await?;
        namespaces.sort();
        namespaces.dedup();
        namespaces.retain(|ns| empty_or_contains(namespace_filter, ns));
        Ok(namespaces)
    }

    /// Run `query` once per readable namespace and keep the items matching
    /// `predicate`.
    pub async fn list<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        auth: &AuthInfo,
        namespace_filter: &[String],
        predicate: &Predicate<T>,
        query: F,
    ) -> PlaneResult<Vec<T>>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = PlaneResult<Vec<T>>>,
    {
        let namespaces = self.namespaces(ctx, auth, namespace_filter).await?;

        let per_namespace: Vec<Vec<T>> = stream::iter(namespaces)
            .map(|namespace| {
                let fetched = ctx.run(query(namespace.clone()));
                async move {
                    match fetched.await {
                        Err(PlaneError::Forbidden { .. }) => {
                            debug!(namespace = %namespace, "Skipping namespace without access");
                            Ok(Vec::new())
                        }
                        other => other,
                    }
                }
            })
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let items = per_namespace.into_iter().flatten().collect();
        Ok(predicate.filter(items))
    }
}
