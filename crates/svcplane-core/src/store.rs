//! Optimistic read-modify-write over versioned store records.
//!
//! Business logic is expressed as a pure `T -> T` transform; the retry
//! loop re-reads and re-applies it whenever a concurrent writer bumped the
//! record's version between our read and our write.

use std::future::Future;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::AuthInfo;
use crate::context::RequestContext;
use crate::error::{PlaneError, PlaneResult};
use crate::models::plan::ServicePlan;
use crate::models::process::Process;

/// Default number of write attempts before giving up.
pub const DEFAULT_PATCH_ATTEMPTS: u32 = 5;

/// A store record carrying a monotonically increasing version.
pub trait Versioned: Send + Sync {
    /// Table / kind name used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn resource_version(&self) -> u64;
}

impl Versioned for ServicePlan {
    const KIND: &'static str = "service_plan";

    fn id(&self) -> Uuid {
        self.id
    }

    fn resource_version(&self) -> u64 {
        self.resource_version
    }
}

impl Versioned for Process {
    const KIND: &'static str = "process";

    fn id(&self) -> Uuid {
        self.id
    }

    fn resource_version(&self) -> u64 {
        self.resource_version
    }
}

/// Store operations the retry helper is built on.
pub trait VersionedRepository<T: Versioned>: Send + Sync {
    fn fetch(
        &self,
        auth: &AuthInfo,
        namespace: &str,
        id: Uuid,
    ) -> impl Future<Output = PlaneResult<T>> + Send;

    /// Persist the mutable fields of `value` if the stored version still
    /// equals `value.resource_version()`, returning the stored result with
    /// its new version. Fails with [`PlaneError::Conflict`] otherwise.
    fn write_if_unchanged(
        &self,
        auth: &AuthInfo,
        value: T,
    ) -> impl Future<Output = PlaneResult<T>> + Send;
}

/// Apply `mutate` to the current version of a record and write it back,
/// retrying on conflicting concurrent writes up to `max_attempts` times.
pub async fn patch_with_retry<T, R, F>(
    ctx: &RequestContext,
    repo: &R,
    auth: &AuthInfo,
    namespace: &str,
    id: Uuid,
    max_attempts: u32,
    mutate: F,
) -> PlaneResult<T>
where
    T: Versioned,
    R: VersionedRepository<T>,
    F: Fn(T) -> T,
{
    let attempts = max_attempts.max(1);

    for attempt in 1..=attempts {
        let current = ctx.run(repo.fetch(auth, namespace, id)).await?;
        let next = mutate(current);

        match ctx.run(repo.write_if_unchanged(auth, next)).await {
            Ok(written) => return Ok(written),
            Err(PlaneError::Conflict { .. }) => {
                debug!(
                    kind = T::KIND,
                    %id,
                    attempt,
                    "Conflicting write, re-reading"
                );
            }
            Err(e) => return Err(e),
        }
    }

    warn!(kind = T::KIND, %id, attempts, "Optimistic write retries exhausted");
    Err(PlaneError::ConflictExhausted {
        entity: T::KIND.into(),
        id: id.to_string(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    struct Counter {
        id: Uuid,
        version: u64,
        value: u32,
    }

    impl Versioned for Counter {
        const KIND: &'static str = "counter";

        fn id(&self) -> Uuid {
            self.id
        }

        fn resource_version(&self) -> u64 {
            self.version
        }
    }

    /// In-memory store that simulates `conflicts` lost races before
    /// accepting writes.
    struct FakeStore {
        stored: Mutex<Counter>,
        conflicts: Mutex<u32>,
        writes: Mutex<u32>,
    }

    impl FakeStore {
        fn new(conflicts: u32) -> Self {
            Self {
                stored: Mutex::new(Counter {
                    id: Uuid::new_v4(),
                    version: 1,
                    value: 0,
                }),
                conflicts: Mutex::new(conflicts),
                writes: Mutex::new(0),
            }
        }

        fn id(&self) -> Uuid {
            self.stored.lock().unwrap().id
        }
    }

    impl VersionedRepository<Counter> for FakeStore {
        async fn fetch(&self, _auth: &AuthInfo, _ns: &str, _id: Uuid) -> PlaneResult<Counter> {
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn write_if_unchanged(&self, _auth: &AuthInfo, value: Counter) -> PlaneResult<Counter> {
            *self.writes.lock().unwrap() += 1;
            let mut conflicts = self.conflicts.lock().unwrap();
            let mut stored = self.stored.lock().unwrap();
            if *conflicts > 0 {
                *conflicts -= 1;
                // Someone else wrote in between.
                stored.version += 1;
                return Err(PlaneError::Conflict {
                    entity: "counter".into(),
                    id: value.id.to_string(),
                });
            }
            if stored.version != value.version {
                return Err(PlaneError::Conflict {
                    entity: "counter".into(),
                    id: value.id.to_string(),
                });
            }
            *stored = Counter {
                version: value.version + 1,
                ..value
            };
            Ok(stored.clone())
        }
    }

    #[tokio::test]
    async fn applies_transform_once_without_conflicts() {
        let store = FakeStore::new(0);
        let ctx = RequestContext::background();
        let written = patch_with_retry(
            &ctx,
            &store,
            &AuthInfo::Controller,
            "ns",
            store.id(),
            3,
            |mut c: Counter| {
                c.value += 1;
                c
            },
        )
        .await
        .unwrap();

        assert_eq!(written.value, 1);
        assert_eq!(written.version, 2);
        assert_eq!(*store.writes.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn retries_against_fresh_read() {
        let store = FakeStore::new(2);
        let ctx = RequestContext::background();
        let written = patch_with_retry(
            &ctx,
            &store,
            &AuthInfo::Controller,
            "ns",
            store.id(),
            3,
            |mut c: Counter| {
                c.value += 1;
                c
            },
        )
        .await
        .unwrap();

        // Transform applied to the final read only.
        assert_eq!(written.value, 1);
        assert_eq!(*store.writes.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn surfaces_conflict_exhausted() {
        let store = FakeStore::new(10);
        let ctx = RequestContext::background();
        let err = patch_with_retry(
            &ctx,
            &store,
            &AuthInfo::Controller,
            "ns",
            store.id(),
            3,
            |c: Counter| c,
        )
        .await
        .unwrap_err();

        match err {
            PlaneError::ConflictExhausted {
                entity, attempts, ..
            } => {
                assert_eq!(entity, "counter");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_context_stops_before_reading() {
        let store = FakeStore::new(0);
        let ctx = RequestContext::background();
        ctx.cancel();
        let err = patch_with_retry(
            &ctx,
            &store,
            &AuthInfo::Controller,
            "ns",
            store.id(),
            3,
            |c: Counter| c,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PlaneError::Cancelled { .. }));
        assert_eq!(*store.writes.lock().unwrap(), 0);
    }
}
