//! Watch adapter: kube-rs watcher events to typed notifications
//!
//! The watcher reports `Apply`/`Delete` and relist boundaries, without the
//! previous state of an object. `EventSource` remembers the last snapshot
//! per key so applies can be split into creates and updates, and so deletes
//! missed during a watch gap surface when a relist finishes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::{future, stream, StreamExt};
use k8s_openapi::api::core::v1::Endpoints;
use kube::runtime::watcher::{self, watcher, Event};
use kube::runtime::WatchStreamExt;
use kube::{Api, Resource};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lbc_common::NamespacedName;

use crate::eventhandlers::{dispatch, EventHandler, Notification};

/// Last-seen snapshots for one watched resource kind
pub struct EventSource<K> {
    known: HashMap<NamespacedName, Arc<K>>,
    /// Keys seen since the current relist began
    relist: Option<HashSet<NamespacedName>>,
}

impl<K> Default for EventSource<K> {
    fn default() -> Self {
        Self {
            known: HashMap::new(),
            relist: None,
        }
    }
}

impl<K: Resource> EventSource<K> {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently known
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Whether no objects are known
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Fold one watcher event into the cache and return the notifications it implies
    pub fn observe(&mut self, event: Event<K>) -> Vec<Notification<K>> {
        match event {
            Event::Apply(obj) => vec![self.apply(obj)],
            Event::Delete(obj) => {
                let key = NamespacedName::of(&obj);
                self.known.remove(&key);
                if let Some(seen) = self.relist.as_mut() {
                    seen.remove(&key);
                }
                vec![Notification::Deleted(Arc::new(obj))]
            }
            Event::Init => {
                self.relist = Some(HashSet::new());
                vec![]
            }
            Event::InitApply(obj) => {
                if let Some(seen) = self.relist.as_mut() {
                    seen.insert(NamespacedName::of(&obj));
                }
                vec![self.apply(obj)]
            }
            Event::InitDone => {
                let Some(seen) = self.relist.take() else {
                    return vec![];
                };
                let mut gone: Vec<NamespacedName> = self
                    .known
                    .keys()
                    .filter(|key| !seen.contains(*key))
                    .cloned()
                    .collect();
                gone.sort();
                gone.into_iter()
                    .filter_map(|key| self.known.remove(&key))
                    .map(Notification::Deleted)
                    .collect()
            }
        }
    }

    fn apply(&mut self, obj: K) -> Notification<K> {
        let key = NamespacedName::of(&obj);
        let new = Arc::new(obj);
        match self.known.insert(key, Arc::clone(&new)) {
            Some(old) => Notification::Updated { old, new },
            None => Notification::Created(new),
        }
    }
}

/// Watch Endpoints and feed every notification to `handler`
///
/// Up to `max_concurrent` notifications are handled at once. Watcher errors
/// are logged and the watcher backs off and resumes. Returns when `shutdown`
/// is cancelled.
pub async fn run_endpoints_watch<H>(
    api: Api<Endpoints>,
    config: watcher::Config,
    handler: Arc<H>,
    max_concurrent: usize,
    shutdown: CancellationToken,
) where
    H: EventHandler<Endpoints> + 'static,
{
    let mut source = EventSource::<Endpoints>::new();

    info!(max_concurrent, "Starting endpoints watch");

    watcher(api, config)
        .default_backoff()
        .filter_map(|result| {
            future::ready(match result {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(error = %e, "Endpoints watch error");
                    None
                }
            })
        })
        .flat_map(move |event| stream::iter(source.observe(event)))
        .take_until(shutdown.clone().cancelled_owned())
        .for_each_concurrent(max_concurrent.max(1), |notification| {
            let handler = Arc::clone(&handler);
            let ctx = shutdown.clone();
            async move { dispatch(&*handler, &ctx, notification).await }
        })
        .await;

    debug!("Endpoints watch stopped");
}
