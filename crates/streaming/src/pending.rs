use std::collections::HashMap;
use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;

type SharedOp<T> = Shared<BoxFuture<'static, T>>;

/// In-flight request de-duplication keyed by string.
///
/// At most one operation runs per key at any time: a second caller for the
/// same key attaches to the existing shared future instead of starting a new
/// operation. Completion always removes the entry, whatever the outcome, so
/// a later request for the same key starts fresh.
///
/// Removal is guarded by a generation counter: a waiter that finishes late
/// (after the entry has already been replaced by a newer operation) must not
/// remove its successor.
pub struct PendingRegistry<T: Clone> {
    inflight: Mutex<Inflight<T>>,
}

struct Inflight<T: Clone> {
    ops: HashMap<String, (u64, SharedOp<T>)>,
    next_generation: u64,
}

impl<T: Clone + Send + 'static> PendingRegistry<T> {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(Inflight {
                ops: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    /// Number of operations currently in flight.
    pub fn len(&self) -> usize {
        self.inflight.lock().ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `start()` for `key`, or attaches to the operation already in
    /// flight for that key. The lock is never held across the await.
    pub async fn run<F, Fut>(&self, key: &str, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (generation, op) = {
            let mut inflight = self.inflight.lock();
            match inflight.ops.get(key) {
                Some((generation, op)) => (*generation, op.clone()),
                None => {
                    let generation = inflight.next_generation;
                    inflight.next_generation += 1;
                    let op: SharedOp<T> = start().boxed().shared();
                    inflight.ops.insert(key.to_string(), (generation, op.clone()));
                    (generation, op)
                }
            }
        };

        let out = op.await;

        let mut inflight = self.inflight.lock();
        if inflight.ops.get(key).map(|(g, _)| *g) == Some(generation) {
            inflight.ops.remove(key);
        }
        out
    }
}

impl<T: Clone + Send + 'static> Default for PendingRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
