use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use foundation::tile::TileAddress;
use parking_lot::RwLock;
use tracing::warn;

use crate::endpoint::TileEndpoint;
use crate::feature::{Feature, parse_tile_payload};
use crate::pending::PendingRegistry;

/// One fetched tile. Write-once: replaced only by a forced reload, never
/// mutated in place, so readers can hold the `Arc` across interleavings.
#[derive(Debug)]
pub struct TileRecord {
    pub address: TileAddress,
    /// Empty both for genuinely empty regions and for failed fetches; the
    /// distinction is deliberately not kept (no retry storms).
    pub features: Vec<Feature>,
    /// Monotonic load counter, for staleness comparisons.
    pub tick: u64,
}

impl TileRecord {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Address-keyed cache of fetched tile payloads with at-most-one concurrent
/// network operation per address.
pub struct TileStore {
    endpoint: Arc<dyn TileEndpoint>,
    records: Arc<RwLock<BTreeMap<TileAddress, Arc<TileRecord>>>>,
    pending: PendingRegistry<Arc<TileRecord>>,
    tick: Arc<AtomicU64>,
}

impl TileStore {
    pub fn new(endpoint: Arc<dyn TileEndpoint>) -> Self {
        Self {
            endpoint,
            records: Arc::new(RwLock::new(BTreeMap::new())),
            pending: PendingRegistry::new(),
            tick: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn get(&self, address: TileAddress) -> Option<Arc<TileRecord>> {
        self.records.read().get(&address).cloned()
    }

    /// A tile that previously fetched as empty still counts as loaded.
    pub fn is_loaded(&self, address: TileAddress) -> bool {
        self.records.read().contains_key(&address)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn loaded_addresses(&self) -> BTreeSet<TileAddress> {
        self.records.read().keys().copied().collect()
    }

    /// Total interface: any failure degrades to an empty record, which is
    /// cached so the endpoint is not hammered for missing regions. A
    /// transient failure therefore also reads as empty until `force_reload`.
    pub async fn get_or_fetch(&self, address: TileAddress) -> Arc<TileRecord> {
        if let Some(record) = self.get(address) {
            return record;
        }

        let key = address.cache_key();
        let endpoint = self.endpoint.clone();
        let records = self.records.clone();
        let tick = self.tick.clone();

        self.pending
            .run(&key, move || async move {
                let features = match endpoint.fetch(address).await {
                    Ok(Some(bytes)) => match parse_tile_payload(&bytes) {
                        Ok(features) => features,
                        Err(e) => {
                            warn!("tile {} parse failed, caching empty: {e}", address.cache_key());
                            Vec::new()
                        }
                    },
                    Ok(None) => Vec::new(),
                    Err(e) => {
                        warn!("tile {} fetch failed, caching empty: {e}", address.cache_key());
                        Vec::new()
                    }
                };

                let record = Arc::new(TileRecord {
                    address,
                    features,
                    tick: tick.fetch_add(1, Ordering::SeqCst),
                });
                records.write().insert(address, record.clone());
                record
            })
            .await
    }

    /// Drops any cached record and fetches again. Still de-duplicated: if a
    /// fetch for this address is already in flight, its (fresh) result is
    /// used instead of issuing a second call.
    pub async fn force_reload(&self, address: TileAddress) -> Arc<TileRecord> {
        self.records.write().remove(&address);
        self.get_or_fetch(address).await
    }

    pub fn evict(&self, address: TileAddress) -> bool {
        self.records.write().remove(&address).is_some()
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }
}
