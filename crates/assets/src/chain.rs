//! Tiered asset acquisition.
//!
//! Resolution order is fixed: registered procedural generator, then each
//! external source in registration order, then primitive synthesis, then
//! the universal fallback. Acquisition therefore always produces an asset;
//! source failures are logged and swallowed. Identical in-flight requests
//! share one resolution via [`PendingRegistry`].

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use streaming::pending::PendingRegistry;
use tracing::{debug, warn};

use crate::animation::{MotionKind, MotionParams, synthesize};
use crate::cache::{AssetCache, CacheError, MemoryBudget};
use crate::lod::{MAX_DETAIL_LEVEL, MIN_DETAIL_LEVEL, derived_id, reduce};
use crate::model::{
    Asset, AssetKind, AssetMetadata, AssetOrigin, AssetPayload, AssetRequest, AssetSpec, EffectKind,
};
use crate::primitive::{FALLBACK_ACCURACY, PRIMITIVE_ACCURACY, fallback_payload, synthesize_primitive};
use crate::procedural::{ProceduralGenerator, default_generators};
use crate::sources::ExternalSource;

pub struct AcquisitionChain {
    generators: BTreeMap<AssetKind, Arc<dyn ProceduralGenerator>>,
    sources: Vec<Arc<dyn ExternalSource>>,
    cache: Arc<Mutex<AssetCache>>,
    pending: PendingRegistry<Arc<Asset>>,
}

impl AcquisitionChain {
    /// Chain with no generators or sources; only the primitive and
    /// fallback tiers can resolve.
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            generators: BTreeMap::new(),
            sources: Vec::new(),
            cache: Arc::new(Mutex::new(AssetCache::new(budget))),
            pending: PendingRegistry::new(),
        }
    }

    /// Chain with the built-in building and terrain generators registered.
    pub fn with_default_generators(budget: MemoryBudget) -> Self {
        let mut chain = Self::new(budget);
        for generator in default_generators() {
            chain.register_generator(generator);
        }
        chain
    }

    /// Registers a generator for its kind, replacing any previous one.
    pub fn register_generator(&mut self, generator: Arc<dyn ProceduralGenerator>) {
        self.generators.insert(generator.kind(), generator);
    }

    /// Appends a source; sources are consulted in registration order.
    pub fn push_source(&mut self, source: Arc<dyn ExternalSource>) {
        self.sources.push(source);
    }

    /// Resolves a request to an asset. Total: every spec yields an asset,
    /// from cache when possible, otherwise through the tiers.
    pub async fn acquire(&self, request: &AssetRequest) -> Arc<Asset> {
        let id = request.spec.request_id();
        if let Some(asset) = self.cache.lock().get(&id) {
            return asset;
        }

        debug!(id = %id, urgency = ?request.urgency, "acquiring asset");
        let spec = request.spec.clone();
        let generator = self.generators.get(&spec.kind()).cloned();
        let sources = self.sources.clone();
        let cache = self.cache.clone();

        let resolve_id = id.clone();
        self.pending
            .run(&id, move || async move {
                let asset = Arc::new(resolve(resolve_id, spec, generator, sources).await);
                store(&cache, asset.clone());
                asset
            })
            .await
    }

    /// Resolves a request and reduces it to `level` (clamped to 1..=5),
    /// caching the derivative under its own id. Level 5 is the full asset.
    pub async fn acquire_lod(&self, request: &AssetRequest, level: u8) -> Arc<Asset> {
        let full = self.acquire(request).await;
        let level = level.clamp(MIN_DETAIL_LEVEL, MAX_DETAIL_LEVEL);
        if level == MAX_DETAIL_LEVEL {
            return full;
        }

        let id = derived_id(&full.id, level);
        if let Some(asset) = self.cache.lock().get(&id) {
            return asset;
        }

        let reduced = Arc::new(reduce(&full, level));
        store(&self.cache, reduced.clone());
        reduced
    }

    /// Cached lookup by id without resolving; does not refresh recency.
    pub fn cached(&self, id: &str) -> Option<Arc<Asset>> {
        self.cache.lock().peek(id)
    }

    pub fn cached_count(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Drops every cached asset of one kind; returns the removed ids.
    pub fn clear_kind(&self, kind: AssetKind) -> Vec<String> {
        self.cache.lock().clear_kind(kind)
    }
}

fn store(cache: &Mutex<AssetCache>, asset: Arc<Asset>) {
    let id = asset.id.clone();
    match cache.lock().insert(asset) {
        Ok(evicted) if !evicted.is_empty() => {
            debug!(id = %id, evicted = evicted.len(), "cache evicted assets to admit new entry");
        }
        Ok(_) => {}
        Err(CacheError::BudgetExceeded { requested, max }) => {
            warn!(id = %id, requested, max, "asset exceeds cache budget; serving uncached");
        }
        Err(err) => {
            warn!(id = %id, %err, "asset cache insert failed");
        }
    }
}

async fn resolve(
    id: String,
    spec: AssetSpec,
    generator: Option<Arc<dyn ProceduralGenerator>>,
    sources: Vec<Arc<dyn ExternalSource>>,
) -> Asset {
    if let Some(generator) = generator
        && let Some(payload) = generator.generate(&spec)
    {
        return assemble(
            id,
            &spec,
            payload,
            AssetOrigin::Procedural,
            generator.accuracy(),
            None,
            None,
        );
    }

    for source in &sources {
        match source.lookup(&spec).await {
            Ok(Some(model)) => {
                return assemble(
                    id,
                    &spec,
                    AssetPayload::ModelRef { uri: model.uri },
                    AssetOrigin::External,
                    model.accuracy,
                    model.license,
                    model.attribution,
                );
            }
            Ok(None) => {}
            Err(err) => {
                debug!(source = source.name(), id = %id, %err, "external source failed; trying next tier");
            }
        }
    }

    if let Some(payload) = synthesize_primitive(&spec) {
        return assemble(
            id,
            &spec,
            payload,
            AssetOrigin::Generated,
            PRIMITIVE_ACCURACY,
            None,
            None,
        );
    }

    assemble(
        id,
        &spec,
        fallback_payload(),
        AssetOrigin::Generated,
        FALLBACK_ACCURACY,
        None,
        None,
    )
}

fn assemble(
    id: String,
    spec: &AssetSpec,
    payload: AssetPayload,
    origin: AssetOrigin,
    accuracy: f64,
    license: Option<String>,
    attribution: Option<String>,
) -> Asset {
    let animations = match *spec {
        AssetSpec::Effect {
            effect, duration_s, ..
        } => {
            let kind = match effect {
                EffectKind::Explosion => MotionKind::Explosion,
                EffectKind::Collapse => MotionKind::Collapse,
            };
            vec![synthesize(
                kind,
                &MotionParams {
                    path: vec![],
                    duration_s,
                },
            )]
        }
        _ => vec![],
    };

    Asset {
        id,
        kind: spec.kind(),
        payload,
        animations,
        metadata: AssetMetadata {
            name: spec.display_name(),
            dimensions: spec.dimensions(),
            origin,
            accuracy,
            license,
            attribution,
        },
    }
}
