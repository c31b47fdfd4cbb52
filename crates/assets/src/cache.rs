use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::{Asset, AssetKind};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryBudget {
    pub max_bytes: usize,
}

impl MemoryBudget {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    BudgetExceeded { requested: usize, max: usize },
    UnknownId,
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::BudgetExceeded { requested, max } => {
                write!(f, "asset too large for budget: requested={requested} max={max}")
            }
            CacheError::UnknownId => write!(f, "unknown asset id"),
        }
    }
}

impl std::error::Error for CacheError {}

#[derive(Debug, Clone)]
struct CacheEntry {
    asset: Arc<Asset>,
    bytes: usize,
    last_used_tick: u64,
    pin_count: u32,
}

/// Deterministic in-memory asset cache with a byte budget.
///
/// Entries are keyed in a `BTreeMap` for stable traversal order; eviction
/// is LRU by `last_used_tick` with a tie-break by id ordering. Pinned
/// entries (currently required by a caller) are never evicted.
#[derive(Debug)]
pub struct AssetCache {
    budget: MemoryBudget,
    used_bytes: usize,
    tick: u64,
    entries: BTreeMap<String, CacheEntry>,
}

impl AssetCache {
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            budget,
            used_bytes: 0,
            tick: 0,
            entries: BTreeMap::new(),
        }
    }

    pub fn budget(&self) -> MemoryBudget {
        self.budget
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Lookup that refreshes recency.
    pub fn get(&mut self, id: &str) -> Option<Arc<Asset>> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(id)?;
        entry.last_used_tick = tick;
        Some(entry.asset.clone())
    }

    /// Lookup without touching recency.
    pub fn peek(&self, id: &str) -> Option<Arc<Asset>> {
        self.entries.get(id).map(|e| e.asset.clone())
    }

    /// Stores an asset under its id, evicting least-recently-used entries
    /// as needed. Returns the evicted ids (deterministic order).
    pub fn insert(&mut self, asset: Arc<Asset>) -> Result<Vec<String>, CacheError> {
        let bytes = asset.estimated_bytes();
        if bytes > self.budget.max_bytes {
            return Err(CacheError::BudgetExceeded {
                requested: bytes,
                max: self.budget.max_bytes,
            });
        }

        self.tick += 1;
        let id = asset.id.clone();

        if let Some(old) = self.entries.insert(
            id.clone(),
            CacheEntry {
                asset,
                bytes,
                last_used_tick: self.tick,
                pin_count: 0,
            },
        ) {
            self.used_bytes = self.used_bytes.saturating_sub(old.bytes);
        }
        self.used_bytes += bytes;

        self.evict_as_needed(&id)
    }

    pub fn pin(&mut self, id: &str) -> Result<(), CacheError> {
        let entry = self.entries.get_mut(id).ok_or(CacheError::UnknownId)?;
        entry.pin_count = entry.pin_count.saturating_add(1);
        Ok(())
    }

    pub fn unpin(&mut self, id: &str) -> Result<(), CacheError> {
        let entry = self.entries.get_mut(id).ok_or(CacheError::UnknownId)?;
        entry.pin_count = entry.pin_count.saturating_sub(1);
        Ok(())
    }

    pub fn evict(&mut self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                self.used_bytes = self.used_bytes.saturating_sub(entry.bytes);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
    }

    /// Drops every entry of one kind; returns the removed ids.
    pub fn clear_kind(&mut self, kind: AssetKind) -> Vec<String> {
        let ids: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.asset.kind == kind)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            self.evict(id);
        }
        ids
    }

    fn evict_as_needed(&mut self, just_inserted: &str) -> Result<Vec<String>, CacheError> {
        let mut evicted: Vec<String> = Vec::new();
        while self.used_bytes > self.budget.max_bytes {
            // Never evict pins or the entry that triggered the pass; if
            // nothing else is evictable, run over budget rather than drop
            // something a caller still requires.
            let candidate = self
                .entries
                .iter()
                .filter(|(id, e)| e.pin_count == 0 && id.as_str() != just_inserted)
                .min_by(|(ida, ea), (idb, eb)| {
                    ea.last_used_tick
                        .cmp(&eb.last_used_tick)
                        .then_with(|| ida.cmp(idb))
                })
                .map(|(id, _)| id.clone());

            let Some(id) = candidate else {
                break;
            };

            self.evict(&id);
            evicted.push(id);
        }
        Ok(evicted)
    }
}
