//! Tile endpoint abstraction.
//!
//! The tile store never talks to a transport directly; it goes through the
//! `TileEndpoint` trait so HTTP, in-memory, and test endpoints are
//! interchangeable. Methods return boxed futures for dyn-compatibility.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};

use foundation::tile::TileAddress;
use parking_lot::Mutex;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for endpoint operations.
#[derive(Debug)]
pub struct EndpointError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for EndpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EndpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl EndpointError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Trait for tile feature-data endpoints.
///
/// Returns `Ok(None)` if the tile doesn't exist (equivalent to 404),
/// `Ok(Some(bytes))` if it does, and `Err` on actual errors (IO, network).
pub trait TileEndpoint: Send + Sync {
    fn fetch(&self, address: TileAddress) -> BoxFuture<'_, Result<Option<Vec<u8>>, EndpointError>>;
}

/// HTTP endpoint serving `GET {base}/tiles/buildings/{level}/{x}/{y}.json`.
pub struct HttpTileEndpoint {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTileEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn tile_url(&self, address: TileAddress) -> String {
        format!(
            "{}/tiles/buildings/{}/{}/{}.json",
            self.base_url.trim_end_matches('/'),
            address.level,
            address.x,
            address.y
        )
    }
}

impl TileEndpoint for HttpTileEndpoint {
    fn fetch(&self, address: TileAddress) -> BoxFuture<'_, Result<Option<Vec<u8>>, EndpointError>> {
        let url = self.tile_url(address);
        Box::pin(async move {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| EndpointError::with_source("HTTP request failed", e))?;

            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }

            if !resp.status().is_success() {
                return Err(EndpointError::new(format!("HTTP error: {}", resp.status())));
            }

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| EndpointError::with_source("Failed to read response", e))?;

            Ok(Some(bytes.to_vec()))
        })
    }
}

/// In-memory endpoint for tests and offline runs.
///
/// Counts fetches so de-duplication can be verified by instrumentation.
pub struct MemoryTileEndpoint {
    tiles: Mutex<HashMap<TileAddress, Vec<u8>>>,
    failing: Mutex<HashMap<TileAddress, String>>,
    fetch_count: AtomicU32,
}

impl MemoryTileEndpoint {
    pub fn new() -> Self {
        Self {
            tiles: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashMap::new()),
            fetch_count: AtomicU32::new(0),
        }
    }

    pub fn set_tile(&self, address: TileAddress, data: Vec<u8>) {
        self.tiles.lock().insert(address, data);
    }

    /// Makes fetches for `address` fail with `message`.
    pub fn set_failure(&self, address: TileAddress, message: impl Into<String>) {
        self.failing.lock().insert(address, message.into());
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl Default for MemoryTileEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl TileEndpoint for MemoryTileEndpoint {
    fn fetch(&self, address: TileAddress) -> BoxFuture<'_, Result<Option<Vec<u8>>, EndpointError>> {
        Box::pin(async move {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = self.failing.lock().get(&address) {
                return Err(EndpointError::new(message.clone()));
            }
            Ok(self.tiles.lock().get(&address).cloned())
        })
    }
}
