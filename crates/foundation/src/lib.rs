pub mod geo;
pub mod tile;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use geo::*;
pub use tile::*;
pub use time::*;
