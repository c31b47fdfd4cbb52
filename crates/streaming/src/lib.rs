pub mod endpoint;
pub mod feature;
pub mod pending;
pub mod scheduler;
pub mod tile_cache;

pub use endpoint::*;
pub use feature::*;
pub use pending::*;
pub use scheduler::*;
pub use tile_cache::*;
