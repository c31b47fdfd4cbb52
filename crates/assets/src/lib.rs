pub mod animation;
pub mod cache;
pub mod chain;
pub mod lod;
pub mod model;
pub mod primitive;
pub mod procedural;
pub mod sources;

pub use animation::*;
pub use cache::*;
pub use chain::*;
pub use lod::*;
pub use model::*;
pub use primitive::*;
pub use procedural::*;
pub use sources::*;
