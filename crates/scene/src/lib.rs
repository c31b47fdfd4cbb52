pub mod batch;
pub mod render_cache;
pub mod surface;

pub use batch::*;
pub use render_cache::*;
pub use surface::*;
