pub mod memory;
pub mod namespace;
pub mod ordered;
pub mod traits;

pub use memory::*;
pub use namespace::*;
pub use ordered::*;
pub use traits::*;
