pub mod class;
pub mod common;
pub mod instance;
pub mod named;
pub mod path;
pub mod qualifier;
pub mod request;
pub mod value;

pub use class::*;
pub use common::*;
pub use instance::*;
pub use named::*;
pub use path::*;
pub use qualifier::*;
pub use request::*;
pub use value::*;
