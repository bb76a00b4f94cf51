//! Safe SQL builder: identifiers quoted, values as parameters.

mod builder;
pub mod ident;
pub mod params;
pub mod positional;
pub use builder::*;
pub use params::*;
pub use positional::to_positional;
