//! Setting handlers for different configuration patterns.

pub mod identity;
pub mod numeric;
pub mod text;

pub use identity::*;
pub use numeric::*;
pub use text::*;
