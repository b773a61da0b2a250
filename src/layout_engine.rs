//! Pure geometry over a layout's zones: finding the drop target under the
//! pointer and moving the dividers between zones.

pub mod boundary;
pub mod resolver;

pub use boundary::{Boundary, boundaries, move_boundary};
pub use resolver::{ResolvedTarget, resolve};
