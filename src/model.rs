pub mod geometry;
pub mod layout;
pub mod preset;
pub mod store;

pub use geometry::{Point, Rect, Size};
pub use layout::{Axis, Layout, Zone};
pub use preset::PresetCollection;
pub use store::LayoutStore;
