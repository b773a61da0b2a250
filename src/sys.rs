//! Interfaces to the desktop, and in-memory stand-ins for them.

pub mod headless;
pub mod hotkey;
pub mod overlay;
pub mod window_system;
