//! Fresco Services Layer
//!
//! Host-facing services around the renderer. Currently settings.

pub mod settings;

pub use settings::{Settings, SettingsError};
