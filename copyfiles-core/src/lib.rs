//! copyfiles core library — settings record and its loader.
//!
//! - [`settings`] — [`Settings`], [`CopyFilter`], load from JSON
//! - [`error`] — [`SettingsError`]

pub mod error;
pub mod settings;

pub use error::SettingsError;
pub use settings::{CopyFilter, Settings, SETTINGS_FILE_NAME};
