//! Configuration types for the Tandem engine.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from
//! external sources; every field falls back to its default when absent.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining layout and session settings.
//! - [`LayoutConfig`] - Constants of the layout adjustment pass.
//! - [`SessionConfig`] - Command history and consistency checking.
//!
//! # Example
//!
//! ```
//! # use tandem::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.layout().margin(), 20.0);
//! assert_eq!(config.session().undo_limit(), 100);
//! ```

use serde::Deserialize;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Layout adjustment section.
    #[serde(default)]
    layout: LayoutConfig,

    /// Session section.
    #[serde(default)]
    session: SessionConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the specified sections.
    ///
    /// # Arguments
    ///
    /// * `layout` - Layout adjustment constants.
    /// * `session` - Session settings.
    pub fn new(layout: LayoutConfig, session: SessionConfig) -> Self {
        Self { layout, session }
    }

    /// Returns the layout configuration.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Returns the session configuration.
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }
}

/// Constants used by the layout adjustment pass.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Factor applied to both dimensions of a measured use case.
    use_case_scale: f32,

    /// Downward nudge applied to the children of a use case.
    label_offset: f32,

    /// Header height used when a container has no measured header.
    header_height: f32,

    /// Space added around the children of a container when it grows.
    margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            use_case_scale: 1.4,
            label_offset: 10.0,
            header_height: 38.0,
            margin: 20.0,
        }
    }
}

impl LayoutConfig {
    pub fn new(use_case_scale: f32, label_offset: f32, header_height: f32, margin: f32) -> Self {
        Self {
            use_case_scale,
            label_offset,
            header_height,
            margin,
        }
    }

    pub fn use_case_scale(&self) -> f32 {
        self.use_case_scale
    }

    pub fn label_offset(&self) -> f32 {
        self.label_offset
    }

    pub fn header_height(&self) -> f32 {
        self.header_height
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }
}

/// Per-session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of commands kept on the undo stack. `0` disables undo.
    undo_limit: usize,

    /// Check that no notation record dangles after every command.
    verify_consistency: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            undo_limit: 100,
            verify_consistency: true,
        }
    }
}

impl SessionConfig {
    pub fn new(undo_limit: usize, verify_consistency: bool) -> Self {
        Self {
            undo_limit,
            verify_consistency,
        }
    }

    /// Returns the maximum depth of the undo stack.
    pub fn undo_limit(&self) -> usize {
        self.undo_limit
    }

    /// Returns whether documents are checked for dangling proxies after each command.
    pub fn verify_consistency(&self) -> bool {
        self.verify_consistency
    }
}
