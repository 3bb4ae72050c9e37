//! Activity Journal Module
//!
//! Pluggable record of store activity with runtime selection.
//! Purely in memory: it is an observability aid, never replayed.
//!
//! # Example
//! ```ignore
//! use snapvault::journal::{JournalConfig, JournalMode};
//!
//! // Keep nothing (default)
//! let journal = JournalConfig::new(JournalMode::Disabled).build();
//!
//! // Keep the last 500 operations
//! let journal = JournalConfig::new(JournalMode::Memory).capacity(500).build();
//! ```

mod memory;
mod noop;
mod traits;

pub use memory::MemoryJournal;
pub use noop::NoOpJournal;
pub use traits::{Journal, JournalEntry, JournalOp, Seq};

use serde::Deserialize;

/// Journal mode - selectable at runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(from = "String")]
pub enum JournalMode {
    /// No journal - nothing retained
    #[default]
    Disabled,

    /// Bounded in-memory ring of recent operations
    Memory,
}

impl JournalMode {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "off" | "disabled" | "none" | "noop" => JournalMode::Disabled,
            "memory" | "mem" | "ring" | "on" => JournalMode::Memory,
            _ => JournalMode::default(),
        }
    }
}

impl From<String> for JournalMode {
    fn from(s: String) -> Self {
        JournalMode::parse(&s)
    }
}

/// Journal configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Journal mode
    pub mode: JournalMode,
    /// Max retained entries (Memory mode)
    pub capacity: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            mode: JournalMode::default(),
            capacity: 1_000,
        }
    }
}

impl JournalConfig {
    /// Create config with specific mode
    pub fn new(mode: JournalMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Set journal mode
    pub fn mode(mut self, mode: JournalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set journal mode from a string (`"off"`, `"memory"`, ...)
    pub fn mode_str(self, mode: &str) -> Self {
        self.mode(JournalMode::parse(mode))
    }

    /// Set ring capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Create journal instance based on config
    pub fn build(&self) -> Box<dyn Journal> {
        match self.mode {
            JournalMode::Disabled => Box::new(NoOpJournal::new()),
            JournalMode::Memory => Box::new(MemoryJournal::new(self.capacity)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!(JournalMode::parse("MEMORY"), JournalMode::Memory);
        assert_eq!(JournalMode::parse("off"), JournalMode::Disabled);
        assert_eq!(JournalMode::parse("bogus"), JournalMode::Disabled);
    }

    #[test]
    fn test_config_mode_strings_go_through_parse() {
        let config: JournalConfig = serde_json::from_str(r#"{"mode": "RING"}"#).unwrap();
        assert_eq!(config.mode, JournalMode::Memory);

        let config: JournalConfig = serde_json::from_str(r#"{"mode": "noop"}"#).unwrap();
        assert_eq!(config.mode, JournalMode::Disabled);

        assert!(JournalConfig::default().mode_str("Mem").build().is_enabled());
    }

    #[test]
    fn test_build_by_mode() {
        assert!(!JournalConfig::default().build().is_enabled());

        let journal = JournalConfig::new(JournalMode::Memory).capacity(2).build();
        assert!(journal.is_enabled());
        journal.append(JournalOp::SetAutoCommit { enabled: false });
        assert_eq!(journal.len(), 1);
    }
}
