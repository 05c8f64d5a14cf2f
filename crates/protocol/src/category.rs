//! Metric categories
//!
//! An event's `type` doubles as its category. Only three categories get
//! category-specific processing; every other type is uncategorized and is
//! logged and broadcast but never aggregated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Metric category declared by an event's `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Category {
    /// Resource usage samples (cpu, memory, network, fps)
    Performance,
    /// User interaction records grouped by session
    Behavior,
    /// Captured runtime faults
    Error,
}

impl Category {
    /// Every known category
    pub const ALL: [Category; 3] = [Category::Performance, Category::Behavior, Category::Error];

    /// Classify an event type; exact, case-sensitive match
    pub fn from_type(event_type: &str) -> Option<Self> {
        match event_type {
            "performance" => Some(Self::Performance),
            "behavior" => Some(Self::Behavior),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Event type string for this category
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Behavior => "behavior",
            Self::Error => "error",
        }
    }

    /// Name used in aggregate bucket keys and snapshot sections
    pub const fn bucket_name(self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Behavior => "behavior",
            Self::Error => "errors",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_type(s).ok_or_else(|| format!("unknown category: {s}"))
    }
}
