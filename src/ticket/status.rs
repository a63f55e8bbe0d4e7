//! Resolved ticket status and its display color

use serde::{Deserialize, Serialize};

/// Status category reported by the tracker
///
/// Serializes as the lowercase key. Deserializes through
/// [`StatusCategory::parse`], so tracker display names and anything
/// unrecognised are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum StatusCategory {
    New,
    Indeterminate,
    Done,
    Unknown,
}

impl StatusCategory {
    /// Parse a category key or display name, case-insensitively
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "new" | "to do" => Self::New,
            "indeterminate" | "in progress" => Self::Indeterminate,
            "done" => Self::Done,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Indeterminate => "indeterminate",
            Self::Done => "done",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for StatusCategory {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

/// Annotation color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Blue,
    Amber,
    Green,
    Gray,
    Purple,
}

impl StatusColor {
    /// Color for a category and display name
    ///
    /// A name containing "awaiting release" is purple whatever the category,
    /// unless the resolver marked the status as not eligible for overrides.
    pub fn derive(category: StatusCategory, name: &str, override_eligible: bool) -> Self {
        if override_eligible && name.to_lowercase().contains("awaiting release") {
            return Self::Purple;
        }
        match category {
            StatusCategory::New => Self::Blue,
            StatusCategory::Indeterminate => Self::Amber,
            StatusCategory::Done => Self::Green,
            StatusCategory::Unknown => Self::Gray,
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            Self::Blue => "#0052CC",
            Self::Amber => "#FFAB00",
            Self::Green => "#00875A",
            Self::Gray => "#6B778C",
            Self::Purple => "#9B59B6",
        }
    }
}

/// A resolved status, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub name: String,
    pub category: StatusCategory,
    pub color: StatusColor,
    /// Set when resolution failed; the status then reads "Error"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Status {
    pub fn new(name: impl Into<String>, category: StatusCategory) -> Self {
        Self::with_override(name, category, true)
    }

    pub fn with_override(
        name: impl Into<String>,
        category: StatusCategory,
        override_eligible: bool,
    ) -> Self {
        let name = name.into();
        let color = StatusColor::derive(category, &name, override_eligible);
        Self {
            name,
            category,
            color,
            error: None,
        }
    }

    /// Terminal status shown when resolution failed
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            name: "Error".to_string(),
            category: StatusCategory::Unknown,
            color: StatusColor::Gray,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
