//! Shared primitives for the auth helper crates.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Shared error type for the helper crates.
#[derive(Debug, Error, Clone)]
pub enum HelperError {
    #[error("{message}")]
    Message { message: String },
}

impl HelperError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Browser tab identifier. Requests not tied to a tab report `-1`.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(transparent))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TabId(pub i64);

impl TabId {
    pub const NONE: TabId = TabId(-1);

    pub fn is_tab(&self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One interception of one tab. Delayed work is scoped to the flow that scheduled it.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct FlowId(pub Uuid);

impl FlowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        let full = self.0.simple().to_string();
        f.write_str(&full[..8])
    }
}

/// Resource type of an intercepted request.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameType {
    MainFrame,
    SubFrame,
    Other,
}

impl FrameType {
    pub fn is_top_level(&self) -> bool {
        matches!(self, FrameType::MainFrame)
    }
}

/// Page load status reported alongside tab updates.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadStatus {
    Loading,
    Complete,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loading => f.write_str("loading"),
            LoadStatus::Complete => f.write_str("complete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_none_is_not_a_tab() {
        assert!(!TabId::NONE.is_tab());
        assert!(TabId(0).is_tab());
        assert_eq!(TabId(42).to_string(), "42");
    }

    #[test]
    fn flow_ids_are_unique_and_short_in_display() {
        let a = FlowId::new();
        let b = FlowId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 8);
    }

    #[cfg(feature = "serde-full")]
    #[test]
    fn tab_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&TabId(7)).unwrap();
        assert_eq!(json, "7");
        let status: LoadStatus = serde_json::from_str("\"complete\"").unwrap();
        assert_eq!(status, LoadStatus::Complete);
    }
}
