//! Streamed event envelope.
//!
//! Apply and destroy stream `progress` / `resource` / `error` events to the
//! host before the terminal response; destroy finishes with `complete`.
//! The envelope shape is part of the host contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Progress,
    Resource,
    Error,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAction {
    Create,
    Update,
    Delete,
    NoChange,
}

impl ResourceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::NoChange => "no_change",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub action: ResourceAction,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<EventResource>,
}

impl Event {
    pub fn progress(message: impl Into<String>) -> Self {
        Self {
            event_type: EventType::Progress,
            message: Some(message.into()),
            resource: None,
        }
    }

    pub fn resource(resource: EventResource) -> Self {
        Self {
            event_type: EventType::Resource,
            message: None,
            resource: Some(resource),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            event_type: EventType::Error,
            message: Some(message.into()),
            resource: None,
        }
    }

    pub fn complete() -> Self {
        Self {
            event_type: EventType::Complete,
            message: None,
            resource: None,
        }
    }
}
