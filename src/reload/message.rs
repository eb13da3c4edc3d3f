//! Live-update message protocol.
//!
//! JSON messages exchanged with browser clients over WebSocket.
//!
//! # Server to client
//!
//! - `update`: a source file changed, carries its full content
//! - `sprites`: a sprite changed, carries its animation properties
//!
//! # Client to server
//!
//! - `log` / `error`: console output forwarded from the preview
//! - `restart`: the preview restarted, reprint the session banner

use serde::{Deserialize, Serialize};

use crate::project::SpriteProperties;

/// Message pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Source file content changed
    Update {
        /// Logical name (`lib/util.ms` -> `lib-util`)
        file: String,
        /// Full new source text
        code: String,
        /// Milliseconds since epoch
        version: u64,
    },

    /// Sprite added, removed or changed
    Sprites {
        /// Logical name (`chars/hero.png` -> `chars-hero`)
        file: String,
        version: u64,
        properties: SpriteProperties,
    },
}

impl ServerMessage {
    pub fn update(file: impl Into<String>, code: impl Into<String>, version: u64) -> Self {
        Self::Update {
            file: file.into(),
            code: code.into(),
            version,
        }
    }

    /// Sprite message; missing properties default to a single frame.
    pub fn sprites(file: impl Into<String>, version: u64, properties: Option<SpriteProperties>) -> Self {
        Self::Sprites {
            file: file.into(),
            version,
            properties: properties.unwrap_or(SpriteProperties { frames: 1 }),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            crate::log!("ws"; "failed to serialize message: {}", e);
            String::from("{}")
        })
    }
}

/// Message received from clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Log {
        #[serde(default)]
        data: serde_json::Value,
    },
    Error {
        #[serde(default)]
        data: serde_json::Value,
    },
    Restart,
}

impl ClientMessage {
    /// Parse a text frame. Malformed or unknown messages yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

/// Render a forwarded console payload: strings verbatim, anything else as JSON.
pub fn display_data(data: &serde_json::Value) -> String {
    match data {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
