//! Messages exchanged between panel, presentation layer and relay.
//!
//! Every message kind is one variant of a tagged union serialized with an
//! `action` discriminator, e.g. `{"action":"persistDocumentTree","data":{..}}`.

use crate::model::tree::DocumentTree;
use serde::{Deserialize, Serialize};

/// Requests addressed to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RelayRequest {
    /// Reply: `RelayResponse::DocumentTree`.
    FetchDocumentTree,
    /// Full overwrite of the stored tree. Reply: `RelayResponse::Persisted`.
    PersistDocumentTree { data: DocumentTree },
    /// Reply: `RelayResponse::PanelWidth`.
    FetchPanelWidth,
    /// Reply: `RelayResponse::PanelWidth` with the clamped stored value.
    PersistPanelWidth { width: u32 },
    /// One-way: the panel asks to be hidden.
    RequestClose,
    /// One-way: the presentation layer finished initializing.
    PanelReady,
}

impl RelayRequest {
    /// Wire name of the request, used in log events.
    pub fn action(&self) -> &'static str {
        match self {
            Self::FetchDocumentTree => "fetchDocumentTree",
            Self::PersistDocumentTree { .. } => "persistDocumentTree",
            Self::FetchPanelWidth => "fetchPanelWidth",
            Self::PersistPanelWidth { .. } => "persistPanelWidth",
            Self::RequestClose => "requestClose",
            Self::PanelReady => "panelReady",
        }
    }
}

/// Relay replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RelayResponse {
    DocumentTree {
        data: DocumentTree,
    },
    Persisted {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    PanelWidth {
        width: u32,
    },
}

/// Signals the relay sends to a tab's presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PanelSignal {
    /// Readiness probe; expects `PanelReply::Ready`.
    ProbeReady,
    ToggleVisibility,
    /// Host page is going away; flush the panel.
    SaveBeforeUnload,
}

/// Replies of the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PanelReply {
    Ready,
}

/// Out-of-band notices the relay forwards to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayNotice {
    CloseRequested,
    PanelReady,
}
