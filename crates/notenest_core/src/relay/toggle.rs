//! Gesture handling and the probe/inject/retry toggle handshake.
//!
//! # Invariants
//! - Restricted host pages are never probed or injected.
//! - A toggle is attempted at most `1 + retry_delays.len()` times per gesture.
//! - Delivery failures are logged only; nothing is surfaced to the user.

use crate::protocol::{PanelReply, PanelSignal};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Keyboard command bound to the panel toggle.
pub const TOGGLE_COMMAND: &str = "toggle-panel";

const RESTRICTED_URL_PREFIXES: &[&str] = &["chrome://", "edge://", "chrome-extension://", "about:"];

/// A host page the panel can be shown on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: u32,
    pub url: String,
}

impl Tab {
    pub fn new(id: u32, url: impl Into<String>) -> Self {
        Self { id, url: url.into() }
    }

    /// Browser-internal pages where the presentation layer cannot run.
    pub fn is_restricted(&self) -> bool {
        RESTRICTED_URL_PREFIXES
            .iter()
            .any(|prefix| self.url.starts_with(prefix))
    }
}

/// User gestures that toggle the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    IconClicked(Tab),
    Shortcut(String),
}

/// Delivery failures reported by a `TabHost`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabError {
    /// No presentation layer answered on the tab.
    NotReachable(String),
    /// Injecting the presentation layer failed.
    InjectionFailed(String),
}

impl Display for TabError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotReachable(reason) => write!(f, "presentation layer not reachable: {reason}"),
            Self::InjectionFailed(reason) => write!(f, "injection failed: {reason}"),
        }
    }
}

impl Error for TabError {}

/// Host browser capabilities used by the relay.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Currently focused tab, if any.
    async fn active_tab(&self) -> Option<Tab>;
    /// Delivers `signal` to the tab's presentation layer.
    async fn send(&self, tab: &Tab, signal: PanelSignal) -> Result<Option<PanelReply>, TabError>;
    /// Injects the presentation layer into the tab.
    async fn inject(&self, tab: &Tab) -> Result<(), TabError>;
}

/// How a toggle gesture ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Presentation layer answered the probe and took the toggle.
    Toggled,
    /// Toggle landed after injecting; `attempt` counts retries, from 1.
    ToggledAfterInjection { attempt: usize },
    /// Restricted page; nothing was attempted.
    Restricted,
    /// Shortcut fired without a focused tab.
    NoActiveTab,
    /// Shortcut command other than `TOGGLE_COMMAND`.
    UnknownCommand(String),
    /// Injection failed; no retries were scheduled.
    InjectionFailed,
    /// Every retry after injection failed.
    RetriesExhausted,
}

/// Turns gestures into toggle commands for a tab host.
pub struct PanelToggler<H: TabHost> {
    host: H,
    retry_delays: Vec<Duration>,
}

impl<H: TabHost> PanelToggler<H> {
    pub fn new(host: H, retry_delays: Vec<Duration>) -> Self {
        Self { host, retry_delays }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub async fn handle_gesture(&self, gesture: Gesture) -> ToggleOutcome {
        match gesture {
            Gesture::IconClicked(tab) => self.toggle_on_tab(&tab).await,
            Gesture::Shortcut(command) if command == TOGGLE_COMMAND => {
                info!("event=shortcut module=relay status=start command={command}");
                match self.host.active_tab().await {
                    Some(tab) => self.toggle_on_tab(&tab).await,
                    None => {
                        error!("event=shortcut module=relay status=error reason=no_active_tab");
                        ToggleOutcome::NoActiveTab
                    }
                }
            }
            Gesture::Shortcut(command) => {
                debug!("event=shortcut module=relay status=ignored command={command}");
                ToggleOutcome::UnknownCommand(command)
            }
        }
    }

    /// Probes the tab, injecting the presentation layer and retrying the
    /// toggle on the configured delays when the probe goes unanswered.
    pub async fn toggle_on_tab(&self, tab: &Tab) -> ToggleOutcome {
        if tab.is_restricted() {
            info!(
                "event=toggle module=relay status=skipped tab={} reason=restricted_url",
                tab.id
            );
            return ToggleOutcome::Restricted;
        }

        match self.host.send(tab, PanelSignal::ProbeReady).await {
            Ok(Some(PanelReply::Ready)) => match self.send_toggle(tab).await {
                Ok(()) => return ToggleOutcome::Toggled,
                Err(err) => {
                    warn!(
                        "event=toggle module=relay status=error tab={} stage=direct error={err}",
                        tab.id
                    );
                }
            },
            Ok(None) => debug!("event=probe module=relay status=no_reply tab={}", tab.id),
            Err(err) => debug!("event=probe module=relay status=error tab={} error={err}", tab.id),
        }

        if let Err(err) = self.host.inject(tab).await {
            error!(
                "event=inject module=relay status=error tab={} error={err}",
                tab.id
            );
            return ToggleOutcome::InjectionFailed;
        }
        info!("event=inject module=relay status=ok tab={}", tab.id);

        for (index, delay) in self.retry_delays.iter().enumerate() {
            tokio::time::sleep(*delay).await;
            match self.send_toggle(tab).await {
                Ok(()) => {
                    info!(
                        "event=toggle module=relay status=ok tab={} attempt={}",
                        tab.id,
                        index + 1
                    );
                    return ToggleOutcome::ToggledAfterInjection { attempt: index + 1 };
                }
                Err(err) => warn!(
                    "event=toggle module=relay status=retry_failed tab={} attempt={} error={err}",
                    tab.id,
                    index + 1
                ),
            }
        }

        error!(
            "event=toggle module=relay status=error tab={} reason=retries_exhausted",
            tab.id
        );
        ToggleOutcome::RetriesExhausted
    }

    async fn send_toggle(&self, tab: &Tab) -> Result<(), TabError> {
        self.host
            .send(tab, PanelSignal::ToggleVisibility)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::Tab;

    #[test]
    fn restricted_urls_are_detected() {
        assert!(Tab::new(1, "chrome://settings").is_restricted());
        assert!(Tab::new(1, "about:blank").is_restricted());
        assert!(Tab::new(1, "chrome-extension://abc/page.html").is_restricted());
        assert!(!Tab::new(1, "https://example.com").is_restricted());
    }
}
