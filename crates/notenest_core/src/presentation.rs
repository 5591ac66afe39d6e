//! Presentation layer state for one host page.
//!
//! # Responsibility
//! - Answer readiness probes and toggle panel visibility.
//! - Own the panel width: load it on show, clamp drag-resize, persist on
//!   release.
//! - Relay host lifecycle signals (`saveBeforeUnload`) to the panel.
//!
//! # Invariants
//! - Width is always inside the configured bounds.
//! - A relay failure never blocks showing or hiding the panel.

use crate::config::WidthBounds;
use crate::controller::PanelEvent;
use crate::protocol::{PanelReply, PanelSignal};
use crate::relay::RelayHandle;
use log::{debug, info, warn};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResizeDrag {
    start_x: i32,
    start_width: u32,
}

/// Geometry and visibility of the injected panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelFrame {
    visible: bool,
    width: u32,
    bounds: WidthBounds,
    drag: Option<ResizeDrag>,
}

impl PanelFrame {
    pub fn new(bounds: WidthBounds) -> Self {
        Self {
            visible: false,
            width: bounds.default,
            bounds,
            drag: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn is_resizing(&self) -> bool {
        self.drag.is_some()
    }

    pub fn show(&mut self, stored_width: Option<u32>) {
        if let Some(width) = stored_width {
            self.width = self.bounds.clamp(width);
        }
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.drag = None;
    }

    /// Starts a drag on the left edge at pointer x-coordinate `x`.
    pub fn begin_resize(&mut self, x: i32) {
        self.drag = Some(ResizeDrag {
            start_x: x,
            start_width: self.width,
        });
    }

    /// Moving left widens the panel; result is clamped.
    pub fn drag_to(&mut self, x: i32) -> u32 {
        if let Some(drag) = self.drag {
            let delta = i64::from(drag.start_x) - i64::from(x);
            self.width = self.bounds.clamp_signed(i64::from(drag.start_width) + delta);
        }
        self.width
    }

    /// Ends the drag; returns the width to persist, if a drag was active.
    pub fn end_resize(&mut self) -> Option<u32> {
        self.drag.take().map(|_| self.width)
    }
}

/// Per-page presentation layer wired to the relay and the panel.
pub struct PresentationLayer {
    frame: PanelFrame,
    relay: RelayHandle,
    panel: Option<mpsc::UnboundedSender<PanelEvent>>,
}

impl PresentationLayer {
    pub fn new(relay: RelayHandle, bounds: WidthBounds) -> Self {
        Self {
            frame: PanelFrame::new(bounds),
            relay,
            panel: None,
        }
    }

    /// Connects the panel controller's event channel.
    pub fn attach_panel(&mut self, panel: mpsc::UnboundedSender<PanelEvent>) {
        self.panel = Some(panel);
    }

    pub fn frame(&self) -> &PanelFrame {
        &self.frame
    }

    /// Tells the relay this layer is up. Failures are ignored.
    pub fn announce_ready(&self) {
        if self.relay.announce_ready().is_err() {
            debug!("event=announce_ready module=presentation status=relay_unavailable");
        }
    }

    /// Handles a relay signal; probes are answered with `Ready`.
    pub async fn handle_signal(&mut self, signal: PanelSignal) -> Option<PanelReply> {
        match signal {
            PanelSignal::ProbeReady => Some(PanelReply::Ready),
            PanelSignal::ToggleVisibility => {
                self.toggle().await;
                None
            }
            PanelSignal::SaveBeforeUnload => {
                self.forward(PanelEvent::SaveBeforeUnload);
                None
            }
        }
    }

    pub async fn toggle(&mut self) {
        if self.frame.is_visible() {
            self.hide();
        } else {
            self.show().await;
        }
    }

    /// Loads the saved width, then shows the panel.
    pub async fn show(&mut self) {
        let stored = match self.relay.fetch_panel_width().await {
            Ok(width) => Some(width),
            Err(err) => {
                warn!("event=panel_show module=presentation status=width_fallback error={err}");
                None
            }
        };
        self.frame.show(stored);
        info!(
            "event=panel_show module=presentation status=ok width={}",
            self.frame.width()
        );
    }

    pub fn hide(&mut self) {
        self.frame.hide();
        info!("event=panel_hide module=presentation status=ok");
    }

    /// The panel asked to close after flushing its save.
    pub fn on_close_requested(&mut self) {
        self.hide();
    }

    pub fn begin_resize(&mut self, x: i32) {
        self.frame.begin_resize(x);
    }

    pub fn drag_to(&mut self, x: i32) -> u32 {
        self.frame.drag_to(x)
    }

    /// Ends a drag and persists the final width through the relay.
    pub async fn end_resize(&mut self) -> Option<u32> {
        let width = self.frame.end_resize()?;
        match self.relay.persist_panel_width(width).await {
            Ok(stored) => Some(stored),
            Err(err) => {
                warn!("event=panel_resize module=presentation status=error width={width} error={err}");
                Some(width)
            }
        }
    }

    fn forward(&self, event: PanelEvent) {
        match &self.panel {
            Some(panel) if panel.send(event).is_ok() => {}
            _ => debug!("event=panel_forward module=presentation status=no_panel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PanelFrame;
    use crate::config::WidthBounds;

    #[test]
    fn dragging_left_widens_and_clamps() {
        let mut frame = PanelFrame::new(WidthBounds::default());
        frame.begin_resize(1_000);
        assert_eq!(frame.drag_to(900), 500);
        assert_eq!(frame.drag_to(200), 800);
        assert_eq!(frame.drag_to(1_500), 300);
        assert_eq!(frame.end_resize(), Some(300));
        assert_eq!(frame.end_resize(), None);
    }

    #[test]
    fn drag_without_begin_keeps_width() {
        let mut frame = PanelFrame::new(WidthBounds::default());
        assert_eq!(frame.drag_to(10), 400);
    }

    #[test]
    fn show_clamps_stored_width() {
        let mut frame = PanelFrame::new(WidthBounds::default());
        frame.show(Some(50));
        assert!(frame.is_visible());
        assert_eq!(frame.width(), 300);
        frame.hide();
        assert!(!frame.is_visible());
    }
}
