use notenest_core::config::WidthBounds;
use notenest_core::model::clock::ManualClock;
use notenest_core::protocol::{PanelReply, PanelSignal, RelayNotice};
use notenest_core::store::PANEL_WIDTH_KEY;
use notenest_core::{MemoryKvStore, NestStore, PanelEvent, PresentationLayer, Relay};
use std::sync::Arc;
use tokio::sync::mpsc;

fn layer_over(kv: MemoryKvStore) -> PresentationLayer {
    let relay = Relay::new(
        NestStore::new(kv, WidthBounds::default()),
        Arc::new(ManualClock::new(0)),
    );
    let (handle, _task) = relay.spawn();
    PresentationLayer::new(handle, WidthBounds::default())
}

#[tokio::test]
async fn probe_is_answered_ready() {
    let mut layer = layer_over(MemoryKvStore::new());
    assert_eq!(
        layer.handle_signal(PanelSignal::ProbeReady).await,
        Some(PanelReply::Ready)
    );
    assert!(!layer.frame().is_visible());
}

#[tokio::test]
async fn toggle_shows_with_stored_width_then_hides() {
    let kv = MemoryKvStore::new();
    let mut layer = layer_over(kv.clone());
    layer.begin_resize(0);
    layer.drag_to(-250);
    assert_eq!(layer.end_resize().await, Some(650));
    assert_eq!(kv.raw(PANEL_WIDTH_KEY).as_deref(), Some("650"));

    let mut fresh = layer_over(kv);
    assert_eq!(fresh.handle_signal(PanelSignal::ToggleVisibility).await, None);
    assert!(fresh.frame().is_visible());
    assert_eq!(fresh.frame().width(), 650);

    fresh.handle_signal(PanelSignal::ToggleVisibility).await;
    assert!(!fresh.frame().is_visible());
}

#[tokio::test]
async fn resize_is_clamped_before_persisting() {
    let kv = MemoryKvStore::new();
    let mut layer = layer_over(kv.clone());
    layer.show().await;

    layer.begin_resize(500);
    assert!(layer.frame().is_resizing());
    assert_eq!(layer.drag_to(-1_000), 800);
    assert_eq!(layer.end_resize().await, Some(800));
    assert_eq!(kv.raw(PANEL_WIDTH_KEY).as_deref(), Some("800"));
    assert_eq!(layer.end_resize().await, None);
}

#[tokio::test]
async fn show_falls_back_to_default_width_when_store_fails() {
    let kv = MemoryKvStore::new();
    kv.set_fail_reads(true);
    let mut layer = layer_over(kv);

    layer.show().await;
    assert!(layer.frame().is_visible());
    assert_eq!(layer.frame().width(), 400);
}

#[tokio::test]
async fn save_before_unload_is_forwarded_to_panel() {
    let mut layer = layer_over(MemoryKvStore::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    layer.attach_panel(tx);

    assert_eq!(layer.handle_signal(PanelSignal::SaveBeforeUnload).await, None);
    assert_eq!(rx.recv().await, Some(PanelEvent::SaveBeforeUnload));
}

#[tokio::test]
async fn close_request_hides_panel() {
    let mut layer = layer_over(MemoryKvStore::new());
    layer.show().await;
    layer.on_close_requested();
    assert!(!layer.frame().is_visible());
}

#[tokio::test]
async fn announce_ready_reaches_relay_host() {
    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let relay = Relay::new(
        NestStore::new(MemoryKvStore::new(), WidthBounds::default()),
        Arc::new(ManualClock::new(0)),
    )
    .with_notices(notice_tx);
    let (handle, _task) = relay.spawn();
    let layer = PresentationLayer::new(handle, WidthBounds::default());

    layer.announce_ready();
    assert_eq!(notices.recv().await, Some(RelayNotice::PanelReady));
}
