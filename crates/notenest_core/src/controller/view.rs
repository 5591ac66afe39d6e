//! Rendering seam between the controller and whatever draws the panel.

use super::state::SaveStatus;
use crate::model::tree::{Folder, Note};
use log::{debug, warn};

/// Render sink driven by `PanelController`.
pub trait PanelView: Send {
    fn render_folders(&mut self, folders: &[Folder], active: Option<&str>);
    fn render_notes(&mut self, notes: &[Note], active: Option<&str>);
    /// `None` clears the title field and editor.
    fn render_editor(&mut self, note: Option<&Note>);
    fn set_status(&mut self, status: SaveStatus);
    fn set_word_count(&mut self, words: usize);
    /// Inline user-facing error, e.g. "Please select a folder first".
    fn alert(&mut self, message: &str);
    fn focus_title(&mut self);
    /// Moves focus into the note body editor.
    fn focus_editor(&mut self);
}

/// View that only logs; used where nothing is drawn.
#[derive(Debug, Default)]
pub struct HeadlessView;

impl PanelView for HeadlessView {
    fn render_folders(&mut self, folders: &[Folder], _active: Option<&str>) {
        debug!("event=render module=view target=folders count={}", folders.len());
    }

    fn render_notes(&mut self, notes: &[Note], _active: Option<&str>) {
        debug!("event=render module=view target=notes count={}", notes.len());
    }

    fn render_editor(&mut self, note: Option<&Note>) {
        debug!(
            "event=render module=view target=editor note={}",
            note.map_or("none", |note| note.id.as_str())
        );
    }

    fn set_status(&mut self, status: SaveStatus) {
        debug!("event=status module=view status={status:?}");
    }

    fn set_word_count(&mut self, _words: usize) {}

    fn alert(&mut self, message: &str) {
        warn!("event=alert module=view message={message}");
    }

    fn focus_title(&mut self) {}

    fn focus_editor(&mut self) {}
}
