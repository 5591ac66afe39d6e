//! Panel controller: the single owner of the in-memory document tree.
//!
//! # Responsibility
//! - Load the tree through the relay, with a seed fallback on timeout.
//! - Apply folder/note CRUD and selection, re-render, and persist.
//! - Track editor dirtiness and debounce autosave.
//!
//! # Invariants
//! - Selection changes and structural edits commit pending editor content
//!   and persist immediately, bypassing the debounce.
//! - A burst of editor input yields one commit+persist, `debounce` after the
//!   last input.
//! - Every persist sends the full tree; requests leave in issuance order.
//! - Persist failures are logged and shown as `Unsaved`, never fatal.
//! - A late load that lands after a provisional persist is persisted again,
//!   so the store never keeps the seed-based tree the panel no longer shows.

use crate::config::NestConfig;
use crate::model::clock::Clock;
use crate::model::text::word_count;
use crate::model::tree::{
    normalize_display_name, DocumentTree, Folder, FolderId, Note, NoteId, TreeError,
};
use crate::protocol::{RelayRequest, RelayResponse};
use crate::relay::{persisted_result, RelayError, RelayHandle};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

mod state;
mod view;

pub use state::{DebounceTimer, EditState, EditorBuffer, SaveStatus};
pub use view::{HeadlessView, PanelView};

/// Alert shown when "add note" is used without a selected folder.
pub const NO_ACTIVE_FOLDER_ALERT: &str = "Please select a folder first";

/// User input routed to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    SelectFolder(FolderId),
    SelectNote(NoteId),
    AddFolder(String),
    AddNote,
    RenameFolder { id: FolderId, name: String },
    RenameNote { id: NoteId, title: String },
    TitleInput(String),
    EditorInput(String),
    /// Explicit save (Ctrl/Cmd+S).
    Save,
    /// Close button or Escape.
    Close,
    SaveBeforeUnload,
    Shutdown,
}

/// Rejected user input. No state was mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelInputError {
    BlankName,
    NoActiveFolder,
    FolderNotFound(FolderId),
    NoteNotFound(NoteId),
    Tree(TreeError),
}

impl Display for PanelInputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name must not be blank"),
            Self::NoActiveFolder => write!(f, "no folder selected"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::NoteNotFound(id) => write!(f, "note not found in active folder: {id}"),
            Self::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PanelInputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeError> for PanelInputError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

/// Why a persist was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistReason {
    Navigation,
    Structure,
    Autosave,
    Explicit,
    Close,
    Unload,
    /// Re-persist of a late-loaded tree over a provisional one.
    Resync,
}

impl PersistReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Structure => "structure",
            Self::Autosave => "autosave",
            Self::Explicit => "explicit",
            Self::Close => "close",
            Self::Unload => "unload",
            Self::Resync => "resync",
        }
    }
}

/// Completion of one persist request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub reason: PersistReason,
    /// Autosave generation current when the persist was issued.
    pub generation: u64,
    pub result: Result<(), RelayError>,
}

struct PendingPersist {
    reason: PersistReason,
    generation: u64,
    reply: oneshot::Receiver<RelayResponse>,
}

enum Wake {
    Event(Option<PanelEvent>),
    Debounce,
    Persisted(PersistOutcome),
    LateLoad(Result<RelayResponse, oneshot::error::RecvError>),
}

pub struct PanelController<V: PanelView> {
    tree: DocumentTree,
    editor: EditorBuffer,
    /// Content last written into the active note.
    committed_content: String,
    state: EditState,
    timer: DebounceTimer,
    autosave_generation: u64,
    pending: VecDeque<PendingPersist>,
    late_load: Option<oneshot::Receiver<RelayResponse>>,
    /// A persist left while the seed tree was still provisional.
    provisional_persisted: bool,
    loaded: bool,
    relay: RelayHandle,
    view: V,
    clock: Arc<dyn Clock>,
    load_timeout: Duration,
    close_grace: Duration,
}

impl<V: PanelView> PanelController<V> {
    pub fn new(relay: RelayHandle, view: V, clock: Arc<dyn Clock>, config: &NestConfig) -> Self {
        Self {
            tree: DocumentTree::default(),
            editor: EditorBuffer::default(),
            committed_content: String::new(),
            state: EditState::Clean,
            timer: DebounceTimer::new(config.debounce()),
            autosave_generation: 0,
            pending: VecDeque::new(),
            late_load: None,
            provisional_persisted: false,
            loaded: false,
            relay,
            view,
            clock,
            load_timeout: config.load_timeout(),
            close_grace: config.close_grace(),
        }
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn editor(&self) -> &EditorBuffer {
        &self.editor
    }

    pub fn edit_state(&self) -> EditState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == EditState::Dirty
    }

    /// Whether a relay response (on time or late) has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn awaiting_late_load(&self) -> bool {
        self.late_load.is_some()
    }

    pub fn debounce_deadline(&self) -> Option<tokio::time::Instant> {
        self.timer.deadline()
    }

    pub fn pending_persists(&self) -> usize {
        self.pending.len()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Fetches the tree; falls back to the seed tree when the relay does not
    /// answer within the load timeout. A late answer is kept and applied by
    /// `step` when it arrives.
    pub async fn load(&mut self) {
        let mut reply = match self.relay.send_request(RelayRequest::FetchDocumentTree) {
            Ok(reply) => reply,
            Err(err) => {
                warn!("event=panel_load module=controller status=error error={err}");
                self.fall_back_to_seed();
                return;
            }
        };

        match tokio::time::timeout(self.load_timeout, &mut reply).await {
            Ok(Ok(response)) => self.apply_fetch_response(response),
            Ok(Err(_)) => {
                warn!("event=panel_load module=controller status=error error=relay_dropped_reply");
                self.fall_back_to_seed();
            }
            Err(_) => {
                warn!(
                    "event=panel_load module=controller status=timeout timeout_ms={}",
                    self.load_timeout.as_millis()
                );
                self.fall_back_to_seed();
                self.late_load = Some(reply);
            }
        }
    }

    /// Replaces the whole tree with one read from the store.
    pub fn apply_loaded_tree(&mut self, mut tree: DocumentTree) {
        if tree.normalize() {
            info!("event=panel_load module=controller status=repaired_selection");
        }
        info!(
            "event=panel_load module=controller status=ok folders={}",
            tree.folders.len()
        );
        self.install_tree(tree);
        self.loaded = true;
    }

    pub fn select_folder(&mut self, folder_id: &str) -> Result<(), PanelInputError> {
        if self.tree.folder(folder_id).is_none() {
            return Err(rejected(PanelInputError::FolderNotFound(folder_id.to_string())));
        }

        self.settle_editor();
        self.tree.select_folder(folder_id)?;
        self.load_editor();
        self.render_all();
        self.persist(PersistReason::Navigation);
        Ok(())
    }

    pub fn select_note(&mut self, note_id: &str) -> Result<(), PanelInputError> {
        let folder = self
            .tree
            .active_folder()
            .ok_or_else(|| rejected(PanelInputError::NoActiveFolder))?;
        if folder.note(note_id).is_none() {
            return Err(rejected(PanelInputError::NoteNotFound(note_id.to_string())));
        }

        self.settle_editor();
        self.tree.select_note(note_id)?;
        self.load_editor();
        self.render_notes();
        self.render_editor();
        self.persist(PersistReason::Navigation);
        self.view.focus_editor();
        Ok(())
    }

    /// Appends a folder and makes it active; returns its id.
    pub fn add_folder(&mut self, name: &str) -> Result<FolderId, PanelInputError> {
        let folder = Folder::new(name).ok_or_else(|| rejected(PanelInputError::BlankName))?;
        let folder_id = folder.id.clone();

        self.settle_editor();
        self.tree.push_folder(folder)?;
        self.load_editor();
        self.render_all();
        self.persist(PersistReason::Structure);
        info!("event=folder_add module=controller status=ok folder={folder_id}");
        Ok(folder_id)
    }

    /// Appends a placeholder note to the active folder; returns its id.
    pub fn add_note(&mut self) -> Result<NoteId, PanelInputError> {
        if self.tree.active_folder().is_none() {
            self.view.alert(NO_ACTIVE_FOLDER_ALERT);
            return Err(rejected(PanelInputError::NoActiveFolder));
        }

        self.settle_editor();
        let note = Note::new(self.clock.now_ms());
        let note_id = note.id.clone();
        self.tree.push_note(note)?;
        self.load_editor();
        self.render_notes();
        self.render_editor();
        self.persist(PersistReason::Structure);
        self.view.focus_title();
        info!("event=note_add module=controller status=ok note={note_id}");
        Ok(note_id)
    }

    /// Returns `Ok(false)` when `name` is blank or unchanged.
    pub fn rename_folder(&mut self, folder_id: &str, name: &str) -> Result<bool, PanelInputError> {
        let folder = self
            .tree
            .folder(folder_id)
            .ok_or_else(|| rejected(PanelInputError::FolderNotFound(folder_id.to_string())))?;
        match normalize_display_name(name) {
            Some(name) if name != folder.name => {}
            _ => return Ok(false),
        }

        self.settle_editor();
        if let Some(folder) = self.tree.folder_mut(folder_id) {
            folder.rename(name);
        }
        self.render_folders();
        self.persist(PersistReason::Structure);
        Ok(true)
    }

    /// Renames a note of the active folder. Returns `Ok(false)` when `title`
    /// is blank or unchanged.
    pub fn rename_note(&mut self, note_id: &str, title: &str) -> Result<bool, PanelInputError> {
        let note = self
            .tree
            .active_folder()
            .ok_or_else(|| rejected(PanelInputError::NoActiveFolder))?
            .note(note_id)
            .ok_or_else(|| rejected(PanelInputError::NoteNotFound(note_id.to_string())))?;
        let title = match normalize_display_name(title) {
            Some(title) if title != note.title => title,
            _ => return Ok(false),
        };

        self.settle_editor();
        let now = self.clock.now_ms();
        if let Some(note) = self
            .tree
            .active_folder_mut()
            .and_then(|folder| folder.note_mut(note_id))
        {
            note.set_title(&title, now);
        }
        if self.tree.active_note.as_deref() == Some(note_id) {
            self.editor.title = title;
        }
        self.render_notes();
        self.persist(PersistReason::Structure);
        Ok(true)
    }

    /// Live title edit of the active note; autosave picks it up.
    pub fn update_title(&mut self, title: &str) -> bool {
        let now = self.clock.now_ms();
        let Some(note) = self.tree.active_note_mut() else {
            return false;
        };
        note.set_title(title, now);
        self.editor.title = title.to_string();
        self.render_notes();
        self.mark_dirty();
        true
    }

    /// Editor input: marks dirty and restarts the debounce.
    pub fn on_editor_changed(&mut self, content: impl Into<String>) {
        self.editor.content = content.into();
        self.view.set_word_count(word_count(&self.editor.content));
        self.mark_dirty();
    }

    /// Writes editor content into the active note when it differs from the
    /// last committed snapshot. Returns whether the tree changed.
    pub fn commit_editor(&mut self) -> bool {
        if self.editor.content == self.committed_content {
            return false;
        }
        let now = self.clock.now_ms();
        let Some(note) = self.tree.active_note_mut() else {
            return false;
        };
        note.set_content(&self.editor.content, now);
        self.committed_content = self.editor.content.clone();
        debug!(
            "event=editor_commit module=controller status=ok bytes={}",
            self.committed_content.len()
        );
        true
    }

    /// Commits and persists right away.
    pub fn save_all(&mut self) {
        self.settle_editor();
        self.persist(PersistReason::Explicit);
    }

    /// Host page is going away: commit and persist.
    pub fn save_before_unload(&mut self) {
        self.settle_editor();
        self.persist(PersistReason::Unload);
    }

    /// Commits, persists, waits the grace delay, then asks to be hidden.
    ///
    /// The delay only gives the persist a head start; it does not wait for
    /// the store to acknowledge.
    pub async fn close_with_save(&mut self) {
        self.settle_editor();
        self.persist(PersistReason::Close);
        tokio::time::sleep(self.close_grace).await;
        if let Err(err) = self.relay.request_close() {
            warn!("event=panel_close module=controller status=error error={err}");
        }
    }

    /// Debounce deadline reached.
    pub fn on_debounce_elapsed(&mut self) {
        self.timer.cancel();
        if self.state != EditState::Dirty {
            return;
        }
        self.commit_editor();
        self.state = EditState::Saving;
        self.autosave_generation += 1;
        self.persist(PersistReason::Autosave);
    }

    /// Waits for a pending debounce and runs the autosave it triggers.
    /// Returns `false` when no debounce was pending.
    pub async fn await_debounce(&mut self) -> bool {
        if !self.timer.is_pending() {
            return false;
        }
        self.timer.fired().await;
        self.on_debounce_elapsed();
        true
    }

    pub fn handle_persisted(&mut self, outcome: PersistOutcome) {
        if outcome.reason == PersistReason::Autosave
            && outcome.generation == self.autosave_generation
            && self.state == EditState::Saving
        {
            self.state = EditState::Clean;
        }

        match outcome.result {
            Ok(()) => {
                debug!(
                    "event=tree_persist module=controller status=ok reason={}",
                    outcome.reason.as_str()
                );
                if self.state == EditState::Clean {
                    self.view.set_status(SaveStatus::Saved);
                }
            }
            Err(err) => {
                warn!(
                    "event=tree_persist module=controller status=error reason={} error={err}",
                    outcome.reason.as_str()
                );
                if self.state == EditState::Clean {
                    self.view.set_status(SaveStatus::Unsaved);
                }
            }
        }
    }

    /// Waits until every issued persist has completed.
    pub async fn settle(&mut self) {
        while !self.pending.is_empty() {
            let outcome = next_persisted(&mut self.pending).await;
            self.handle_persisted(outcome);
        }
    }

    /// Handles the next wake-up: user event, debounce, persist completion or
    /// late load. Returns `false` once the panel shuts down.
    pub async fn step(&mut self, events: &mut mpsc::UnboundedReceiver<PanelEvent>) -> bool {
        let wake = tokio::select! {
            event = events.recv() => Wake::Event(event),
            () = self.timer.fired() => Wake::Debounce,
            outcome = next_persisted(&mut self.pending) => Wake::Persisted(outcome),
            response = await_late_load(&mut self.late_load) => Wake::LateLoad(response),
        };

        match wake {
            Wake::Event(Some(event)) => self.dispatch(event).await,
            Wake::Event(None) => {
                self.shutdown().await;
                false
            }
            Wake::Debounce => {
                self.on_debounce_elapsed();
                true
            }
            Wake::Persisted(outcome) => {
                self.handle_persisted(outcome);
                true
            }
            Wake::LateLoad(response) => {
                self.late_load = None;
                match response {
                    Ok(response) => {
                        info!("event=panel_load module=controller status=late_response");
                        self.apply_fetch_response(response);
                        if self.provisional_persisted {
                            warn!(
                                "event=panel_load module=controller status=provisional_edits_dropped"
                            );
                            self.persist(PersistReason::Resync);
                        }
                    }
                    Err(_) => debug!("event=panel_load module=controller status=late_dropped"),
                }
                self.provisional_persisted = false;
                true
            }
        }
    }

    /// Runs until `Shutdown` or until every event sender is dropped.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<PanelEvent>) {
        info!("event=panel_run module=controller status=start");
        while self.step(&mut events).await {}
        info!("event=panel_run module=controller status=stopped");
    }

    async fn dispatch(&mut self, event: PanelEvent) -> bool {
        match event {
            PanelEvent::SelectFolder(id) => {
                let _ = self.select_folder(&id);
            }
            PanelEvent::SelectNote(id) => {
                let _ = self.select_note(&id);
            }
            PanelEvent::AddFolder(name) => {
                let _ = self.add_folder(&name);
            }
            PanelEvent::AddNote => {
                let _ = self.add_note();
            }
            PanelEvent::RenameFolder { id, name } => {
                let _ = self.rename_folder(&id, &name);
            }
            PanelEvent::RenameNote { id, title } => {
                let _ = self.rename_note(&id, &title);
            }
            PanelEvent::TitleInput(title) => {
                self.update_title(&title);
            }
            PanelEvent::EditorInput(content) => self.on_editor_changed(content),
            PanelEvent::Save => self.save_all(),
            PanelEvent::Close => self.close_with_save().await,
            PanelEvent::SaveBeforeUnload => self.save_before_unload(),
            PanelEvent::Shutdown => {
                self.shutdown().await;
                return false;
            }
        }
        true
    }

    async fn shutdown(&mut self) {
        self.save_before_unload();
        self.settle().await;
    }

    fn apply_fetch_response(&mut self, response: RelayResponse) {
        match response {
            RelayResponse::DocumentTree { data } => self.apply_loaded_tree(data),
            _ => {
                warn!("event=panel_load module=controller status=error error=unexpected_response");
                self.fall_back_to_seed();
            }
        }
    }

    /// Seeds the panel only if nothing has been populated yet.
    fn fall_back_to_seed(&mut self) {
        if !self.tree.is_empty() {
            return;
        }
        info!("event=panel_load module=controller status=seed_fallback");
        let seed = DocumentTree::seed(self.clock.now_ms());
        self.install_tree(seed);
    }

    fn install_tree(&mut self, tree: DocumentTree) {
        self.tree = tree;
        self.timer.cancel();
        self.state = EditState::Clean;
        self.load_editor();
        self.render_all();
    }

    fn mark_dirty(&mut self) {
        self.state = EditState::Dirty;
        self.timer.reschedule();
        self.view.set_status(SaveStatus::Saving);
    }

    /// Commits pending content and leaves the machine `Clean`; the caller
    /// persists right after.
    fn settle_editor(&mut self) {
        self.commit_editor();
        self.timer.cancel();
        self.state = EditState::Clean;
    }

    fn load_editor(&mut self) {
        match self.tree.active_note() {
            Some(note) => {
                self.editor = EditorBuffer {
                    title: note.title.clone(),
                    content: note.content.clone(),
                };
                self.committed_content = note.content.clone();
            }
            None => {
                self.editor = EditorBuffer::default();
                self.committed_content.clear();
            }
        }
    }

    fn persist(&mut self, reason: PersistReason) {
        let request = RelayRequest::PersistDocumentTree {
            data: self.tree.clone(),
        };
        let generation = self.autosave_generation;
        if self.late_load.is_some() {
            self.provisional_persisted = true;
        }
        match self.relay.send_request(request) {
            Ok(reply) => {
                debug!(
                    "event=tree_persist module=controller status=start reason={} in_flight={}",
                    reason.as_str(),
                    self.pending.len() + 1
                );
                self.pending.push_back(PendingPersist {
                    reason,
                    generation,
                    reply,
                });
            }
            Err(err) => self.handle_persisted(PersistOutcome {
                reason,
                generation,
                result: Err(err),
            }),
        }
    }

    fn render_all(&mut self) {
        self.render_folders();
        self.render_notes();
        self.render_editor();
    }

    fn render_folders(&mut self) {
        self.view
            .render_folders(&self.tree.folders, self.tree.active_folder.as_deref());
    }

    fn render_notes(&mut self) {
        let notes = self
            .tree
            .active_folder()
            .map(|folder| folder.notes.as_slice())
            .unwrap_or(&[]);
        self.view
            .render_notes(notes, self.tree.active_note.as_deref());
    }

    fn render_editor(&mut self) {
        self.view.render_editor(self.tree.active_note());
        self.view.set_word_count(word_count(&self.editor.content));
    }
}

fn rejected(err: PanelInputError) -> PanelInputError {
    debug!("event=input_rejected module=controller reason={err}");
    err
}

/// Resolves with the oldest in-flight persist. The relay answers in order,
/// so the front reply is always the next to complete. Cancel-safe: the
/// reply stays queued if this future is dropped.
async fn next_persisted(queue: &mut VecDeque<PendingPersist>) -> PersistOutcome {
    let Some(front) = queue.front_mut() else {
        return std::future::pending().await;
    };
    let (reason, generation) = (front.reason, front.generation);
    let reply = (&mut front.reply).await;
    queue.pop_front();

    let result = reply
        .map_err(|_| RelayError::Disconnected)
        .and_then(persisted_result);
    PersistOutcome {
        reason,
        generation,
        result,
    }
}

async fn await_late_load(
    slot: &mut Option<oneshot::Receiver<RelayResponse>>,
) -> Result<RelayResponse, oneshot::error::RecvError> {
    match slot {
        Some(reply) => reply.await,
        None => std::future::pending().await,
    }
}
