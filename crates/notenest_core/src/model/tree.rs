//! Folder/note document tree.
//!
//! # Responsibility
//! - Define the serialized shape stored under the `documentTree` key.
//! - Keep selection consistent while folders and notes are added or picked.
//! - Build the deterministic seed tree used on first run and as load fallback.
//!
//! # Invariants
//! - Folder ids are unique across the tree.
//! - Note ids are unique within their owning folder; cross-folder collisions
//!   are tolerated because notes are only resolved through `activeFolder`.
//! - `activeNote` set implies `activeFolder` set and containing that note.
//! - Empty `folders` implies no active folder and no active note.
//! - `updatedAt >= createdAt`, and touching a note never decreases `updatedAt`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Folder identifier; stable for the folder lifetime.
pub type FolderId = String;

/// Note identifier; unique within the owning folder.
pub type NoteId = String;

pub const SEED_FOLDER_ID: &str = "default";
pub const SEED_FOLDER_NAME: &str = "My Notes";
pub const SEED_NOTE_ID: &str = "welcome";
pub const SEED_NOTE_TITLE: &str = "Welcome";
pub const SEED_NOTE_CONTENT: &str = "<h1>Welcome to NoteNest!</h1>\
<p>Start taking notes with rich formatting. Create folders to organize your thoughts!</p>\
<p><strong>Pro tip:</strong> You can resize the panel by dragging its left edge.</p>";

pub const NEW_NOTE_TITLE: &str = "New Note";
pub const NEW_NOTE_CONTENT: &str = "<p>Start typing...</p>";
pub const UNTITLED_NOTE_TITLE: &str = "Untitled";

/// Errors raised when a tree operation or validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No folder is selected.
    NoActiveFolder,
    /// Folder id does not exist in the tree.
    FolderNotFound(FolderId),
    /// Note id does not exist in the referenced folder.
    NoteNotFound { folder_id: FolderId, note_id: NoteId },
    /// Another folder already uses this id.
    DuplicateFolderId(FolderId),
    /// Another note in the same folder already uses this id.
    DuplicateNoteId { folder_id: FolderId, note_id: NoteId },
    /// `activeNote` is set while `activeFolder` is not.
    ActiveNoteWithoutFolder(NoteId),
    /// `updatedAt` precedes `createdAt`.
    TimestampOrder(NoteId),
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveFolder => write!(f, "no active folder"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::NoteNotFound { folder_id, note_id } => {
                write!(f, "note {note_id} not found in folder {folder_id}")
            }
            Self::DuplicateFolderId(id) => write!(f, "duplicate folder id: {id}"),
            Self::DuplicateNoteId { folder_id, note_id } => {
                write!(f, "duplicate note id {note_id} in folder {folder_id}")
            }
            Self::ActiveNoteWithoutFolder(id) => {
                write!(f, "active note {id} is set without an active folder")
            }
            Self::TimestampOrder(id) => write!(f, "note {id} has updatedAt before createdAt"),
        }
    }
}

impl Error for TreeError {}

/// One rich-text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Rich-text markup; opaque to the model.
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed on title/content change.
    pub updated_at: i64,
}

impl Note {
    /// Creates the placeholder note inserted by "add note".
    pub fn new(now_ms: i64) -> Self {
        Self::with_id(generate_note_id(), NEW_NOTE_TITLE, NEW_NOTE_CONTENT, now_ms)
    }

    /// Creates a note with a caller-provided id. Title is normalized.
    pub fn with_id(
        id: impl Into<NoteId>,
        title: &str,
        content: impl Into<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: normalize_title(title),
            content: content.into(),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Refreshes `updated_at` without letting it move backwards.
    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = self.updated_at.max(now_ms);
    }

    /// Sets the normalized title; returns whether it changed.
    pub fn set_title(&mut self, title: &str, now_ms: i64) -> bool {
        let normalized = normalize_title(title);
        if normalized == self.title {
            return false;
        }
        self.title = normalized;
        self.touch(now_ms);
        true
    }

    /// Replaces content; returns whether it changed.
    pub fn set_content(&mut self, content: &str, now_ms: i64) -> bool {
        if content == self.content {
            return false;
        }
        self.content = content.to_string();
        self.touch(now_ms);
        true
    }
}

/// Named, ordered container of notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    /// Insertion order is display order.
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Folder {
    /// Creates an empty folder with a fresh id.
    ///
    /// Returns `None` when `name` is blank after trim.
    pub fn new(name: &str) -> Option<Self> {
        let name = normalize_display_name(name)?;
        Some(Self {
            id: generate_folder_id(),
            name,
            notes: Vec::new(),
        })
    }

    pub fn note(&self, note_id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == note_id)
    }

    pub fn note_mut(&mut self, note_id: &str) -> Option<&mut Note> {
        self.notes.iter_mut().find(|note| note.id == note_id)
    }

    pub fn first_note_id(&self) -> Option<&str> {
        self.notes.first().map(|note| note.id.as_str())
    }

    /// Renames the folder; blank or unchanged names are ignored.
    pub fn rename(&mut self, name: &str) -> bool {
        match normalize_display_name(name) {
            Some(name) if name != self.name => {
                self.name = name;
                true
            }
            _ => false,
        }
    }
}

/// The full folders/notes hierarchy for one user; the unit of persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTree {
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub active_folder: Option<FolderId>,
    #[serde(default)]
    pub active_note: Option<NoteId>,
}

impl DocumentTree {
    /// Deterministic starter tree: one "My Notes" folder with a welcome note.
    pub fn seed(now_ms: i64) -> Self {
        let welcome = Note::with_id(SEED_NOTE_ID, SEED_NOTE_TITLE, SEED_NOTE_CONTENT, now_ms);
        Self {
            folders: vec![Folder {
                id: SEED_FOLDER_ID.to_string(),
                name: SEED_FOLDER_NAME.to_string(),
                notes: vec![welcome],
            }],
            active_folder: Some(SEED_FOLDER_ID.to_string()),
            active_note: Some(SEED_NOTE_ID.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn folder(&self, folder_id: &str) -> Option<&Folder> {
        self.folders.iter().find(|folder| folder.id == folder_id)
    }

    pub fn folder_mut(&mut self, folder_id: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|folder| folder.id == folder_id)
    }

    pub fn active_folder(&self) -> Option<&Folder> {
        self.active_folder
            .as_deref()
            .and_then(|folder_id| self.folder(folder_id))
    }

    pub fn active_folder_mut(&mut self) -> Option<&mut Folder> {
        let folder_id = self.active_folder.clone()?;
        self.folder_mut(&folder_id)
    }

    pub fn active_note(&self) -> Option<&Note> {
        let note_id = self.active_note.as_deref()?;
        self.active_folder()?.note(note_id)
    }

    pub fn active_note_mut(&mut self) -> Option<&mut Note> {
        let note_id = self.active_note.clone()?;
        self.active_folder_mut()?.note_mut(&note_id)
    }

    /// Makes `folder_id` active and selects its first note (or none).
    pub fn select_folder(&mut self, folder_id: &str) -> Result<(), TreeError> {
        let folder = self
            .folder(folder_id)
            .ok_or_else(|| TreeError::FolderNotFound(folder_id.to_string()))?;
        let first_note = folder.first_note_id().map(str::to_string);
        self.active_folder = Some(folder_id.to_string());
        self.active_note = first_note;
        Ok(())
    }

    /// Makes `note_id` of the active folder the active note.
    pub fn select_note(&mut self, note_id: &str) -> Result<(), TreeError> {
        let folder = self.active_folder().ok_or(TreeError::NoActiveFolder)?;
        if folder.note(note_id).is_none() {
            return Err(TreeError::NoteNotFound {
                folder_id: folder.id.clone(),
                note_id: note_id.to_string(),
            });
        }
        self.active_note = Some(note_id.to_string());
        Ok(())
    }

    /// Appends a folder and makes it active with no active note.
    pub fn push_folder(&mut self, folder: Folder) -> Result<(), TreeError> {
        if self.folder(&folder.id).is_some() {
            return Err(TreeError::DuplicateFolderId(folder.id));
        }
        self.active_folder = Some(folder.id.clone());
        self.active_note = None;
        self.folders.push(folder);
        Ok(())
    }

    /// Appends a note to the active folder and makes it the active note.
    pub fn push_note(&mut self, note: Note) -> Result<(), TreeError> {
        let folder = self.active_folder_mut().ok_or(TreeError::NoActiveFolder)?;
        if folder.note(&note.id).is_some() {
            return Err(TreeError::DuplicateNoteId {
                folder_id: folder.id.clone(),
                note_id: note.id,
            });
        }
        let note_id = note.id.clone();
        folder.notes.push(note);
        self.active_note = Some(note_id);
        Ok(())
    }

    /// Repairs dangling selection references of a loaded tree.
    ///
    /// An unknown `activeFolder` falls back to the first folder; an unknown
    /// `activeNote` falls back to the first note of the active folder.
    /// Returns whether anything changed.
    pub fn normalize(&mut self) -> bool {
        let before = (self.active_folder.clone(), self.active_note.clone());

        if self.active_folder().is_none() {
            self.active_folder = self.folders.first().map(|folder| folder.id.clone());
            self.active_note = None;
        }

        let note_resolves = match (self.active_folder(), self.active_note.as_deref()) {
            (Some(folder), Some(note_id)) => folder.note(note_id).is_some(),
            _ => false,
        };
        if !note_resolves {
            self.active_note = self
                .active_folder()
                .and_then(Folder::first_note_id)
                .map(str::to_string);
        }

        before != (self.active_folder.clone(), self.active_note.clone())
    }

    /// Validates id uniqueness, selection references and timestamp order.
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut folder_ids = HashSet::new();
        for folder in &self.folders {
            if !folder_ids.insert(folder.id.as_str()) {
                return Err(TreeError::DuplicateFolderId(folder.id.clone()));
            }
            let mut note_ids = HashSet::new();
            for note in &folder.notes {
                if !note_ids.insert(note.id.as_str()) {
                    return Err(TreeError::DuplicateNoteId {
                        folder_id: folder.id.clone(),
                        note_id: note.id.clone(),
                    });
                }
                if note.updated_at < note.created_at {
                    return Err(TreeError::TimestampOrder(note.id.clone()));
                }
            }
        }

        match (self.active_folder.as_deref(), self.active_note.as_deref()) {
            (None, Some(note_id)) => Err(TreeError::ActiveNoteWithoutFolder(note_id.to_string())),
            (None, None) => Ok(()),
            (Some(folder_id), note_id) => {
                let folder = self
                    .folder(folder_id)
                    .ok_or_else(|| TreeError::FolderNotFound(folder_id.to_string()))?;
                match note_id {
                    Some(note_id) if folder.note(note_id).is_none() => Err(TreeError::NoteNotFound {
                        folder_id: folder_id.to_string(),
                        note_id: note_id.to_string(),
                    }),
                    _ => Ok(()),
                }
            }
        }
    }
}

/// Trims a folder display name; `None` when blank.
pub fn normalize_display_name(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trims a note title; blank titles become `"Untitled"`.
pub fn normalize_title(value: &str) -> String {
    normalize_display_name(value).unwrap_or_else(|| UNTITLED_NOTE_TITLE.to_string())
}

pub fn generate_folder_id() -> FolderId {
    format!("folder_{}", Uuid::new_v4().simple())
}

pub fn generate_note_id() -> NoteId {
    format!("note_{}", Uuid::new_v4().simple())
}
