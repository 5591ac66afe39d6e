use notenest_core::model::tree::{
    DocumentTree, Folder, Note, TreeError, NEW_NOTE_CONTENT, NEW_NOTE_TITLE, SEED_FOLDER_ID,
    SEED_FOLDER_NAME, SEED_NOTE_ID, SEED_NOTE_TITLE,
};

#[test]
fn seed_tree_has_one_folder_with_welcome_note() {
    let tree = DocumentTree::seed(7);

    assert_eq!(tree.folders.len(), 1);
    assert_eq!(tree.folders[0].id, SEED_FOLDER_ID);
    assert_eq!(tree.folders[0].name, SEED_FOLDER_NAME);
    let note = tree.active_note().unwrap();
    assert_eq!(note.id, SEED_NOTE_ID);
    assert_eq!(note.title, SEED_NOTE_TITLE);
    assert_eq!(note.created_at, 7);
    assert_eq!(note.updated_at, 7);
    tree.validate().unwrap();
}

#[test]
fn new_note_uses_placeholder_title_and_content() {
    let note = Note::new(100);
    assert!(note.id.starts_with("note_"));
    assert_eq!(note.title, NEW_NOTE_TITLE);
    assert_eq!(note.content, NEW_NOTE_CONTENT);
    assert_eq!(note.created_at, note.updated_at);
}

#[test]
fn generated_ids_are_unique() {
    let a = Folder::new("A").unwrap();
    let b = Folder::new("A").unwrap();
    assert_ne!(a.id, b.id);
    assert_ne!(Note::new(0).id, Note::new(0).id);
}

#[test]
fn blank_folder_names_are_rejected() {
    assert!(Folder::new("   ").is_none());
    assert_eq!(Folder::new("  Ideas ").unwrap().name, "Ideas");
}

#[test]
fn selecting_folder_picks_first_note_or_none() {
    let mut tree = DocumentTree::seed(0);
    let empty = Folder::new("Empty").unwrap();
    let empty_id = empty.id.clone();
    tree.push_folder(empty).unwrap();
    assert_eq!(tree.active_folder.as_deref(), Some(empty_id.as_str()));
    assert_eq!(tree.active_note, None);

    tree.select_folder(SEED_FOLDER_ID).unwrap();
    assert_eq!(tree.active_note.as_deref(), Some(SEED_NOTE_ID));

    tree.select_folder(&empty_id).unwrap();
    assert_eq!(tree.active_note, None);
    tree.validate().unwrap();
}

#[test]
fn selecting_unknown_ids_fails_without_change() {
    let mut tree = DocumentTree::seed(0);
    let before = tree.clone();

    assert_eq!(
        tree.select_folder("missing"),
        Err(TreeError::FolderNotFound("missing".to_string()))
    );
    assert!(matches!(
        tree.select_note("missing"),
        Err(TreeError::NoteNotFound { .. })
    ));
    assert_eq!(tree, before);
}

#[test]
fn push_note_requires_active_folder() {
    let mut tree = DocumentTree::default();
    assert_eq!(tree.push_note(Note::new(0)), Err(TreeError::NoActiveFolder));
}

#[test]
fn set_content_only_touches_on_change() {
    let mut note = Note::with_id("n", "T", "<p>a</p>", 10);
    assert!(!note.set_content("<p>a</p>", 20));
    assert_eq!(note.updated_at, 10);
    assert!(note.set_content("<p>b</p>", 30));
    assert_eq!(note.updated_at, 30);
}

#[test]
fn normalize_repairs_dangling_selection() {
    let mut tree = DocumentTree::seed(0);
    tree.active_folder = Some("gone".to_string());
    tree.active_note = Some("gone-too".to_string());

    assert!(tree.normalize());
    assert_eq!(tree.active_folder.as_deref(), Some(SEED_FOLDER_ID));
    assert_eq!(tree.active_note.as_deref(), Some(SEED_NOTE_ID));
    assert!(!tree.normalize());
    tree.validate().unwrap();
}

#[test]
fn validate_flags_note_without_folder() {
    let mut tree = DocumentTree::seed(0);
    tree.active_folder = None;
    assert!(matches!(
        tree.validate(),
        Err(TreeError::ActiveNoteWithoutFolder(_))
    ));
}

#[test]
fn decodes_tree_with_missing_optional_fields() {
    let tree: DocumentTree = serde_json::from_str(
        r#"{"folders":[{"id":"f","name":"F","notes":[
            {"id":"n","title":"T","content":"","createdAt":1,"updatedAt":2}]}]}"#,
    )
    .unwrap();
    assert_eq!(tree.active_folder, None);
    assert_eq!(tree.folders[0].notes[0].updated_at, 2);
}
