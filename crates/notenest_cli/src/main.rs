//! CLI entry point over a NoteNest store file.
//!
//! # Responsibility
//! - Open a store, run the relay and one panel controller against it.
//! - Apply a single command, wait for its persists, then exit.
//! - Keep output deterministic for quick local sanity checks.

use log::warn;
use notenest_core::model::text::{word_count, word_count_label};
use notenest_core::model::tree::{Folder, Note};
use notenest_core::store::SeedReport;
use notenest_core::{
    init_logging, NestConfig, NestStore, PanelController, PanelView, Relay, SaveStatus,
    SqliteKvStore, SystemClock,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const DEFAULT_DB_PATH: &str = "notenest.sqlite3";
const USAGE: &str = "usage: notenest_cli [--db PATH] [--config PATH] <command>\n\
commands:\n  ping\n  show\n  add-folder NAME\n  add-note\n  rename-folder ID NAME\n  \
rename-note ID TITLE\n  select-folder ID\n  write CONTENT\n  width [PIXELS]";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Ping,
    Show,
    AddFolder(String),
    AddNote,
    RenameFolder { id: String, name: String },
    RenameNote { id: String, title: String },
    SelectFolder(String),
    Write(String),
    Width(Option<u32>),
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    db: PathBuf,
    config: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Invocation, String> {
    let mut db = PathBuf::from(DEFAULT_DB_PATH);
    let mut config = None;
    let mut rest = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db = args.next().map(PathBuf::from).ok_or("--db needs a path")?,
            "--config" => {
                config = Some(args.next().map(PathBuf::from).ok_or("--config needs a path")?)
            }
            _ => rest.push(arg),
        }
    }

    let (name, operands) = rest.split_first().ok_or("missing command")?;
    let operand = |index: usize, what: &str| {
        operands
            .get(index)
            .cloned()
            .ok_or(format!("{name} needs {what}"))
    };
    let command = match name.as_str() {
        "ping" => Command::Ping,
        "show" => Command::Show,
        "add-folder" => Command::AddFolder(operand(0, "NAME")?),
        "add-note" => Command::AddNote,
        "rename-folder" => Command::RenameFolder {
            id: operand(0, "ID")?,
            name: operand(1, "NAME")?,
        },
        "rename-note" => Command::RenameNote {
            id: operand(0, "ID")?,
            title: operand(1, "TITLE")?,
        },
        "select-folder" => Command::SelectFolder(operand(0, "ID")?),
        "write" => Command::Write(operand(0, "CONTENT")?),
        "width" => match operands.first() {
            Some(value) => Command::Width(Some(
                value
                    .parse()
                    .map_err(|_| format!("invalid width: {value}"))?,
            )),
            None => Command::Width(None),
        },
        other => return Err(format!("unknown command: {other}")),
    };

    Ok(Invocation {
        db,
        config,
        command,
    })
}

/// Prints what the controller renders.
#[derive(Debug, Default)]
struct ConsoleView {
    status: Option<SaveStatus>,
}

impl PanelView for ConsoleView {
    fn render_folders(&mut self, _folders: &[Folder], _active: Option<&str>) {}

    fn render_notes(&mut self, _notes: &[Note], _active: Option<&str>) {}

    fn render_editor(&mut self, _note: Option<&Note>) {}

    fn set_status(&mut self, status: SaveStatus) {
        self.status = Some(status);
    }

    fn set_word_count(&mut self, _words: usize) {}

    fn alert(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn focus_title(&mut self) {}

    fn focus_editor(&mut self) {}
}

fn print_tree<V: PanelView>(panel: &PanelController<V>) {
    let tree = panel.tree();
    for folder in &tree.folders {
        let marker = if tree.active_folder.as_deref() == Some(folder.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {} [{}]", folder.name, folder.id);
        for note in &folder.notes {
            let marker = if tree.active_note.as_deref() == Some(note.id.as_str()) {
                "*"
            } else {
                " "
            };
            let words = word_count_label(word_count(&note.content));
            println!("    {marker} {} [{}] ({words})", note.title, note.id);
        }
    }
}

async fn execute(invocation: Invocation) -> Result<(), String> {
    let config = match &invocation.config {
        Some(path) => NestConfig::from_path(path).map_err(|err| err.to_string())?,
        None => NestConfig::default(),
    };
    if let Some(dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let kv = SqliteKvStore::open(&invocation.db).map_err(|err| err.to_string())?;
    let clock = Arc::new(SystemClock);
    let mut relay = Relay::new(NestStore::new(kv, config.panel_width), clock.clone());
    let SeedReport {
        seeded_tree,
        seeded_width,
    } = relay.on_installed().map_err(|err| err.to_string())?;
    if seeded_tree || seeded_width {
        println!("initialized {}", invocation.db.display());
    }
    let (handle, relay_task) = relay.spawn();

    if let Command::Width(width) = invocation.command {
        let width = match width {
            Some(width) => handle.persist_panel_width(width).await,
            None => handle.fetch_panel_width().await,
        }
        .map_err(|err| err.to_string())?;
        println!("width={width}");
        drop(handle);
        let _ = relay_task.await;
        return Ok(());
    }

    let mut panel = PanelController::new(handle, ConsoleView::default(), clock, &config);
    panel.load().await;

    let applied = match invocation.command {
        Command::Ping | Command::Show | Command::Width(_) => Ok(()),
        Command::AddFolder(name) => panel.add_folder(&name).map(|id| println!("{id}")),
        Command::AddNote => panel.add_note().map(|id| println!("{id}")),
        Command::RenameFolder { id, name } => panel.rename_folder(&id, &name).map(|_| ()),
        Command::RenameNote { id, title } => panel.rename_note(&id, &title).map(|_| ()),
        Command::SelectFolder(id) => panel.select_folder(&id),
        Command::Write(content) => {
            panel.on_editor_changed(content);
            panel.save_all();
            Ok(())
        }
    };
    panel.settle().await;
    print_tree(&panel);

    if panel.view().status == Some(SaveStatus::Unsaved) {
        warn!("event=cli_command module=cli status=unsaved");
        return Err("changes were not saved".to_string());
    }
    applied.map_err(|err| err.to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let invocation = match parse_args(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    if invocation.command == Command::Ping {
        println!("notenest_core ping={}", notenest_core::ping());
        println!("notenest_core version={}", notenest_core::core_version());
        return ExitCode::SUCCESS;
    }

    match execute(invocation).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
