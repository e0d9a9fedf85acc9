use anyhow::{Context, Result};
use std::path::PathBuf;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::document::{Document, EditorMode, Mode, Snapshot};
use crate::palette::{Palette, SharedPalette};
use crate::persist;
use crate::undo::{History, DEFAULT_HISTORY_LIMIT};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    #[serde(skip_serializing, skip_deserializing)]
    pub modified: bool,
    pub output_dir: Option<PathBuf>,
    pub default_mode: Mode,
    pub default_depth: u16,
    pub history_limit: usize,
    pub emit_palette_file: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        GlobalConfig {
            modified: false,
            output_dir: None,
            default_mode: Mode::Bitmap3,
            default_depth: 256,
            history_limit: DEFAULT_HISTORY_LIMIT,
            emit_palette_file: false,
        }
    }
}

pub struct EditorState {
    pub global_config_path: PathBuf,
    pub global_config: GlobalConfig,

    // Project data:
    pub palette: SharedPalette,
    pub document: Option<Document>,
    pub history: History,
}

pub fn get_global_config_path() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("", "", "GBABitmapStudio")
        .context("Unable to open global config directory.")?;
    let config_dir = project_dirs.config_dir();
    let config_path = config_dir.join("config.json");
    Ok(config_path)
}

pub fn get_initial_state() -> Result<EditorState> {
    let mut editor_state = EditorState::new(get_global_config_path()?, GlobalConfig::default());
    persist::load_global_config(&mut editor_state)?;
    editor_state.history = History::with_limit(editor_state.global_config.history_limit);
    Ok(editor_state)
}

impl EditorState {
    pub fn new(global_config_path: PathBuf, global_config: GlobalConfig) -> Self {
        let history = History::with_limit(global_config.history_limit);
        EditorState {
            global_config_path,
            global_config,
            palette: Rc::new(Palette::default()),
            document: None,
            history,
        }
    }

    /// Installs a new document, discarding the previous one and its history.
    pub fn open_document(&mut self, mut document: Document) {
        document.bind_palette(self.palette.clone());
        self.history.clear();
        self.history.push(document.snapshot());
        self.document = Some(document);
    }

    /// Swaps in a replacement palette and rebinds the open document to it.
    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = Rc::new(palette);
        if let Some(doc) = &mut self.document {
            doc.bind_palette(self.palette.clone());
        }
    }

    pub fn mode(&self) -> Mode {
        self.document
            .as_ref()
            .map_or(self.global_config.default_mode, Document::mode)
    }

    pub fn editor_mode(&self) -> EditorMode {
        self.document
            .as_ref()
            .map_or(EditorMode::Bitmap, Document::editor_mode)
    }

    pub fn document(&self) -> Result<&Document> {
        self.document.as_ref().context("No image is open.")
    }

    pub fn document_mut(&mut self) -> Result<&mut Document> {
        self.document.as_mut().context("No image is open.")
    }
}
