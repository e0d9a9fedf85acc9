use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{Context, Result};
use json_pretty_compact::PrettyCompactFormatter;
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Serializer;

use crate::{
    document::{Document, EditorMode, Mode, Snapshot},
    export::{self, Generated},
    palette::Palette,
    state::{EditorState, GlobalConfig},
    undo::SnapshotRecord,
};

/// On-disk form of an open project. The modes are kept beside the record so
/// the right kind of image can be rebuilt on load.
#[derive(Serialize, Deserialize, Debug)]
pub struct ProjectFile {
    pub mode: Mode,
    pub editor_mode: EditorMode,
    pub palette: Option<Palette>,
    pub record: SnapshotRecord,
}

fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    info!("Saving {}", path.display());
    let formatter = PrettyCompactFormatter::new();
    let mut data_bytes = vec![];
    let mut ser = Serializer::with_formatter(&mut data_bytes, formatter);
    data.serialize(&mut ser)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &data_bytes)?;
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    info!("Loading {}", path.display());
    let data_bytes = std::fs::read(path)?;
    let data: T = serde_json::from_slice(&data_bytes)?;
    Ok(data)
}

pub fn load_global_config(state: &mut EditorState) -> Result<()> {
    if !state.global_config_path.exists() {
        info!(
            "No config at {}, using defaults",
            state.global_config_path.display()
        );
        state.global_config = GlobalConfig::default();
        return Ok(());
    }
    state.global_config = load_json(&state.global_config_path)
        .with_context(|| format!("Unable to load config {}", state.global_config_path.display()))?;
    Ok(())
}

pub fn save_global_config(state: &mut EditorState) -> Result<()> {
    if state.global_config.modified {
        save_json(&state.global_config_path, &state.global_config)?;
        state.global_config.modified = false;
    }
    Ok(())
}

pub fn save_project(state: &EditorState, path: &Path) -> Result<()> {
    let doc = state.document()?;
    let project = ProjectFile {
        mode: doc.mode(),
        editor_mode: doc.editor_mode(),
        palette: doc.palette().map(|p| (**p).clone()),
        record: doc.snapshot(),
    };
    save_json(path, &project)
}

/// Loads a project into `state`. Nothing is installed unless the whole file
/// is understood.
pub fn load_project(state: &mut EditorState, path: &Path) -> Result<()> {
    let project: ProjectFile =
        load_json(path).with_context(|| format!("Unable to load project {}", path.display()))?;
    let palette = Rc::new(project.palette.unwrap_or_default());
    let doc = Document::from_record(&project.record, project.mode, project.editor_mode, palette.clone())
        .with_context(|| format!("Unable to restore image from {}", path.display()))?;
    state.palette = palette;
    state.open_document(doc);
    Ok(())
}

pub fn save_palette_file(path: &Path, palette: &Palette) -> Result<()> {
    info!("Saving palette {}", path.display());
    fs::write(path, export::palette_file(palette))?;
    Ok(())
}

pub fn load_palette_file(path: &Path) -> Result<Palette> {
    info!("Loading palette {}", path.display());
    let text = fs::read_to_string(path)?;
    let palette = export::parse_palette_file(&text)
        .with_context(|| format!("Unable to parse palette {}", path.display()))?;
    Ok(palette)
}

/// Writes `<name>.c` and `<name>.h` into `dir`, returning both paths.
pub fn write_generated(dir: &Path, generated: &Generated) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;
    let source_path = dir.join(format!("{}.c", generated.name));
    let header_path = dir.join(format!("{}.h", generated.name));
    info!("Writing {} and {}", source_path.display(), header_path.display());
    fs::write(&source_path, &generated.source)?;
    fs::write(&header_path, &generated.header)?;
    Ok((source_path, header_path))
}
