use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use gba_bitmap_studio::{
    document::{Document, Export, Mode, Render},
    import, persist,
    quantize::quantize,
    state::{get_initial_state, EditorState},
};

#[derive(Parser, Debug)]
#[command(name = "gbastudio", about = "Convert images to GBA bitmap data")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert PNG files to C source and header
    Convert {
        /// Input files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Bitmap mode, 3 (direct color) or 4 (paletted)
        #[arg(long, value_parser = parse_mode)]
        mode: Option<Mode>,
        /// Palette size for mode 4 (1-256)
        #[arg(long)]
        depth: Option<u16>,
        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also write the palette as a .pal text file (mode 4)
        #[arg(long)]
        palette_file: bool,
    },
    /// Quantize a PNG and write its palette file
    Palette {
        input: PathBuf,
        #[arg(long)]
        depth: Option<u16>,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Render a saved project to PNG
    Render {
        project: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },
}

fn parse_mode(s: &str) -> Result<Mode> {
    let n: u8 = s.parse().with_context(|| format!("invalid mode {}", s))?;
    Ok(Mode::try_from(n)?)
}

fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = vec![];
    for pattern in patterns {
        let before = paths.len();
        for entry in glob::glob(pattern)? {
            paths.push(entry?);
        }
        if paths.len() == before {
            warn!("No files match {}", pattern);
        }
    }
    Ok(paths)
}

fn convert_one(path: &Path, mode: Mode, depth: u16, out_dir: &Path, palette_file: bool) -> Result<()> {
    let raster = import::load_png(path)?;
    let doc = match mode {
        Mode::Bitmap3 => Document::DirectColor(raster),
        Mode::Bitmap4 => {
            let q = quantize(&raster, depth)?;
            info!("{}: {} colors", raster.file_name, q.colors_used);
            Document::Paletted(q.image)
        }
    };
    let generated = doc.export(mode)?;
    persist::write_generated(out_dir, &generated)?;
    if palette_file {
        match doc.palette() {
            Some(pal) => {
                let pal_path = out_dir.join(format!("{}.pal", generated.name));
                persist::save_palette_file(&pal_path, pal)?;
            }
            None => warn!("{} has no palette to write", generated.name),
        }
    }
    Ok(())
}

fn run(state: &mut EditorState, command: Command) -> Result<()> {
    let config = state.global_config.clone();
    match command {
        Command::Convert {
            inputs,
            mode,
            depth,
            out,
            palette_file,
        } => {
            let mode = mode.unwrap_or(config.default_mode);
            let depth = depth.unwrap_or(config.default_depth);
            let out_dir = out
                .or(config.output_dir)
                .unwrap_or_else(|| PathBuf::from("."));
            let paths = expand_inputs(&inputs)?;
            if paths.is_empty() {
                bail!("No input files.");
            }
            for path in paths {
                convert_one(&path, mode, depth, &out_dir, palette_file || config.emit_palette_file)?;
            }
        }
        Command::Palette {
            input,
            depth,
            output,
        } => {
            let raster = import::load_png(&input)?;
            let q = quantize(&raster, depth.unwrap_or(config.default_depth))?;
            persist::save_palette_file(&output, &q.palette)?;
        }
        Command::Render { project, output } => {
            persist::load_project(state, &project)?;
            let surface = state.document()?.render()?;
            import::save_png(&output, &surface)?;
        }
    }
    Ok(())
}

pub fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut state = get_initial_state()?;
    run(&mut state, args.command)
}
