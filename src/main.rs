//! ruins-codex CLI
//!
//! Ingests game screenshots into the codex database and exposes a few
//! maintenance commands for cropping, listing and exporting stored data.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::RgbaImage;
use serde::Serialize;

use ruins_codex::config::Settings;
use ruins_codex::ingest::intermediates::IntermediateSink;
use ruins_codex::ingest::{self, Ingestor, PipelineConfig};
use ruins_codex::ocr::TesseractEngine;
use ruins_codex::service::{AddOutcome, Codex};
use ruins_codex::store::Database;

#[derive(Parser)]
#[command(name = "ruins-codex", about = "Classify, OCR and archive game screenshots")]
struct Cli {
    /// Settings file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database path override.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Reference template directory override.
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Dump per-stage pipeline artifacts into this directory.
    #[arg(long)]
    intermediates: Option<PathBuf>,

    /// Tesseract executable override.
    #[arg(long)]
    tesseract: Option<PathBuf>,

    /// Tesseract language override.
    #[arg(long)]
    lang: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline on one image and print its record as JSON.
    Process { image: PathBuf },

    /// Write the normalized game frame next to each input as <stem>-game.png.
    Gamecrop { files: Vec<PathBuf> },

    /// Ingest screenshots into the database.
    Import { files: Vec<PathBuf> },

    /// List stored image metadata as JSON.
    Images,

    /// List stored records as JSON.
    Records,

    /// Write the stored blob for a content hash to a file.
    ExportImage { hash: String, out: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    if let Some(dir) = cli.templates {
        settings.template_dir = dir;
    }
    if let Some(dir) = cli.intermediates {
        settings.intermediates_dir = Some(dir);
    }
    if let Some(exe) = cli.tesseract {
        settings.tesseract.executable = exe;
    }
    if let Some(lang) = cli.lang {
        settings.tesseract.lang = lang;
    }

    match cli.command {
        Command::Process { image } => process(&settings, &image),
        Command::Gamecrop { files } => gamecrop(&files),
        Command::Import { files } => import(&settings, &files),
        Command::Images => print_json(&open_db(&settings)?.list_images()?),
        Command::Records => print_json(&open_db(&settings)?.list_records()?),
        Command::ExportImage { hash, out } => export_image(&settings, &hash, &out),
    }
}

fn build_ingestor(settings: &Settings) -> Ingestor {
    let mut engine = TesseractEngine::new(&settings.tesseract.executable, &settings.tesseract.lang);
    if let Some(dir) = &settings.tesseract.tessdata {
        engine = engine.with_tessdata(dir);
    }

    let intermediates = settings.intermediates_dir.as_ref().map(IntermediateSink::new);
    Ingestor::new(
        PipelineConfig { template_dir: settings.template_dir.clone(), intermediates },
        Box::new(engine),
    )
}

fn open_db(settings: &Settings) -> Result<Database> {
    if let Some(parent) = settings.db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("can't create {}", parent.display()))?;
    }
    Ok(Database::open(&settings.db_path)?)
}

fn open_image(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)
        .with_context(|| format!("can't decode {}", path.display()))?
        .to_rgba8())
}

fn file_stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("frame")
}

fn process(settings: &Settings, path: &Path) -> Result<()> {
    let ingestor = build_ingestor(settings);
    if let Some(sink) = ingestor.intermediates() {
        sink.set_prefix(file_stem(path));
    }

    let img = open_image(path)?;
    let record = ingestor.ingest(&img)?;
    print_json(&record)
}

fn gamecrop(files: &[PathBuf]) -> Result<()> {
    for path in files {
        let img = open_image(path)?;
        let frame = ingest::normalize_frame(&img)?;

        let out = path.with_file_name(format!("{}-game.png", file_stem(path)));
        frame.save(&out).with_context(|| format!("can't write {}", out.display()))?;
        println!("{}", out.display());
    }
    Ok(())
}

fn import(settings: &Settings, files: &[PathBuf]) -> Result<()> {
    let codex = Codex::new(open_db(settings)?, build_ingestor(settings));

    for path in files {
        let img = open_image(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("bad file name {}", path.display()))?;

        match codex.add_image(name, &img)? {
            AddOutcome::AlreadyImported => println!("{name}: already imported"),
            AddOutcome::Ingested { record_id } => println!("{name}: record {record_id}"),
            AddOutcome::StoredWithoutRecord => println!("{name}: stored without a record"),
        }
    }
    Ok(())
}

fn export_image(settings: &Settings, hash: &str, out: &Path) -> Result<()> {
    let data = open_db(settings)?.get_image_data(hash)?;
    fs::write(out, data).with_context(|| format!("can't write {}", out.display()))?;
    println!("{}", out.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
