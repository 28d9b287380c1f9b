//! CLI tool for cleaning up slide decks.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use sweep_core::{run_command, Command, CommentService, DocumentSource, HostSession, Summary};
use sweep_mem::MemoryHost;
use sweep_pptx::PptxPackage;

/// Clean up a slide deck: purge review comments, clear speaker notes,
/// remove off-canvas elements.
#[derive(Parser, Debug)]
#[command(name = "deck-sweep")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input document (.pptx archive, or .json in-memory host)
    input: PathBuf,

    /// Command to run: purge-comments, clear-notes, remove-offcanvas, or all
    #[arg(short, long, default_value = "all")]
    command: String,

    /// Output path (default: <input stem>.cleaned.<extension>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run the cleanup but don't write the cleaned document
    #[arg(long)]
    dry_run: bool,

    /// Print summaries as JSON instead of messages
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// The kind of host behind the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostFormat {
    /// A .pptx archive.
    Pptx,
    /// A JSON description of the in-memory host.
    Json,
}

impl HostFormat {
    /// Detect format from file extension.
    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    fn from_magic(bytes: &[u8]) -> Option<Self> {
        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // A JSON host starts with an object brace
        if bytes
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'{')
        {
            return Some(Self::Json);
        }

        None
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let commands = resolve_commands(&args.command)?;

    if args.verbose {
        eprintln!("Processing: {}", args.input.display());
    }

    let format = detect_format(&args.input)?;
    let summaries = match format {
        HostFormat::Pptx => process_pptx(&args, &commands)?,
        HostFormat::Json => process_json(&args, &commands)?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            println!("{}", summary.message());
        }
    }

    Ok(())
}

/// Resolve the `--command` argument into the commands to run.
fn resolve_commands(id: &str) -> Result<Vec<Command>> {
    if id == "all" {
        return Ok(Command::ALL.to_vec());
    }

    let known = Command::ALL.map(Command::id).join(", ");
    let command = sweep_core::resolve_command(id)
        .with_context(|| format!("known commands: all, {}", known))?;
    Ok(vec![command])
}

/// Detect the host format from magic bytes, falling back to the
/// extension.
fn detect_format(path: &Path) -> Result<HostFormat> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    let read = reader.read(&mut magic).with_context(|| "Failed to read file header")?;

    HostFormat::from_magic(&magic[..read])
        .or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .and_then(HostFormat::from_extension)
        })
        .ok_or_else(|| anyhow::anyhow!("Could not detect input format"))
}

/// Run the commands against a .pptx host and save the cleaned archive.
fn process_pptx(args: &Args, commands: &[Command]) -> Result<Vec<Summary>> {
    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let filename = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    let mut package = PptxPackage::open(BufReader::new(file), filename)?;
    let summaries = run_all(commands, &mut package.document, &mut package.comments)?;

    if args.dry_run {
        log::debug!("dry run, skipping save");
    } else if package.is_dirty() {
        let output = output_path(&args.input, args.output.as_ref(), "pptx");
        let out = File::create(&output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        package.save(out)?;
        if args.verbose {
            eprintln!("Written to: {}", output.display());
        }
    }

    Ok(summaries)
}

/// Run the commands against a JSON in-memory host and save it back.
fn process_json(args: &Args, commands: &[Command]) -> Result<Vec<Summary>> {
    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let mut host: MemoryHost = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    let summaries = run_all(commands, &mut host.document, &mut host.comments)?;

    if !args.dry_run {
        let output = output_path(&args.input, args.output.as_ref(), "json");
        let out = File::create(&output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        serde_json::to_writer_pretty(out, &host)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        if args.verbose {
            eprintln!("Written to: {}", output.display());
        }
    }

    Ok(summaries)
}

/// Run each command in order against one host session.
fn run_all(
    commands: &[Command],
    documents: &mut dyn DocumentSource,
    comments: &mut dyn CommentService,
) -> Result<Vec<Summary>> {
    let mut session = HostSession {
        documents,
        comments,
    };

    let mut summaries = Vec::with_capacity(commands.len());
    for &command in commands {
        summaries.push(run_command(command, &mut session)?);
    }
    Ok(summaries)
}

/// Determine the output path for the cleaned document.
fn output_path(input: &Path, output: Option<&PathBuf>, extension: &str) -> PathBuf {
    if let Some(path) = output {
        return path.clone();
    }

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let filename = format!("{}.cleaned.{}", stem, extension);

    match input.parent() {
        Some(parent) => parent.join(filename),
        None => PathBuf::from(filename),
    }
}
