use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use unityfs::bundle::BundleFile;
use unityfs::is_serialized_file;
use unityfs::manager::{AssetManager, LoadOptions};
use unityfs::objects::math::Rectf;
use unityfs::{ClassId, Object, SerializedFile};

#[derive(Parser)]
#[command(name = "unityfs", about = "Inspect UnityFS asset bundles")]
struct Cli {
    /// Log decoder progress (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the archive header, storage blocks and entries
    Info {
        input: PathBuf,
    },
    /// List archive entries and what they contain
    List {
        input: PathBuf,
    },
    /// Load archives, decode their objects and print a summary
    Objects {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// One JSON record per line instead of a table
        #[arg(long)]
        json: bool,
        /// LoadOptions as a JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write every entry of an archive to disk
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let bundle = BundleFile::open(&input)?;
            let h = &bundle.header;
            println!("── UnityFS Archive ──────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Signature      {}", h.signature.as_str());
            println!("  Version        {}", h.version);
            println!("  Player         {}", h.engine_version);
            println!("  Engine         {}", h.engine_revision);
            println!("  Total size     {} B", h.total_size);
            println!("  Directory      {} B ({} B compressed)", h.directory_size.uncompressed, h.directory_size.compressed);
            println!("  Flags          0x{:x}", h.flags);
            println!("  Blocks ({}):", bundle.directory.blocks.len());
            for (i, b) in bundle.directory.blocks.iter().enumerate() {
                let codec = b.compression().map(|c| c.name()).unwrap_or("UNKNOWN");
                println!("    #{:<4} {:>10} → {:>10}  {}", i, b.compressed_size, b.uncompressed_size, codec);
            }
            println!("  Entries ({}):", bundle.directory.entries.len());
            for e in &bundle.directory.entries {
                println!("    {:<40} offset={:<10} size={}", e.path, e.offset, e.size);
            }
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let bundle = BundleFile::open(&input)?;
            println!("{:<40} {:>12}  Kind", "Name", "Size");
            for entry in bundle.entries() {
                let kind = if is_serialized_file(entry.data) { "serialized" } else { "resource" };
                println!("{:<40} {:>12}  {}", entry.name, entry.data.len(), kind);
            }
        }

        // ── Objects ──────────────────────────────────────────────────────────
        Commands::Objects { input, json, config } => {
            let options = match config {
                Some(path) => LoadOptions::from_json(&std::fs::read_to_string(path)?)?,
                None       => LoadOptions::default(),
            };
            let mut manager = AssetManager::new(options);
            let report = manager.load_paths(&input);
            for failure in &report.failures {
                eprintln!("load failed: {failure}");
            }
            for error in manager.decode_objects() {
                eprintln!("decode failed: {error}");
            }
            for file in manager.serialized_files() {
                for object in file.objects() {
                    let record = ObjectRecord::new(file, object);
                    if json {
                        println!("{}", serde_json::to_string(&record)?);
                    } else {
                        println!("{:<24} {:>20}  {:<14} {}",
                            record.file, record.path_id, record.class, record.name.unwrap_or(""));
                    }
                }
            }
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir } => {
            let bundle = BundleFile::open(&input)?;
            std::fs::create_dir_all(&output_dir)?;
            for entry in bundle.entries() {
                let target = output_dir.join(safe_file_name(entry.name));
                std::fs::write(&target, entry.data)?;
                println!("  wrote  {}", target.display());
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ObjectRecord<'a> {
    file:     &'a str,
    path_id:  i64,
    class_id: ClassId,
    class:    String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name:     Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    texture:  Option<TextureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rect:     Option<Rectf>,
}

#[derive(Serialize)]
struct TextureRecord {
    width:  i32,
    height: i32,
    format: i32,
    bytes:  usize,
}

impl<'a> ObjectRecord<'a> {
    fn new(file: &'a SerializedFile, object: &'a Object) -> Self {
        let class_id = object.class_id();
        Self {
            file: &file.name,
            path_id: object.path_id(),
            class_id,
            class: class_id.to_string(),
            name: object.name(),
            texture: object.as_texture2d().map(|t| TextureRecord {
                width:  t.width,
                height: t.height,
                format: t.texture_format,
                bytes:  t.resource.size(),
            }),
            rect: object.as_sprite().map(|s| s.rect),
        }
    }
}

/// Entry paths are archive-internal; keep only the last component.
fn safe_file_name(name: &str) -> &Path {
    Path::new(name).file_name().map(Path::new).unwrap_or_else(|| Path::new("entry"))
}
