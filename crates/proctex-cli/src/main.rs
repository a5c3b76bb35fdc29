//! Proctex CLI - convert procedural texture graphs between MaterialX and glTF

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use proctex_core::gltf::DEFAULT_FALLBACK_URI;
use proctex_core::prelude::*;
use std::path::{Path, PathBuf};
use tracing::Level;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "proctex")]
#[command(about = "Convert procedural texture graphs between MaterialX and glTF", long_about = None)]
#[command(version)]
struct Cli {
    /// Log every graph and material as it is converted
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert MaterialX documents to glTF
    ToGltf {
        /// A .mtlx file, or a folder searched recursively
        input: PathBuf,

        /// Output folder (defaults to each input's folder)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extra MaterialX files with node definitions
        #[arg(short, long = "library")]
        libraries: Vec<PathBuf>,

        /// Write each node's definition name
        #[arg(long)]
        nodedef_names: bool,

        /// Image used by texture slots driven by a procedural graph
        #[arg(long, default_value = DEFAULT_FALLBACK_URI)]
        fallback_uri: String,
    },

    /// Convert glTF documents to MaterialX
    ToMtlx {
        /// A .gltf file, or a folder searched recursively
        input: PathBuf,

        /// Output folder (defaults to each input's folder)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record the glTF asset block in the document's doc string
        #[arg(long)]
        add_asset_info: bool,

        /// Extra MaterialX files with node definitions
        #[arg(short, long = "library")]
        libraries: Vec<PathBuf>,
    },

    /// Check whether two MaterialX documents are equivalent
    Compare {
        /// First document
        lhs: PathBuf,

        /// Second document
        rhs: PathBuf,

        /// Attribute to leave out of the comparison (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Do not compare values
        #[arg(long)]
        skip_values: bool,

        /// Leave material nodes out of the comparison
        #[arg(long)]
        ignore_materials: bool,

        /// Round float values to this many decimals
        #[arg(long)]
        precision: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::ToGltf {
            input,
            output,
            libraries,
            nodedef_names,
            fallback_uri,
        } => {
            let options = ExportOptions {
                fallback_uri,
                write_nodedef_names: nodedef_names,
                ..ExportOptions::default()
            };
            run_to_gltf(&input, output.as_deref(), &libraries, options)?;
        }
        Commands::ToMtlx {
            input,
            output,
            add_asset_info,
            libraries,
        } => {
            run_to_mtlx(&input, output.as_deref(), &libraries, add_asset_info)?;
        }
        Commands::Compare {
            lhs,
            rhs,
            exclude,
            skip_values,
            ignore_materials,
            precision,
        } => {
            let mut options = EquivalenceOptions {
                compare_values: !skip_values,
                ignore_materials,
                precision,
                ..EquivalenceOptions::default()
            };
            for attribute in exclude {
                options = options.exclude(attribute);
            }
            run_compare(&lhs, &rhs, &options)?;
        }
    }

    Ok(())
}

/// Files under `input` with the given extension; `input` itself if it is a file
fn collect_inputs(input: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("Input not found: {}", input.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Where a converted file goes: `<output or input folder>/<stem><suffix>`
fn output_path(input: &Path, output: Option<&Path>, suffix: &str) -> Result<PathBuf> {
    let folder = match output {
        Some(folder) => folder.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    std::fs::create_dir_all(&folder)
        .with_context(|| format!("Cannot create output folder {}", folder.display()))?;
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(folder.join(format!("{stem}{suffix}")))
}

fn load_libraries(paths: &[PathBuf]) -> Result<Vec<NodeDef>> {
    let mut library = standard_library();
    for path in paths {
        let defs = load_library_file(path)
            .with_context(|| format!("Failed to load library {}", path.display()))?;
        println!("Loaded {} definitions from {}", defs.len(), path.display());
        library.extend(defs);
    }
    Ok(library)
}

fn run_to_gltf(
    input: &Path,
    output: Option<&Path>,
    libraries: &[PathBuf],
    options: ExportOptions,
) -> Result<()> {
    let library = load_libraries(libraries)?;
    let converter = Converter::new(options, ImportOptions::default());
    let files = collect_inputs(input, "mtlx")?;

    let mut converted = 0;
    for file in &files {
        let mut doc = read_document_file(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        doc.import_library(&library);

        let report = doc.validate();
        if !report.is_valid() {
            eprintln!("Skipping invalid document {}: {report}", file.display());
            continue;
        }

        match converter.materialx_to_gltf_string(&doc) {
            Ok(json) => {
                let target = output_path(file, output, ".gltf")?;
                std::fs::write(&target, json)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                println!("Wrote {}", target.display());
                converted += 1;
            }
            Err(e) => eprintln!("Failed to convert {}: {e}", file.display()),
        }
    }

    println!("Converted {converted} of {} documents", files.len());
    if converted == 0 && !files.is_empty() {
        bail!("No document could be converted");
    }
    Ok(())
}

fn run_to_mtlx(
    input: &Path,
    output: Option<&Path>,
    libraries: &[PathBuf],
    add_asset_info: bool,
) -> Result<()> {
    let library = load_libraries(libraries)?;
    let converter = Converter::new(ExportOptions::default(), ImportOptions { add_asset_info });
    let files = collect_inputs(input, "gltf")?;

    let mut converted = 0;
    for file in &files {
        let json = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;

        match converter.gltf_string_to_materialx(&json, &library) {
            Ok(doc) => {
                let report = doc.validate();
                if !report.is_valid() {
                    eprintln!("Warning: {} converted to an invalid document: {report}", file.display());
                }
                let target = output_path(file, output, "_fromgltf.mtlx")?;
                write_document_file(&doc, &target)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                println!("Wrote {}", target.display());
                converted += 1;
            }
            Err(e) => eprintln!("Failed to convert {}: {e}", file.display()),
        }
    }

    println!("Converted {converted} of {} documents", files.len());
    if converted == 0 && !files.is_empty() {
        bail!("No document could be converted");
    }
    Ok(())
}

fn run_compare(lhs: &Path, rhs: &Path, options: &EquivalenceOptions) -> Result<()> {
    let lhs_doc =
        read_document_file(lhs).with_context(|| format!("Failed to read {}", lhs.display()))?;
    let rhs_doc =
        read_document_file(rhs).with_context(|| format!("Failed to read {}", rhs.display()))?;

    match equivalent(&lhs_doc, &rhs_doc, options) {
        Ok(()) => {
            println!("{} and {} are equivalent", lhs.display(), rhs.display());
            Ok(())
        }
        Err(reason) => bail!("Documents differ: {reason}"),
    }
}
