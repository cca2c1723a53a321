use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use phenomatrix::config::EngineConfig;
use phenomatrix::export::Exporter;
use phenomatrix::import::{create_from_file, create_from_file_pair, ImportOptions};
use phenomatrix::matrix::{
    copy_and_randomize, density, stages, FractalizeOptions, Fractalizer, NodeId, SplitMethod,
};
use phenomatrix::store::snapshot::{load_snapshot, save_snapshot, snapshot_exists};
use phenomatrix::store::{MatrixStore, MemoryMatrixStore};

#[derive(Clone, Copy, ValueEnum)]
pub enum SplitMethodCli {
    Row,
    Cell,
}

impl From<SplitMethodCli> for SplitMethod {
    fn from(method: SplitMethodCli) -> Self {
        match method {
            SplitMethodCli::Row => Self::Row,
            SplitMethodCli::Cell => Self::Cell,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "phenomatrix",
    version,
    about = "Tree cross-validation for sparse gene x phenotype matrices"
)]
pub struct Cli {
    /// Config file (default: $PHENOMATRIX_CONFIG, then ./phenomatrix.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import a root matrix from a row file and an optional cell file
    Import(ImportArgs),
    /// Split a matrix into a tree of training and test sets
    Fractalize(FractalizeArgs),
    /// Write working directories for a matrix
    Prepare(PrepareArgs),
    /// Print a node and its children
    Show(NodeArgs),
    /// Create a column-density preserving random copy of a matrix
    Randomize(RandomizeArgs),
    /// Delete a matrix, its descendants and its working directory
    Delete(NodeArgs),
}

#[derive(Args)]
pub struct ImportArgs {
    /// Rows file (one `i` or `i<TAB>j` per line)
    pub rows: PathBuf,

    /// Cells file (`i<TAB>j` per line)
    pub cells: Option<PathBuf>,

    /// Matrix title (default: the rows file path)
    #[arg(long)]
    pub title: Option<String>,

    /// Row species (default: inferred from the file name)
    #[arg(long)]
    pub row_species: Option<String>,

    /// Column species (default: inferred from the file name)
    #[arg(long)]
    pub column_species: Option<String>,
}

#[derive(Args)]
pub struct FractalizeArgs {
    /// Matrix to split
    pub node: u64,

    /// Fold counts, one per level (e.g. `2,5`)
    #[arg(long, value_delimiter = ',', required = true)]
    pub folds: Vec<usize>,

    /// Keep the stored order instead of shuffling
    #[arg(long)]
    pub no_shuffle: bool,

    /// Seed for a reproducible shuffle
    #[arg(long)]
    pub seed: Option<u64>,

    /// Split method for every level (default: from config)
    #[arg(long, value_enum)]
    pub method: Option<SplitMethodCli>,
}

#[derive(Args)]
pub struct PrepareArgs {
    /// Matrix whose children become test sets
    pub node: u64,

    /// Also prepare every branch below the node
    #[arg(long)]
    pub tree: bool,
}

#[derive(Args)]
pub struct NodeArgs {
    pub node: u64,
}

#[derive(Args)]
pub struct RandomizeArgs {
    pub node: u64,

    #[arg(long)]
    pub seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::from_env(),
    }
    .context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = open_store(&config.snapshot_dir)?;
    let exporter = Exporter::new(&store, &config.work_root).with_file_prefix(&config.file_prefix);

    let modified = match cli.command {
        Command::Import(args) => {
            let mut options = ImportOptions::new();
            if let Some(title) = args.title {
                options = options.title(title);
            }
            if let Some(species) = args.row_species {
                options = options.row_species(species);
            }
            if let Some(species) = args.column_species {
                options = options.column_species(species);
            }
            let id = match &args.cells {
                Some(cells) => create_from_file_pair(&store, &args.rows, cells, options),
                None => create_from_file(&store, &args.rows, options),
            }
            .with_context(|| format!("Failed to import {}", args.rows.display()))?;
            println!("{id}");
            true
        }
        Command::Fractalize(args) => {
            let mut options = config.fractalize_options(args.folds.len());
            if args.no_shuffle {
                options = options.shuffle(false);
            }
            if let Some(seed) = args.seed {
                options = options.seed(seed);
            }
            if let Some(method) = args.method {
                options = options.methods(vec![method.into(); args.folds.len()]);
            }
            fractalize(&store, NodeId(args.node), &args.folds, options)?;
            true
        }
        Command::Prepare(args) => {
            let id = NodeId(args.node);
            let prepared = if args.tree {
                exporter.prepare_tree(id)
            } else {
                exporter.prepare_inputs(id).map(|p| vec![p])
            }
            .with_context(|| format!("Failed to prepare inputs for matrix {id}"))?;
            for p in prepared {
                let state = if p.was_created() { "created" } else { "existing" };
                println!("{state}\t{}", p.dir().display());
            }
            false
        }
        Command::Show(args) => {
            show(&store, NodeId(args.node))?;
            false
        }
        Command::Randomize(args) => {
            let mut rng = args
                .seed
                .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            let id = copy_and_randomize(&store, NodeId(args.node), &mut rng)
                .with_context(|| format!("Failed to randomize matrix {}", args.node))?;
            println!("{id}");
            true
        }
        Command::Delete(args) => {
            let id = NodeId(args.node);
            exporter
                .remove_inputs(id)
                .with_context(|| format!("Failed to remove inputs of matrix {id}"))?;
            let removed = store
                .delete_node(id)
                .with_context(|| format!("Failed to delete matrix {id}"))?;
            info!(node = %id, removed, "Deleted matrix tree");
            true
        }
    };

    if modified {
        save_snapshot(&store, &config.snapshot_dir).with_context(|| {
            format!("Failed to save snapshot to {}", config.snapshot_dir.display())
        })?;
    }
    Ok(())
}

fn open_store(dir: &Path) -> anyhow::Result<MemoryMatrixStore> {
    if snapshot_exists(dir) {
        load_snapshot(dir)
            .with_context(|| format!("Failed to load snapshot from {}", dir.display()))
    } else {
        Ok(MemoryMatrixStore::new())
    }
}

fn fractalize(
    store: &MemoryMatrixStore,
    id: NodeId,
    folds: &[usize],
    options: FractalizeOptions,
) -> anyhow::Result<()> {
    if folds.is_empty() {
        bail!("At least one fold count is required");
    }
    let record = Fractalizer::new(store, options)
        .run(id, folds)
        .with_context(|| format!("Failed to fractalize matrix {id}"))?;
    println!(
        "{}\t{} stage(s)\t{} children",
        record.id(),
        stages(store, id)?,
        store.children(id)?.len()
    );
    Ok(())
}

fn show(store: &MemoryMatrixStore, id: NodeId) -> anyhow::Result<()> {
    let record = store.node(id).with_context(|| format!("No matrix {id}"))?;
    println!("id\t{}", record.id());
    println!("title\t{}", record.title());
    println!("kind\t{:?}", record.kind());
    if let Some(parent) = record.parent() {
        println!("parent\t{parent}");
    }
    println!("rows\t{}", record.row_count());
    println!("columns\t{}", record.column_count());
    println!("cells\t{}", record.cell_count());
    println!("density\t{}", density(store, id)?);
    println!("stages\t{}", stages(store, id)?);
    for child in store.children(id)? {
        println!(
            "child\t{}\t{}\t{:?}",
            child.id(),
            child.cardinality().unwrap_or_default(),
            child.kind()
        );
    }
    Ok(())
}
