//! `astopo`: builds AS topology graphs from decoded routing tables and
//! derives the AS, core, per-country and SPN views from them.
use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use as_topology::{Pipeline, PipelineConfig, Registry};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "astopo", version, about = "AS-level topology graphs from routing tables")]
struct Cli {
    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON file with pipeline settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Recompute artifacts even when they already exist
    #[arg(long, global = true)]
    force: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the topology graph from a decoded RIB and enrich it with RIR files
    Build {
        /// Routing table in `bgpdump -m` text form (optionally .bz2)
        rib: PathBuf,
        /// Directory holding the delegation files, named `<registry><suffix>`
        #[arg(long)]
        rir_dir: PathBuf,
        /// Suffix appended to each registry name, e.g. `-20231201`
        #[arg(long, default_value = "")]
        suffix: String,
        /// Registries to apply, in order (defaults to all five)
        #[arg(long, value_delimiter = ',')]
        registries: Vec<Registry>,
        /// Output graph, must end with .json
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Derive the AS, core and per-country graphs of a topology graph
    Derive {
        graph: PathBuf,
    },
    /// Extract sibling peripheral nodes around a list of seed ASes
    Spn {
        /// Newline-delimited AS numbers
        seeds: PathBuf,
        /// AS graph produced by `derive`
        as_graph: PathBuf,
        /// Directory receiving full.json and the wcc-<n>.txt component lists
        output_dir: PathBuf,
        /// Accept seeds and siblings that are not peripheral nodes
        #[arg(long)]
        no_pn_check: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<PipelineConfig>(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    config.force |= cli.force;

    match cli.command {
        Command::Build {
            rib,
            rir_dir,
            suffix,
            registries,
            output,
        } => {
            if !registries.is_empty() {
                config.registries = registries;
            }
            as_topology::ArtifactName::from_path(&output)?;

            let pipeline = Pipeline::new(config);
            let (graph, report) = pipeline
                .build(&rib, &rir_dir, &suffix, &output)
                .with_context(|| format!("building graph from {}", rib.display()))?;
            match report {
                Some(report) => tracing::info!(
                    records = report.build.records,
                    malformed = report.build.malformed,
                    inactive = report.enrich.inactive,
                    conflicts = report.enrich.conflicts,
                    "build finished"
                ),
                None => tracing::info!("build skipped, graph already present"),
            }
            println!(
                "{}: {} nodes, {} edges",
                output.display(),
                graph.node_count(),
                graph.edge_count()
            );
        }
        Command::Derive { graph } => {
            let report = Pipeline::new(config)
                .derive(&graph)
                .with_context(|| format!("deriving views of {}", graph.display()))?;
            println!("{}", report.as_graph.display());
            println!("{}", report.core.display());
            for path in report.countries {
                println!("{}", path.display());
            }
        }
        Command::Spn {
            seeds,
            as_graph,
            output_dir,
            no_pn_check,
        } => {
            config.pn_check &= !no_pn_check;
            let report = Pipeline::new(config)
                .spn(&seeds, &as_graph, &output_dir)
                .with_context(|| format!("extracting SPNs from {}", as_graph.display()))?;
            println!(
                "{}: {} component(s)",
                report.graph.display(),
                report.components.len()
            );
        }
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
