#![warn(clippy::all, clippy::pedantic)]

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use serde::Deserialize;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use trustflow::{
    decompose, encode_flow_matrix, flow_key, group, units_from_base, Address, DecomposedPath,
    FlowNetwork, FlowResponse, RawTransfer, TokenKind, TokenRegistry, Transfer,
};

#[derive(Parser)]
#[command(name = "trustflow-cli", version, about = "Decompose and encode trust network flows")]
struct Cli {
    /// Repeat for more logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decompose a flow solution into source→sink paths and flow groups
    Decompose {
        /// Pathfinder response (.json) or transfer rows (.csv)
        #[arg(short, long)]
        input: PathBuf,
        /// Source account
        #[arg(short, long)]
        source: Address,
        /// Sink account
        #[arg(short = 'k', long)]
        sink: Address,
        /// Solver-reported max flow in base units, for CSV inputs
        #[arg(short, long)]
        max_flow: Option<String>,
        /// Write the decomposed paths as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Encode a flow solution into operateFlowMatrix parameters
    Encode {
        /// Pathfinder response (.json) or transfer rows (.csv)
        #[arg(short, long)]
        input: PathBuf,
        /// Source account of the settlement
        #[arg(short, long)]
        from: Address,
        /// Token registry CSV with token,kind,owner rows
        #[arg(short, long)]
        tokens: Option<PathBuf>,
        /// Write the parameter JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// One row of the token registry CSV.
#[derive(Debug, Deserialize)]
struct RegistryRow {
    token: Address,
    kind: TokenKind,
    owner: Option<Address>,
}

fn read_transfers(path: &Path) -> Result<(Vec<Transfer>, Option<f64>), Box<dyn Error>> {
    if path.extension().is_some_and(|ext| ext == "json") {
        let response: FlowResponse = serde_json::from_reader(File::open(path)?)?;
        let max_flow = response.max_flow_units()?;
        Ok((response.transfers, Some(max_flow)))
    } else {
        let mut reader = csv::Reader::from_path(path)?;
        let mut transfers = Vec::new();
        for row in reader.deserialize() {
            let raw: RawTransfer = row?;
            transfers.push(Transfer::try_from(raw)?);
        }
        Ok((transfers, None))
    }
}

fn read_registry(path: &Path) -> Result<TokenRegistry, Box<dyn Error>> {
    let mut registry = TokenRegistry::new();
    let mut reader = csv::Reader::from_path(path)?;
    for row in reader.deserialize() {
        let row: RegistryRow = row?;
        match (row.kind, row.owner) {
            (TokenKind::WrappedErc20, Some(owner)) => registry.register_wrapped(row.token, owner),
            (TokenKind::WrappedErc20, None) => {
                log::warn!("wrapped token {} has no owner, treating as avatar", row.token);
                registry.register_avatar(row.token);
            }
            (TokenKind::Avatar, _) => registry.register_avatar(row.token),
        }
    }
    Ok(registry)
}

fn write_paths_csv(paths: &[DecomposedPath], path: &Path) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["flow", "partial", "nodes"])?;
    for p in paths {
        let nodes = p
            .nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("->");
        writer.write_record([&flow_key(p.flow), &p.is_partial.to_string(), &nodes])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    match cli.command {
        Command::Decompose {
            input,
            source,
            sink,
            max_flow,
            output,
        } => {
            let (transfers, reported) = read_transfers(&input)?;
            let expected = match max_flow {
                Some(value) => Some(units_from_base(&value)?),
                None => reported,
            };

            let (network, ledger) = FlowNetwork::build(&transfers);
            let result = decompose(&network, &ledger, source, sink);
            if let Some(expected) = expected {
                result.check_max_flow(expected);
            }

            let groups = group(&result.paths);
            log::info!(
                "{} paths in {} groups",
                groups.total_path_count,
                groups.group_count
            );
            for g in &groups.groups {
                let route = g
                    .example_path()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                log::info!("{} x{:<3} {route}", flow_key(g.flow), g.path_count);
            }

            if let Some(output) = output {
                write_paths_csv(&result.paths, &output)?;
            }
        }
        Command::Encode {
            input,
            from,
            tokens,
            output,
        } => {
            let (transfers, _) = read_transfers(&input)?;
            let registry = tokens
                .as_deref()
                .map(read_registry)
                .transpose()?
                .unwrap_or_default();

            match encode_flow_matrix(&transfers, from, &registry)? {
                Some(params) => {
                    let json = serde_json::to_string_pretty(&params)?;
                    match output {
                        Some(path) => std::fs::write(path, json)?,
                        None => println!("{json}"),
                    }
                }
                None => log::warn!("no transfers to encode"),
            }
        }
    }

    Ok(())
}
