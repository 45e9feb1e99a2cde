mod trace;

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tombstone_ot::{Operation, SequencerConfig};
use crate::trace::{parse_trace_file, replay, Replay, Trace};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Log more. Pass multiple times for more detail. (RUST_LOG overrides this.)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a recorded trace through the sequencer and print the resulting document
    Replay {
        /// Trace file to read
        #[arg(value_name = "filename", value_parser = parse_trace_file)]
        trace: Trace,

        /// Only broadcast once, at the end, instead of after every batch
        #[arg(long)]
        coalesce: bool,

        /// Print every broadcast batch as it is sent
        #[arg(short, long)]
        broadcasts: bool,

        /// Print the canonical operation log
        #[arg(short, long)]
        log: bool,

        /// Output a JSON summary instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Print statistics about the document produced by a trace
    Stats {
        /// Trace file to read
        #[arg(value_name = "filename", value_parser = parse_trace_file)]
        trace: Trace,
    },
}

#[derive(Debug, Serialize)]
struct ReplaySummary<'a> {
    text: String,
    num_ops: usize,
    rejected_batches: usize,
    broadcast_batches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    log: Option<&'a [Operation]>,
}

#[derive(Debug, Serialize)]
struct PeerStats {
    name: String,
    rev: usize,
    context_len: usize,
}

#[derive(Debug, Serialize)]
struct Stats {
    num_ops: usize,
    inserts: usize,
    deletes: usize,
    len_chars: usize,
    allocated: u64,
    tombstones: usize,
    tombstone_tree_height: u32,
    rejected_batches: usize,
    peers: Vec<PeerStats>,
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn stats(result: &Replay) -> Stats {
    let doc = result.seq.doc();
    let inserts = doc.ops().iter().filter(|op| op.is_insert()).count();

    Stats {
        num_ops: doc.num_ops(),
        inserts,
        deletes: doc.num_ops() - inserts,
        len_chars: doc.len_chars(),
        allocated: doc.allocated(),
        tombstones: doc.dels().len(),
        tombstone_tree_height: doc.dels().height(),
        rejected_batches: result.rejected,
        peers: result.seq.peers().map(|(id, peer)| PeerStats {
            name: result.names.get(&id).cloned().unwrap_or_default(),
            rev: peer.rev(),
            context_len: peer.context().len(),
        }).collect(),
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cli: Cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Replay { trace, coalesce, broadcasts, log, json } => {
            let config = SequencerConfig {
                coalesce_broadcasts: coalesce,
                ..Default::default()
            };

            let mut num_batches = 0;
            let result = replay(&trace, config, &mut |ops: &[Operation]| {
                num_batches += 1;
                if broadcasts {
                    let ops: Vec<String> = ops.iter().map(|op| op.to_string()).collect();
                    eprintln!("broadcast: [{}]", ops.join(", "));
                }
            });
            let doc = result.seq.doc();

            if json {
                let summary = ReplaySummary {
                    text: doc.text(),
                    num_ops: doc.num_ops(),
                    rejected_batches: result.rejected,
                    broadcast_batches: num_batches,
                    log: if log { Some(doc.ops()) } else { None },
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                if log {
                    for op in doc.ops() {
                        println!("{op}");
                    }
                }
                print!("{}", doc.text());
            }
        }

        Commands::Stats { trace } => {
            let result = replay(&trace, SequencerConfig::default(), &mut |_: &[Operation]| {});
            let stats = stats(&result);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
