use std::collections::BTreeMap;
use std::fs;
use anyhow::Context;
use serde::Deserialize;
use tombstone_ot::{Broadcast, Operation, PeerId, Sequencer, SequencerConfig};

/// One batch of operations, as a peer would send it to the server.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceEntry {
    pub peer: String,
    pub ops: Vec<Operation>,
}

/// A recorded editing session. Stored as a JSON list of [`TraceEntry`] in arrival order.
#[derive(Debug, Clone)]
pub struct Trace(pub Vec<TraceEntry>);

impl Trace {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Trace(serde_json::from_str(json)?))
    }
}

pub fn parse_trace_file(filename: &str) -> Result<Trace, anyhow::Error> {
    let data = fs::read_to_string(filename)
        .with_context(|| format!("Could not read trace file {filename}"))?;
    let trace = Trace::parse(&data)
        .with_context(|| format!("Invalid trace in {filename}"))?;
    Ok(trace)
}

pub struct Replay {
    pub seq: Sequencer,
    /// Peer names in the order they first appeared.
    pub names: BTreeMap<PeerId, String>,
    /// Number of batches containing an invalid operation.
    pub rejected: usize,
}

/// Run every batch in the trace through a fresh sequencer. Peers connect the first time they
/// appear. Invalid batches are logged and skipped over.
pub fn replay<B: Broadcast + ?Sized>(trace: &Trace, config: SequencerConfig, sink: &mut B) -> Replay {
    let mut seq = Sequencer::new(config);
    let mut ids: BTreeMap<&str, PeerId> = BTreeMap::new();
    let mut names = BTreeMap::new();
    let mut rejected = 0;

    for entry in trace.0.iter() {
        let peer = *ids.entry(entry.peer.as_str()).or_insert_with(|| {
            let id = seq.connect();
            names.insert(id, entry.peer.clone());
            id
        });

        if let Err(err) = seq.handle_update(peer, &entry.ops, sink) {
            tracing::warn!(name = %entry.peer, %err, "Skipping rest of batch");
            rejected += 1;
        }
    }

    // Anything left over when broadcasts are coalesced.
    seq.flush(sink);

    Replay { seq, names, rejected }
}
