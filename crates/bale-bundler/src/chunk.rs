//! Splitting the module graph into chunks.
//!
//! Every entry gets a chunk with the modules it reaches. When the shared chunk
//! is enabled, modules reached by at least `minChunks` entries (and everything
//! an entry named like the shared chunk reaches) move into a single shared
//! chunk instead, so each module is emitted exactly once. The shared chunk
//! carries the module runtime and must be loaded first.

use std::collections::BTreeSet;

use bale_config::BuildConfig;
use serde::Serialize;

use crate::graph::ModuleGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Entry,
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub name: String,
    pub kind: ChunkKind,
    /// Module indexes, ascending.
    pub modules: BTreeSet<usize>,
    /// Modules required when the chunk loads, in entry declaration order.
    pub bootstrap: Vec<usize>,
    /// The chunk defines the module runtime.
    pub has_runtime: bool,
    /// File name pattern for this chunk.
    pub filename: String,
}

/// Split `graph` into chunks: the shared chunk (if emitted) first, then one
/// chunk per entry in declaration order.
pub fn split_chunks(graph: &ModuleGraph, config: &BuildConfig) -> Vec<Chunk> {
    let shared_config = &config.shared_chunk;
    let entry_chunk = |name: &str, roots: &[usize], modules: BTreeSet<usize>, has_runtime| Chunk {
        name: name.to_string(),
        kind: ChunkKind::Entry,
        modules,
        bootstrap: roots.to_vec(),
        has_runtime,
        filename: config.output.filename.clone(),
    };

    if !shared_config.enabled {
        return graph
            .entries()
            .iter()
            .map(|(name, roots)| entry_chunk(name, roots, graph.reachable_from(roots), true))
            .collect();
    }

    let shared_entry = graph.entries().get(&shared_config.name);
    let mut shared: BTreeSet<usize> = shared_entry
        .map(|roots| graph.reachable_from(roots))
        .unwrap_or_default();

    let others: Vec<(&String, &Vec<usize>, BTreeSet<usize>)> = graph
        .entries()
        .iter()
        .filter(|(name, _)| **name != shared_config.name)
        .map(|(name, roots)| (name, roots, graph.reachable_from(roots)))
        .collect();

    let mut counts = vec![0usize; graph.len()];
    for (_, _, reached) in &others {
        for &index in reached {
            counts[index] += 1;
        }
    }
    for (index, &count) in counts.iter().enumerate() {
        if shared_config.min_chunks.is_met_by(count) {
            shared.insert(index);
        }
    }

    let emit_shared = shared_entry.is_some() || !shared.is_empty();
    let mut chunks = Vec::with_capacity(others.len() + 1);

    if emit_shared {
        chunks.push(Chunk {
            name: shared_config.name.clone(),
            kind: ChunkKind::Shared,
            modules: shared.clone(),
            bootstrap: shared_entry.cloned().unwrap_or_default(),
            has_runtime: true,
            filename: shared_config
                .filename
                .clone()
                .unwrap_or_else(|| config.output.filename.clone()),
        });
    }

    for (name, roots, reached) in others {
        let own = reached.difference(&shared).copied().collect();
        chunks.push(entry_chunk(name, roots, own, !emit_shared));
    }

    chunks
}
