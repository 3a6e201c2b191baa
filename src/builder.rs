//! Folds routing-table records into a topology [`Graph`] of AS and prefix
//! nodes.
//!
//! Every record contributes an `origin -> prefix` edge and, when the path
//! has a distinct upstream, an `origin -> upstream` edge. Both go through
//! get-or-create, so the fold is idempotent and order independent.
use std::io::{self, BufRead};

use tracing::{debug, info, warn};

use crate::{
    graph::{attr, kind, Graph},
    input::for_each_line,
    record::PathRecord,
};

const PROGRESS_EVERY: usize = 1_000_000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub lines: usize,
    pub records: usize,
    pub malformed: usize,
    pub degenerate: usize,
    pub as_links: usize,
}

#[derive(Debug, Default)]
pub struct TopologyBuilder {
    graph: Graph,
    stats: BuildStats,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a topology from a whole routing-table text stream.
    pub fn from_reader(reader: impl BufRead) -> io::Result<(Graph, BuildStats)> {
        let mut builder = TopologyBuilder::new();
        builder.ingest_reader(reader)?;
        Ok(builder.finish())
    }

    pub fn ingest_reader(&mut self, reader: impl BufRead) -> io::Result<()> {
        for_each_line(reader, |line| {
            self.ingest_line(line);
        })?;

        info!(
            lines = self.stats.lines,
            records = self.stats.records,
            malformed = self.stats.malformed,
            degenerate = self.stats.degenerate,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "routing table ingested"
        );
        Ok(())
    }

    /// Parses and ingests one line. Returns false when the line was skipped.
    pub fn ingest_line(&mut self, line: &str) -> bool {
        self.stats.lines += 1;
        if self.stats.lines % PROGRESS_EVERY == 0 {
            debug!(lines = self.stats.lines, "ingesting routing table");
        }

        if line.trim().is_empty() {
            return false;
        }

        match PathRecord::parse(line) {
            Ok(record) => {
                self.ingest_record(&record);
                true
            }
            Err(e) => {
                debug!(error = %e, "skipping malformed record");
                self.stats.malformed += 1;
                false
            }
        }
    }

    pub fn ingest_record(&mut self, record: &PathRecord) {
        self.stats.records += 1;
        let graph = &mut self.graph;

        let origin = graph.add_or_get_node(record.origin());
        graph.set_node_attribute(origin, attr::TYPE, kind::AS);
        let prefix = graph.add_or_get_node(record.prefix());
        graph.set_node_attribute(prefix, attr::TYPE, kind::PREFIX);
        let announces = graph.add_or_get_edge(origin, prefix);
        graph.set_edge_attribute(announces, attr::TYPE, kind::AS_PREFIX);

        let upstream = match record.upstream() {
            Ok(Some(upstream)) => upstream,
            Ok(None) => return,
            Err(e) => {
                warn!(path = ?record.as_path(), error = %e, "malformed AS path");
                self.stats.degenerate += 1;
                return;
            }
        };

        let upstream = graph.add_or_get_node(upstream);
        graph.set_node_attribute(upstream, attr::TYPE, kind::AS);
        let link = graph.add_or_get_edge(origin, upstream);
        graph.set_edge_attribute(link, attr::TYPE, kind::AS_AS);
        self.stats.as_links += 1;
    }

    pub fn finish(self) -> (Graph, BuildStats) {
        (self.graph, self.stats)
    }
}
