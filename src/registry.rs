//! Enrichment of AS nodes from the RIR delegation files
//! (`delegated-<registry>-extended-latest`).
//!
//! ```text
//! ripencc|DE|asn|3333|1|19930901|allocated
//! ```
//!
//! The first registry row that names an AS wins. Later rows for the same AS
//! are reported as conflicts and dropped, across every file applied to the
//! same graph.
use std::{
    fmt,
    io::{self, BufRead},
    ops::RangeInclusive,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::AllocationError,
    graph::{attr, Graph, NodeId},
    input::for_each_line,
};

const MIN_FIELDS: usize = 7;
const ASN_TYPE: &str = "asn";
const WILDCARD: &str = "*";

/// The five regional internet registries, in the order their files are
/// applied.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Registry {
    Arin,
    Ripencc,
    Afrinic,
    Apnic,
    Lacnic,
}

impl Registry {
    pub const ALL: [Registry; 5] = [
        Registry::Arin,
        Registry::Ripencc,
        Registry::Afrinic,
        Registry::Apnic,
        Registry::Lacnic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Registry::Arin => "arin",
            Registry::Ripencc => "ripencc",
            Registry::Afrinic => "afrinic",
            Registry::Apnic => "apnic",
            Registry::Lacnic => "lacnic",
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Registry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Registry::ALL
            .iter()
            .find(|registry| registry.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown registry {}", s))
    }
}

/// One `asn` row of a delegation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub registry: String,
    pub cc: String,
    pub start: String,
    pub count: u32,
    pub registration: String,
}

impl Allocation {
    /// `Ok(None)` for lines that are not AS allocations at all (comments,
    /// headers, address blocks); `Err` for AS rows that cannot be applied.
    pub fn parse(line: &str) -> Result<Option<Self>, AllocationError> {
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
        if line.trim().is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let fields = line.split('|').collect::<Vec<&str>>();
        if fields.get(2).map_or(true, |kind| *kind != ASN_TYPE) {
            return Ok(None);
        }

        let start = fields.get(3).copied().unwrap_or_default().trim();
        let cc = fields[1].trim();
        if cc == WILDCARD || cc.is_empty() {
            return Err(AllocationError::NoCountry {
                asn: start.to_owned(),
            });
        }
        if !is_country_code(cc) {
            return Err(AllocationError::InvalidCountry {
                asn: start.to_owned(),
                cc: cc.to_owned(),
            });
        }
        if fields.len() < MIN_FIELDS {
            return Err(AllocationError::TooFewFields {
                expected: MIN_FIELDS,
                found: fields.len(),
            });
        }

        Ok(Some(Allocation {
            registry: fields[0].trim().to_owned(),
            cc: cc.to_uppercase(),
            start: start.to_owned(),
            count: fields[4].trim().parse::<u32>().unwrap_or(1).max(1),
            registration: fields[5].trim().to_owned(),
        }))
    }

    /// Numeric ASN range of this row, `None` when the start is not a number.
    fn range(&self) -> Option<RangeInclusive<u32>> {
        let first = self.start.parse::<u32>().ok()?;
        Some(first..=first.saturating_add(self.count.saturating_sub(1)))
    }

    /// Number of AS labels the row covers.
    pub fn span(&self) -> usize {
        self.range()
            .map_or(1, |range| (range.end() - range.start()) as usize + 1)
    }

    /// Whether `label` is one of the AS labels this row covers.
    pub fn covers(&self, label: &str) -> bool {
        match self.range() {
            Some(range) => label.parse::<u32>().map_or(false, |asn| range.contains(&asn)),
            None => label == self.start,
        }
    }

    /// AS labels covered by this row, produced lazily. A numeric start
    /// expands over `count` consecutive ASNs, anything else is taken
    /// verbatim.
    pub fn asns(&self) -> impl Iterator<Item = String> + '_ {
        let numeric = self.range().map(|range| range.map(|asn| asn.to_string()));
        let verbatim = match numeric {
            Some(_) => None,
            None => Some(self.start.clone()),
        };
        numeric.into_iter().flatten().chain(verbatim)
    }
}

/// Whether `cc` can be stored as a country code and used in artifact names.
pub fn is_country_code(cc: &str) -> bool {
    !cc.is_empty() && cc.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichStats {
    pub applied: usize,
    pub inactive: usize,
    pub conflicts: usize,
    pub skipped: usize,
}

/// Applies delegation files to the AS nodes of a graph, first writer wins.
pub struct RegistryEnricher<'g> {
    graph: &'g mut Graph,
    stats: EnrichStats,
}

impl<'g> RegistryEnricher<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        RegistryEnricher {
            graph,
            stats: EnrichStats::default(),
        }
    }

    pub fn apply_reader(&mut self, registry: Registry, reader: impl BufRead) -> io::Result<()> {
        let before = self.stats;
        for_each_line(reader, |line| self.apply_line(line))?;

        info!(
            %registry,
            applied = self.stats.applied - before.applied,
            inactive = self.stats.inactive - before.inactive,
            conflicts = self.stats.conflicts - before.conflicts,
            "registry file applied"
        );
        Ok(())
    }

    pub fn apply_line(&mut self, line: &str) {
        match Allocation::parse(line) {
            Ok(Some(allocation)) => self.apply(&allocation),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, line = line.trim_end(), "skipping allocation row");
                self.stats.skipped += 1;
            }
        }
    }

    pub fn apply(&mut self, allocation: &Allocation) {
        let span = allocation.span();

        // blocks wider than the graph are matched against its labels instead
        if span > self.graph.node_count() {
            let covered: Vec<NodeId> = self
                .graph
                .nodes()
                .filter(|(_, node)| allocation.covers(node.label()))
                .map(|(id, _)| id)
                .collect();
            self.stats.inactive += span - covered.len();
            for id in covered {
                self.assign(allocation, id);
            }
            return;
        }

        for asn in allocation.asns() {
            match self.graph.index_of(&asn) {
                Some(id) => self.assign(allocation, id),
                None => self.stats.inactive += 1,
            }
        }
    }

    fn assign(&mut self, allocation: &Allocation, id: NodeId) {
        let values = [
            (attr::RIR, allocation.registry.as_str()),
            (attr::CC, allocation.cc.as_str()),
            (attr::REGISTRATION, allocation.registration.as_str()),
        ];
        for (key, value) in values {
            match self.graph.node_attribute(id, key) {
                None => {
                    self.graph.set_node_attribute(id, key, value);
                }
                Some(kept) => {
                    warn!(
                        asn = self.graph.label_of(id),
                        key,
                        kept,
                        discarded = value,
                        "conflicting allocation attribute"
                    );
                    self.stats.conflicts += 1;
                }
            }
        }
        self.stats.applied += 1;
    }

    pub fn stats(&self) -> &EnrichStats {
        &self.stats
    }

    pub fn finish(self) -> EnrichStats {
        info!(
            applied = self.stats.applied,
            inactive = self.stats.inactive,
            conflicts = self.stats.conflicts,
            skipped = self.stats.skipped,
            "enrichment finished"
        );
        self.stats
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn graph_with(labels: &[&str]) -> Graph {
        let mut graph = Graph::new();
        for label in labels {
            graph.add_or_get_node(label);
        }
        graph
    }

    #[test]
    fn test_parse() {
        let allocation = Allocation::parse("ripencc|de|asn|65001|1|20200101|allocated\n")
            .unwrap()
            .unwrap();

        assert_eq!(allocation.registry, "ripencc");
        assert_eq!(allocation.cc, "DE");
        assert_eq!(allocation.start, "65001");
        assert_eq!(allocation.count, 1);
        assert_eq!(allocation.registration, "20200101");
    }

    #[test]
    fn test_ignored_lines() {
        assert_eq!(Allocation::parse("# comment"), Ok(None));
        assert_eq!(Allocation::parse("2|arin|1700000000|1|19700101|20231201|-0500"), Ok(None));
        assert_eq!(
            Allocation::parse("arin|US|ipv4|192.0.2.0|256|20200101|allocated"),
            Ok(None)
        );
    }

    #[test]
    fn test_rejected_rows() {
        assert_eq!(
            Allocation::parse("arin|*|asn|*|12345|summary"),
            Err(AllocationError::NoCountry {
                asn: "*".to_owned()
            })
        );
        assert_eq!(
            Allocation::parse("arin|US|asn|65001|1|20200101"),
            Err(AllocationError::TooFewFields {
                expected: MIN_FIELDS,
                found: 6
            })
        );
        assert_eq!(
            Allocation::parse("lacnic||asn|65001|1|20200101|available"),
            Err(AllocationError::NoCountry {
                asn: "65001".to_owned()
            })
        );
        assert_eq!(
            Allocation::parse("arin|../US|asn|65001|1|20200101|allocated"),
            Err(AllocationError::InvalidCountry {
                asn: "65001".to_owned(),
                cc: "../US".to_owned()
            })
        );
        assert!(matches!(
            Allocation::parse("arin|A/B|asn|65001|1|20200101|allocated"),
            Err(AllocationError::InvalidCountry { .. })
        ));
    }

    #[test]
    fn test_huge_block_is_matched_against_graph() {
        let allocation = Allocation::parse("arin|US|asn|1|4294967295|20200101|allocated")
            .unwrap()
            .unwrap();
        assert_eq!(allocation.span(), u32::MAX as usize);
        assert!(allocation.covers("65001"));
        assert!(!allocation.covers("0"));
        assert!(!allocation.covers("10.0.0.0/24"));

        let mut graph = graph_with(&["65001", "4200000000", "10.0.0.0/24"]);
        let mut enricher = RegistryEnricher::new(&mut graph);
        enricher.apply(&allocation);
        let stats = enricher.finish();

        assert_eq!(stats.applied, 2);
        assert_eq!(stats.inactive, u32::MAX as usize - 2);
        let id = graph.index_of("4200000000").unwrap();
        assert_eq!(graph.node_attribute(id, attr::CC), Some("US"));
        let prefix = graph.index_of("10.0.0.0/24").unwrap();
        assert_eq!(graph.node_attribute(prefix, attr::CC), None);
    }

    #[test]
    fn test_repeated_value_is_a_conflict() {
        let mut graph = graph_with(&["65001"]);
        let mut enricher = RegistryEnricher::new(&mut graph);
        enricher.apply_line("ripencc|DE|asn|65001|1|20200101|allocated");
        enricher.apply_line("ripencc|DE|asn|65001|1|20200101|allocated");

        assert_eq!(enricher.finish().conflicts, 3);
    }

    #[test]
    fn test_block_expansion() {
        let allocation = Allocation::parse("apnic|JP|asn|64500|3|20100101|assigned")
            .unwrap()
            .unwrap();

        assert_eq!(allocation.asns().collect::<Vec<_>>(), ["64500", "64501", "64502"]);
    }

    #[test]
    fn test_first_writer_wins() {
        let mut graph = graph_with(&["65001"]);
        let mut enricher = RegistryEnricher::new(&mut graph);
        enricher.apply_line("ripencc|DE|asn|65001|1|20200101|allocated");
        enricher.apply_line("arin|US|asn|65001|1|20200102|allocated");
        let stats = enricher.finish();

        assert_eq!(stats.conflicts, 3);
        let id = graph.index_of("65001").unwrap();
        assert_eq!(graph.node_attribute(id, attr::CC), Some("DE"));
        assert_eq!(graph.node_attribute(id, attr::RIR), Some("ripencc"));
        assert_eq!(graph.node_attribute(id, attr::REGISTRATION), Some("20200101"));
    }

    #[test]
    fn test_conflicts_span_files() {
        let mut graph = graph_with(&["65001", "65002"]);
        let mut enricher = RegistryEnricher::new(&mut graph);
        enricher
            .apply_reader(
                Registry::Arin,
                "arin|US|asn|65001|1|20200101|assigned\n".as_bytes(),
            )
            .unwrap();
        enricher
            .apply_reader(
                Registry::Lacnic,
                "lacnic|BR|asn|65001|2|20200101|assigned\n".as_bytes(),
            )
            .unwrap();
        let stats = enricher.finish();

        assert_eq!(stats.applied, 3);
        let first = graph.index_of("65001").unwrap();
        let second = graph.index_of("65002").unwrap();
        assert_eq!(graph.node_attribute(first, attr::CC), Some("US"));
        assert_eq!(graph.node_attribute(second, attr::CC), Some("BR"));
    }

    #[test]
    fn test_inactive_asns() {
        let mut graph = graph_with(&["65001"]);
        let mut enricher = RegistryEnricher::new(&mut graph);
        enricher.apply_line("afrinic|ZA|asn|64999|1|20200101|allocated");
        enricher.apply_line("afrinic|ZA|asn|65001|1|20200101|allocated");
        enricher.apply_line("afrinic|*|asn|65001|1|20200101|allocated");

        assert_eq!(enricher.stats().inactive, 1);
        assert_eq!(enricher.stats().applied, 1);
        assert_eq!(enricher.stats().skipped, 1);
    }

    #[test]
    fn test_registry_names() {
        assert_eq!("RIPENCC".parse::<Registry>(), Ok(Registry::Ripencc));
        assert!("iana".parse::<Registry>().is_err());
        assert_eq!(Registry::ALL[0].to_string(), "arin");
    }
}
