//! Stage orchestration over on-disk graph artifacts.
//!
//! Every derived graph is named after the graph it comes from plus a stage
//! suffix (`rib.json` -> `rib.as.json`, `rib.core.json`, `rib.cc.DE.json`).
//! An artifact that already exists is loaded instead of recomputed, and new
//! artifacts are written atomically so an interrupted run never leaves a
//! truncated file behind to be picked up as a cache hit.
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    builder::{BuildStats, TopologyBuilder},
    components::weakly_connected_components,
    country::{country_histogram, partition_by_country},
    error::PipelineError,
    graph::Graph,
    input::{open_text, read_label_list},
    projection::{as_graph, extract_core},
    registry::{is_country_code, EnrichStats, Registry, RegistryEnricher},
    spn::{SpnExtractor, SpnStats},
};

pub const AS_STAGE: &str = "as";
pub const CORE_STAGE: &str = "core";
pub const SPN_GRAPH: &str = "full.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Require seeds and siblings to be peripheral nodes.
    pub pn_check: bool,
    /// Recompute artifacts even when they already exist.
    pub force: bool,
    /// Registries applied during enrichment, in this order.
    pub registries: Vec<Registry>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            pn_check: true,
            force: false,
            registries: Registry::ALL.to_vec(),
        }
    }
}

/// Directory and stem of a graph artifact, from which the names of its
/// derived artifacts follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    dir: PathBuf,
    stem: String,
}

impl ArtifactName {
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let stem = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(".json"))
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| PipelineError::InvalidArtifactName(path.to_path_buf()))?;

        Ok(ArtifactName {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            stem: stem.to_owned(),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.stem))
    }

    pub fn stage(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.json", self.stem, stage))
    }

    /// Partition file for `cc`, `None` when the code cannot be part of a
    /// file name.
    pub fn country(&self, cc: &str) -> Option<PathBuf> {
        is_country_code(cc).then(|| self.stage(&format!("cc.{}", cc)))
    }
}

/// Name of the text file listing the members of SPN component `index`.
pub fn component_file(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("wcc-{}.txt", index))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub build: BuildStats,
    pub enrich: EnrichStats,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeriveReport {
    pub as_graph: PathBuf,
    pub core: PathBuf,
    pub countries: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpnReport {
    pub graph: PathBuf,
    pub stats: Option<SpnStats>,
    pub components: Vec<PathBuf>,
}

fn require(path: &Path) -> Result<(), PipelineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::MissingArtifact(path.to_path_buf()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    fn is_cached(&self, path: &Path) -> bool {
        !self.config.force && path.is_file()
    }

    /// Loads the artifact at `path`, or runs `derive`, saves its result
    /// there and returns it.
    pub fn load_or_derive<F>(&self, path: &Path, derive: F) -> Result<Graph, PipelineError>
    where
        F: FnOnce() -> Result<Graph, PipelineError>,
    {
        if self.is_cached(path) {
            info!(path = %path.display(), "artifact present, loading");
            return Ok(Graph::load(path)?);
        }

        let graph = derive()?;
        graph.save(path)?;
        info!(
            path = %path.display(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "artifact written"
        );
        Ok(graph)
    }

    /// Builds the topology graph from decoded routing-table text and enriches
    /// it with the given delegation files, applied in `config.registries`
    /// order. Every input must exist before any work starts.
    pub fn build(
        &self,
        rib: &Path,
        registry_dir: &Path,
        suffix: &str,
        output: &Path,
    ) -> Result<(Graph, Option<BuildReport>), PipelineError> {
        let sources: Vec<(Registry, PathBuf)> = self
            .config
            .registries
            .iter()
            .map(|&registry| (registry, registry_dir.join(format!("{}{}", registry, suffix))))
            .collect();

        if self.is_cached(output) {
            info!(path = %output.display(), "graph already built, loading");
            return Ok((Graph::load(output)?, None));
        }

        require(rib)?;
        for (_, path) in &sources {
            require(path)?;
        }

        let (mut graph, build) = TopologyBuilder::from_reader(open_text(rib)?)?;

        let mut enricher = RegistryEnricher::new(&mut graph);
        for (registry, path) in &sources {
            debug!(%registry, path = %path.display(), "applying registry file");
            enricher.apply_reader(*registry, open_text(path)?)?;
        }
        let enrich = enricher.finish();

        graph.save(output)?;
        let report = BuildReport {
            build,
            enrich,
            nodes: graph.node_count(),
            edges: graph.edge_count(),
        };
        info!(
            path = %output.display(),
            nodes = report.nodes,
            edges = report.edges,
            "topology graph written"
        );
        Ok((graph, Some(report)))
    }

    /// AS graph, core graph and per-country partitions of a topology graph.
    pub fn derive(&self, source: &Path) -> Result<DeriveReport, PipelineError> {
        let name = ArtifactName::from_path(source)?;
        let as_path = name.stage(AS_STAGE);
        let core_path = name.stage(CORE_STAGE);

        if !self.is_cached(&as_path) {
            require(source)?;
        }
        let collapsed = self.load_or_derive(&as_path, || {
            let topology = Graph::load(source)?;
            Ok(as_graph(&topology).0)
        })?;

        self.load_or_derive(&core_path, || Ok(extract_core(&collapsed)))?;

        let histogram = country_histogram(&collapsed);
        let countries: Vec<(String, PathBuf)> = histogram
            .keys()
            .filter_map(|cc| match name.country(cc) {
                Some(path) => Some((cc.clone(), path)),
                None => {
                    warn!(%cc, nodes = histogram[cc], "skipping partition with unusable country code");
                    None
                }
            })
            .collect();

        if countries.iter().any(|(_, path)| !self.is_cached(path)) {
            let mut partitions = partition_by_country(&collapsed);
            for (cc, path) in &countries {
                if self.is_cached(path) {
                    continue;
                }
                if let Some(partition) = partitions.remove(cc) {
                    partition.save(path)?;
                    debug!(%cc, nodes = histogram[cc], path = %path.display(), "country partition written");
                }
            }
            info!(countries = countries.len(), "country partitions written");
        }

        Ok(DeriveReport {
            as_graph: as_path,
            core: core_path,
            countries: countries.into_iter().map(|(_, path)| path).collect(),
        })
    }

    /// Runs the SPN extraction for the seeds listed in `seeds` and writes the
    /// merged graph plus one member list per weakly connected component.
    pub fn spn(
        &self,
        seeds: &Path,
        source: &Path,
        output_dir: &Path,
    ) -> Result<SpnReport, PipelineError> {
        require(seeds)?;
        require(source)?;
        fs::create_dir_all(output_dir)?;

        let graph_path = output_dir.join(SPN_GRAPH);
        let mut stats = None;
        let spn = self.load_or_derive(&graph_path, || {
            let labels = read_label_list(open_text(seeds)?)?;
            let graph = Graph::load(source)?;
            let (spn, extracted) = SpnExtractor::new(&graph)
                .pn_check(self.config.pn_check)
                .extract(labels.as_slice());
            stats = Some(extracted);
            Ok(spn)
        })?;

        let components = weakly_connected_components(&spn);
        let mut files = Vec::with_capacity(components.len());
        for (index, component) in components.iter().enumerate() {
            let path = component_file(output_dir, index);
            let mut file = tempfile::NamedTempFile::new_in(output_dir)?;
            {
                let mut writer = BufWriter::new(file.as_file_mut());
                for &id in component {
                    writeln!(writer, "{}", spn.label_of(id))?;
                }
                writer.flush()?;
            }
            file.persist(&path).map_err(std::io::Error::from)?;
            files.push(path);
        }

        // leftovers from an earlier run with more components
        let mut stale = components.len();
        while component_file(output_dir, stale).is_file() {
            warn!(path = %component_file(output_dir, stale).display(), "removing stale component list");
            fs::remove_file(component_file(output_dir, stale))?;
            stale += 1;
        }

        info!(components = files.len(), dir = %output_dir.display(), "component lists written");
        Ok(SpnReport {
            graph: graph_path,
            stats,
            components: files,
        })
    }
}
