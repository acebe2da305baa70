//! End to end generation: zones -> lattice -> graph -> clusters ->
//! reinforcement -> selection. Every call owns its graph and influence
//! state; nothing survives between calls.

use crate::clustering::{Cluster, ClusterParams, cluster_pois};
use crate::config::GenerationConfig;
use crate::errors::DesirePathError;
use crate::graph::filters::FilterChain;
use crate::graph::{BuildStats, DesireGraph, GraphInput, admit_pois, build_graph};
use crate::models::{OutputEdge, OutputPoint, PoiInput, Point, ZoneInput};
use crate::optimizer::{
    CancelFlag, CandidatePair, Optimizer, OptimizerOutcome, OptimizerParams, candidate_pairs,
};
use crate::output::{Selection, select_output, target_path_count};
use crate::sampling::{HexLattice, hex_size_for_area, sample_outside, sample_zones};
use crate::zones::PolygonMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    pub hex_size: f64,
    pub lattice_points: usize,
    pub poi_points: usize,
    pub boundary_points: usize,
    pub edges: usize,
    pub clusters: usize,
    pub candidate_pairs: usize,
    pub routed_pairs: usize,
    pub unreachable_pairs: usize,
    pub target_paths: usize,
    pub selected_paths: usize,
    pub max_influence: f64,
    pub elapsed_ms: u64,
}

/// What a caller hands to an exporter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesirePathOutput {
    pub points: Vec<OutputPoint>,
    pub edges: Vec<OutputEdge>,
    pub report: GenerationReport,
}

/// Full state of one run, kept for inspection.
#[derive(Debug)]
pub struct Generation {
    pub zones: PolygonMap,
    pub hex_size: f64,
    pub graph: DesireGraph,
    pub build_stats: BuildStats,
    pub clusters: Vec<Cluster>,
    pub pairs: Vec<CandidatePair>,
    pub outcome: OptimizerOutcome,
    pub selection: Selection,
    pub report: GenerationReport,
}

impl Generation {
    pub fn into_output(self) -> DesirePathOutput {
        DesirePathOutput {
            points: self.selection.points,
            edges: self.selection.edges,
            report: self.report,
        }
    }
}

pub fn generate(
    zones: &[ZoneInput],
    pois: &[PoiInput],
    config: &GenerationConfig,
) -> Result<DesirePathOutput, DesirePathError> {
    generate_with_cancel(zones, pois, config, &CancelFlag::new())
}

pub fn generate_with_cancel(
    zones: &[ZoneInput],
    pois: &[PoiInput],
    config: &GenerationConfig,
    cancel: &CancelFlag,
) -> Result<DesirePathOutput, DesirePathError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    run_generation(zones, pois, config, &mut rng, cancel).map(Generation::into_output)
}

/// Runs the whole pipeline with a caller supplied jitter source.
pub fn run_generation<R: Rng>(
    zones: &[ZoneInput],
    pois: &[PoiInput],
    config: &GenerationConfig,
    rng: &mut R,
    cancel: &CancelFlag,
) -> Result<Generation, DesirePathError> {
    let started = Instant::now();
    config.validate()?;

    let map = PolygonMap::from_zones(zones)?;
    if map.available().is_empty() {
        return Err(DesirePathError::insufficient("no Available zone supplied"));
    }

    let admitted = admit_pois(pois, &map)?;
    if admitted.len() < 2 {
        return Err(DesirePathError::insufficient(format!(
            "{} POI(s) inside the site, at least two are required",
            admitted.len()
        )));
    }

    let available_area = map.available().area();
    let hex_size = hex_size_for_area(available_area, &config.sampling);
    tracing::info!(
        zones = zones.len(),
        pois = admitted.len(),
        available_area,
        hex_size,
        "generation started"
    );

    let sampling_start = Instant::now();
    let lattice = sample_zones(&map, hex_size, &config.sampling, rng);
    let boundary = if config.sampling.boundary_fill {
        sample_outside(&map, hex_size, &config.sampling, rng)
    } else {
        Vec::new()
    };
    tracing::info!(
        lattice = lattice.len(),
        boundary = boundary.len(),
        elapsed_ms = sampling_start.elapsed().as_millis() as u64,
        "lattice sampled"
    );

    let max_length =
        config.graph.distance_cutoff_factor * HexLattice::new(hex_size).neighbour_spacing();
    let input = GraphInput {
        lattice,
        pois: admitted,
        boundary,
    };
    let (mut graph, build_stats) = build_graph(&input, &map, &FilterChain::standard(max_length))?;

    let poi_points: Vec<Point> = graph.poi_ids().map(|id| graph.point(id).clone()).collect();
    let clustering = cluster_pois(
        &poi_points,
        &map,
        &ClusterParams::from_config(&config.clustering, hex_size),
    )?;
    if clustering.clusters.len() < 2 {
        return Err(DesirePathError::insufficient(
            "all POIs collapsed into a single cluster",
        ));
    }

    let pairs = candidate_pairs(&clustering.clusters, &map);
    if pairs.is_empty() {
        return Err(DesirePathError::insufficient(
            "every cluster pair is split by an Available boundary",
        ));
    }

    let outcome = Optimizer::new(
        &mut graph,
        OptimizerParams::from_config(&config.optimizer, hex_size),
        cancel.clone(),
    )
    .run(pairs.clone())?;

    let target = target_path_count(pairs.len(), available_area, hex_size, &config.output);
    let selection = select_output(
        &mut graph,
        &outcome,
        &map,
        target,
        config.output.include_edges,
    );

    let report = GenerationReport {
        hex_size,
        lattice_points: build_stats.lattice_points,
        poi_points: build_stats.poi_points,
        boundary_points: build_stats.boundary_points,
        edges: graph.edge_count(),
        clusters: clustering.clusters.len(),
        candidate_pairs: pairs.len(),
        routed_pairs: outcome.paths.len(),
        unreachable_pairs: outcome.unreachable,
        target_paths: target,
        selected_paths: selection.selected_paths,
        max_influence: outcome.max_influence,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    tracing::info!(
        points = selection.points.len(),
        routed = report.routed_pairs,
        elapsed_ms = report.elapsed_ms,
        "generation finished"
    );

    Ok(Generation {
        zones: map,
        hex_size,
        graph,
        build_stats,
        clusters: clustering.clusters,
        pairs,
        outcome,
        selection,
        report,
    })
}
