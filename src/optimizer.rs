//! Desire path reinforcement.
//!
//! Cluster pairs are routed heaviest and longest first. Every node on a found
//! path gains influence, its close neighbours gain a smaller share, and the
//! edges around those nodes get cheaper so later, lighter pairs are drawn onto
//! the corridors the heavy pairs already laid down.

use crate::clustering::Cluster;
use crate::config::{OptimizerConfig, SearchStrategy};
use crate::errors::DesirePathError;
use crate::graph::DesireGraph;
use crate::models::PointId;
use crate::pathfinding::find_path;
use crate::zones::PolygonMap;
use ahash::AHashSet as HashSet;
use itertools::Itertools;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared stop switch for a running generation.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePair {
    pub from: PointId,
    pub to: PointId,
    /// Sum of both cluster weights.
    pub weight: f64,
    pub distance: f64,
}

/// Unordered representative pairs worth routing: distinct nodes whose
/// straight connection does not cross an Available outline.
pub fn candidate_pairs(clusters: &[Cluster], zones: &PolygonMap) -> Vec<CandidatePair> {
    clusters
        .iter()
        .tuple_combinations()
        .filter(|(a, b)| a.id() != b.id())
        .filter(|(a, b)| {
            !zones
                .available()
                .crosses_boundary(a.representative.xy(), b.representative.xy())
        })
        .map(|(a, b)| CandidatePair {
            from: a.id(),
            to: b.id(),
            weight: a.weight() + b.weight(),
            distance: a.representative.distance_to(&b.representative),
        })
        .collect()
}

/// Heaviest first, longer first among equal weights.
pub fn order_pairs(pairs: &mut [CandidatePair]) {
    pairs.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then_with(|| b.distance.total_cmp(&a.distance))
    });
}

#[derive(Debug, Clone)]
pub struct RoutedPath {
    pub from: PointId,
    pub to: PointId,
    pub nodes: Vec<PointId>,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct OptimizerParams {
    /// Influence added to a path node for a pair of normalised weight 1.
    pub step: f64,
    pub diffusion_depth: u32,
    pub search: SearchStrategy,
    pub time_limit: Option<Duration>,
}

impl OptimizerParams {
    pub fn from_config(config: &OptimizerConfig, hex_size: f64) -> Self {
        Self {
            step: config.influence_step_factor * hex_size,
            diffusion_depth: config.diffusion_depth,
            search: config.search,
            time_limit: config.time_limit_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptimizerOutcome {
    pub paths: Vec<RoutedPath>,
    pub unreachable: usize,
    /// Every node that received influence, ascending.
    pub touched: Vec<PointId>,
    pub max_influence: f64,
}

pub struct Optimizer<'g> {
    graph: &'g mut DesireGraph,
    params: OptimizerParams,
    cancel: CancelFlag,
    touched: HashSet<PointId>,
}

impl<'g> Optimizer<'g> {
    pub fn new(graph: &'g mut DesireGraph, params: OptimizerParams, cancel: CancelFlag) -> Self {
        Self {
            graph,
            params,
            cancel,
            touched: HashSet::new(),
        }
    }

    /// Routes one pair and reinforces its path. `normalized_weight` scales the
    /// increment; `None` means no route exists.
    pub fn process_pair(&mut self, pair: &CandidatePair, normalized_weight: f64) -> Option<RoutedPath> {
        let path = find_path(self.graph, pair.from, pair.to, self.params.search);
        if path.is_empty() {
            tracing::debug!(from = pair.from.0, to = pair.to.0, "no route between pair, skipped");
            return None;
        }

        let increment = self.params.step * normalized_weight;
        let mut visited: HashSet<PointId> = HashSet::with_capacity(path.len() * 4);
        let mut influenced: Vec<PointId> = Vec::with_capacity(path.len() * 4);

        for &id in &path {
            if visited.insert(id) {
                self.graph.point_mut(id).influence += increment;
                influenced.push(id);
            }
        }

        if self.params.diffusion_depth > 0 {
            for &origin in &path {
                self.diffuse(origin, increment, &mut visited, &mut influenced);
            }
        }

        for &id in &influenced {
            self.graph.refresh_costs_around(id);
        }
        self.touched.extend(influenced.iter().copied());

        Some(RoutedPath {
            from: pair.from,
            to: pair.to,
            nodes: path,
            weight: normalized_weight,
        })
    }

    /// Breadth first spread from `origin` up to the configured depth. A node
    /// first reached at depth `d` gains `increment / (1 + d)^2`, once per pair.
    fn diffuse(
        &mut self,
        origin: PointId,
        increment: f64,
        visited: &mut HashSet<PointId>,
        influenced: &mut Vec<PointId>,
    ) {
        let max_depth = self.params.diffusion_depth;
        let mut reached: HashSet<PointId> = HashSet::new();
        reached.insert(origin);
        let mut queue = VecDeque::new();
        queue.push_back((origin, 0u32));

        while let Some((u, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let next_depth = depth + 1;
            let neighbours: Vec<PointId> = self.graph.neighbours(u).iter().map(|&(v, _)| v).collect();
            for v in neighbours {
                if !reached.insert(v) {
                    continue;
                }
                if visited.insert(v) {
                    let share = increment / ((1 + next_depth) as f64).powi(2);
                    self.graph.point_mut(v).influence += share;
                    influenced.push(v);
                }
                queue.push_back((v, next_depth));
            }
        }
    }

    fn check_budget(&self, started: Instant) -> Result<(), DesirePathError> {
        if self.cancel.is_cancelled() {
            return Err(DesirePathError::Cancelled);
        }
        if let Some(limit) = self.params.time_limit {
            if started.elapsed() >= limit {
                return Err(DesirePathError::TimedOut {
                    limit_ms: limit.as_millis() as u64,
                });
            }
        }
        Ok(())
    }

    /// Processes every pair in importance order. Unreachable pairs are counted
    /// and skipped.
    pub fn run(mut self, mut pairs: Vec<CandidatePair>) -> Result<OptimizerOutcome, DesirePathError> {
        let started = Instant::now();
        order_pairs(&mut pairs);

        let max_weight = pairs.iter().map(|p| p.weight).fold(0.0f64, f64::max);
        if !(max_weight > 0.0) {
            return Err(DesirePathError::insufficient(
                "candidate pairs carry no weight",
            ));
        }

        let mut outcome = OptimizerOutcome::default();
        for pair in &pairs {
            self.check_budget(started)?;
            match self.process_pair(pair, pair.weight / max_weight) {
                Some(path) => outcome.paths.push(path),
                None => outcome.unreachable += 1,
            }
        }

        let mut touched: Vec<PointId> = self.touched.into_iter().collect();
        touched.sort_unstable();
        outcome.max_influence = touched
            .iter()
            .map(|&id| self.graph.point(id).influence)
            .fold(0.0, f64::max);
        outcome.touched = touched;

        tracing::info!(
            pairs = pairs.len(),
            routed = outcome.paths.len(),
            unreachable = outcome.unreachable,
            max_influence = outcome.max_influence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "influence optimisation finished"
        );
        Ok(outcome)
    }
}
