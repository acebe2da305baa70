use crate::errors::DesirePathError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct GenerationConfig {
    /// Jitter seed. `None` seeds from the OS.
    pub seed: Option<u64>,
    pub sampling: SamplingConfig,
    pub graph: GraphConfig,
    pub clustering: ClusteringConfig,
    pub optimizer: OptimizerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SamplingConfig {
    /// Fixed hex size, skips the area derived one.
    pub hex_size: Option<f64>,
    // size = sqrt(available area) / divisor, then clamped
    pub hex_area_divisor: f64,
    pub min_hex_size: f64,
    pub max_hex_size: f64,
    /// Per axis jitter as a fraction of hex size.
    pub jitter_ratio: f64,
    /// Number of stacked lattice layers. 1 is a plain hex lattice.
    pub density: u32,
    pub boundary_fill: bool,
    /// Spacing of the outside filler lattice relative to hex size.
    pub boundary_spacing_factor: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            hex_size: None,
            hex_area_divisor: 50.0,
            min_hex_size: 1.0,
            max_hex_size: 50.0,
            jitter_ratio: 0.25,
            density: 1,
            boundary_fill: true,
            boundary_spacing_factor: 3.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GraphConfig {
    /// Multiple of the expected neighbour spacing (2 * hex size) above which
    /// triangulation edges are dropped.
    pub distance_cutoff_factor: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            distance_cutoff_factor: 1.5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ClusteringConfig {
    pub initial_distance_factor: f64,
    pub max_distance_factor: f64,
    pub growth_factor: f64,
    pub target_clusters: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            initial_distance_factor: 2.0,
            max_distance_factor: 20.0,
            growth_factor: 1.2,
            target_clusters: 20,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    #[default]
    #[serde(rename = "astar", alias = "a_star")]
    AStar,
    Dijkstra,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Influence increment per path node is this times the hex size.
    pub influence_step_factor: f64,
    pub diffusion_depth: u32,
    pub search: SearchStrategy,
    pub time_limit_ms: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            influence_step_factor: 0.1,
            diffusion_depth: 1,
            search: SearchStrategy::AStar,
            time_limit_ms: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub min_paths: usize,
    pub max_paths: usize,
    /// Paths granted per candidate pair.
    pub pair_weight: f64,
    /// sqrt(available area) / (divisor * hex size) extra paths.
    pub site_scale_divisor: f64,
    pub include_edges: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            min_paths: 10,
            max_paths: 100,
            pair_weight: 0.5,
            site_scale_divisor: 10.0,
            include_edges: true,
        }
    }
}

fn positive(name: &str, value: f64) -> Result<(), DesirePathError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DesirePathError::InvalidConfig(format!(
            "{name} must be a positive finite number, got {value}"
        )))
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), DesirePathError> {
        let s = &self.sampling;
        if let Some(size) = s.hex_size {
            positive("sampling.hex_size", size)?;
        }
        positive("sampling.hex_area_divisor", s.hex_area_divisor)?;
        positive("sampling.min_hex_size", s.min_hex_size)?;
        positive("sampling.max_hex_size", s.max_hex_size)?;
        if s.min_hex_size > s.max_hex_size {
            return Err(DesirePathError::InvalidConfig(format!(
                "sampling.min_hex_size {} exceeds sampling.max_hex_size {}",
                s.min_hex_size, s.max_hex_size
            )));
        }
        if !(0.0..0.5).contains(&s.jitter_ratio) {
            return Err(DesirePathError::InvalidConfig(
                "sampling.jitter_ratio must lie in [0, 0.5)".to_string(),
            ));
        }
        if s.density == 0 {
            return Err(DesirePathError::InvalidConfig(
                "sampling.density must be at least 1".to_string(),
            ));
        }
        positive("sampling.boundary_spacing_factor", s.boundary_spacing_factor)?;

        positive("graph.distance_cutoff_factor", self.graph.distance_cutoff_factor)?;

        let c = &self.clustering;
        positive("clustering.initial_distance_factor", c.initial_distance_factor)?;
        positive("clustering.max_distance_factor", c.max_distance_factor)?;
        if c.growth_factor <= 1.0 || !c.growth_factor.is_finite() {
            return Err(DesirePathError::InvalidConfig(
                "clustering.growth_factor must be greater than 1".to_string(),
            ));
        }
        if c.target_clusters < 2 {
            return Err(DesirePathError::InvalidConfig(
                "clustering.target_clusters must be at least 2".to_string(),
            ));
        }

        positive(
            "optimizer.influence_step_factor",
            self.optimizer.influence_step_factor,
        )?;

        let o = &self.output;
        if o.min_paths == 0 || o.min_paths > o.max_paths {
            return Err(DesirePathError::InvalidConfig(format!(
                "output path bounds [{}, {}] are invalid",
                o.min_paths, o.max_paths
            )));
        }
        if !(o.pair_weight.is_finite() && o.pair_weight >= 0.0) {
            return Err(DesirePathError::InvalidConfig(
                "output.pair_weight must be a non-negative finite number".to_string(),
            ));
        }
        positive("output.site_scale_divisor", o.site_scale_divisor)?;
        Ok(())
    }
}
