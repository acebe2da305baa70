//! Graph construction: Delaunay triangulation of the sampled nodes, pruned
//! by the zone aware filter chain.

pub mod filters;

use crate::errors::DesirePathError;
use crate::geometry_utils::EPS_POS;
use crate::models::{Edge, EdgeId, PoiInput, Point, PointId, PointOrigin};
use crate::zones::PolygonMap;
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use delaunator::{EMPTY, Point as DPoint, next_halfedge, triangulate};
use filters::FilterChain;
use std::time::Instant;

/// Nodes plus undirected, cost carrying edges. Each edge is stored once and
/// reachable from both endpoints through the incidence lists.
#[derive(Debug, Clone, Default)]
pub struct DesireGraph {
    points: Vec<Point>,
    edges: Vec<Edge>,
    incidence: Vec<Vec<(PointId, EdgeId)>>,
    lookup: HashMap<(PointId, PointId), EdgeId>,
}

#[inline]
fn edge_key(a: PointId, b: PointId) -> (PointId, PointId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl DesireGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, x: f64, y: f64, origin: PointOrigin) -> PointId {
        let id = PointId(self.points.len() as u32);
        self.points.push(Point::new(id, x, y, origin));
        self.incidence.push(Vec::new());
        id
    }

    pub fn add_poi(&mut self, poi: &PoiInput) -> PointId {
        let id = PointId(self.points.len() as u32);
        self.points.push(Point::poi(id, poi));
        self.incidence.push(Vec::new());
        id
    }

    /// Adds an undirected edge costed at its Euclidean length. Returns `None`
    /// for self loops, unknown endpoints and coincident endpoints; an
    /// existing edge is returned as is.
    pub fn add_edge(&mut self, a: PointId, b: PointId) -> Option<EdgeId> {
        if a == b || a.index() >= self.points.len() || b.index() >= self.points.len() {
            return None;
        }
        let key = edge_key(a, b);
        if let Some(&existing) = self.lookup.get(&key) {
            return Some(existing);
        }
        let length = self.points[a.index()].distance_to(&self.points[b.index()]);
        if !(length > EPS_POS) || !length.is_finite() {
            return None;
        }
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            from: key.0,
            to: key.1,
            length,
            cost: length,
        });
        self.incidence[a.index()].push((b, id));
        self.incidence[b.index()].push((a, id));
        self.lookup.insert(key, id);
        Some(id)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point(&self, id: PointId) -> &Point {
        &self.points[id.index()]
    }

    pub fn point_mut(&mut self, id: PointId) -> &mut Point {
        &mut self.points[id.index()]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.points.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, id: PointId) -> bool {
        id.index() < self.points.len()
    }

    /// `(neighbour, edge)` pairs incident to `id`.
    pub fn neighbours(&self, id: PointId) -> &[(PointId, EdgeId)] {
        self.incidence
            .get(id.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn edge_between(&self, a: PointId, b: PointId) -> Option<EdgeId> {
        self.lookup.get(&edge_key(a, b)).copied()
    }

    pub fn cost(&self, a: PointId, b: PointId) -> Option<f64> {
        self.edge_between(a, b).map(|e| self.edges[e.index()].cost)
    }

    /// Rewrites the cost of every edge incident to `id` as
    /// `length / (1 + influence(a) + influence(b))`.
    pub fn refresh_costs_around(&mut self, id: PointId) {
        for &(other, edge) in &self.incidence[id.index()] {
            let ia = self.points[id.index()].influence;
            let ib = self.points[other.index()].influence;
            let e = &mut self.edges[edge.index()];
            e.cost = e.length / (1.0 + ia + ib);
        }
    }

    /// Restores every cost to the plain Euclidean length and clears
    /// influence and selection.
    pub fn reset(&mut self) {
        for e in &mut self.edges {
            e.cost = e.length;
        }
        for p in &mut self.points {
            p.influence = 0.0;
            p.show = false;
        }
    }

    pub fn poi_ids(&self) -> impl Iterator<Item = PointId> + '_ {
        self.points.iter().filter(|p| p.is_poi()).map(|p| p.id)
    }
}

/// Node sets fed to the triangulation.
#[derive(Debug, Clone, Default)]
pub struct GraphInput {
    pub lattice: Vec<(f64, f64)>,
    pub pois: Vec<PoiInput>,
    pub boundary: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    pub lattice_points: usize,
    pub poi_points: usize,
    pub boundary_points: usize,
    pub candidate_edges: usize,
    pub admitted_edges: usize,
    /// Rejections per filter stage, in chain order.
    pub rejected: Vec<(&'static str, usize)>,
}

/// Checks caller POIs and keeps the ones inside the render set.
/// Non-finite coordinates, bad weights and duplicate ids are hard errors,
/// POIs merely outside the drawn site are dropped.
pub fn admit_pois(pois: &[PoiInput], zones: &PolygonMap) -> Result<Vec<PoiInput>, DesirePathError> {
    let mut seen = HashSet::new();
    let mut admitted = Vec::with_capacity(pois.len());

    for poi in pois {
        if !poi.x.is_finite() || !poi.y.is_finite() {
            return Err(DesirePathError::poi(poi.id, "coordinates must be finite"));
        }
        if !poi.weight.is_finite() || poi.weight < 0.0 {
            return Err(DesirePathError::poi(
                poi.id,
                format!("weight must be finite and non-negative, got {}", poi.weight),
            ));
        }
        if !seen.insert(poi.id) {
            return Err(DesirePathError::poi(poi.id, "duplicate id"));
        }
        if zones.render().contains((poi.x, poi.y)) {
            admitted.push(poi.clone());
        } else {
            tracing::debug!(poi = poi.id, "poi outside the render set, dropped");
        }
    }
    Ok(admitted)
}

/// Unique undirected vertex pairs of the triangulation. A fully collinear
/// input has no triangles, in which case the hull chain is used.
fn triangulation_edges(coords: &[DPoint]) -> Vec<(usize, usize)> {
    if coords.len() < 2 {
        return Vec::new();
    }
    let triangulation = triangulate(coords);

    if triangulation.triangles.is_empty() {
        return triangulation
            .hull
            .windows(2)
            .map(|w| (w[0], w[1]))
            .collect();
    }

    let mut pairs = Vec::with_capacity(triangulation.halfedges.len() / 2 + 1);
    for e in 0..triangulation.triangles.len() {
        let twin = triangulation.halfedges[e];
        // each interior edge is seen twice, keep the lower half-edge
        if twin == EMPTY || e < twin {
            let a = triangulation.triangles[e];
            let b = triangulation.triangles[next_halfedge(e)];
            pairs.push((a, b));
        }
    }
    pairs
}

/// Builds the graph over lattice points, POIs and boundary filler, in that
/// id order, and admits triangulation edges through `chain`.
pub fn build_graph(
    input: &GraphInput,
    zones: &PolygonMap,
    chain: &FilterChain,
) -> Result<(DesireGraph, BuildStats), DesirePathError> {
    let start = Instant::now();
    let mut graph = DesireGraph::new();

    for &(x, y) in &input.lattice {
        graph.add_point(x, y, PointOrigin::Lattice);
    }
    for poi in &input.pois {
        graph.add_poi(poi);
    }
    for &(x, y) in &input.boundary {
        graph.add_point(x, y, PointOrigin::BoundaryFill);
    }

    if graph.node_count() < 2 {
        return Err(DesirePathError::insufficient(
            "fewer than two graph nodes to triangulate",
        ));
    }

    let coords: Vec<DPoint> = graph
        .points()
        .iter()
        .map(|p| DPoint { x: p.x, y: p.y })
        .collect();
    let candidates = triangulation_edges(&coords);

    let mut rejected = vec![0usize; chain.stages().len()];
    let mut admitted = 0usize;

    for &(a, b) in &candidates {
        let (pa, pb) = (&graph.points()[a], &graph.points()[b]);
        if pa.distance_to(pb) <= EPS_POS {
            continue;
        }
        match chain.first_rejection(pa, pb, zones) {
            Some(stage) => rejected[stage] += 1,
            None => {
                if graph.add_edge(PointId(a as u32), PointId(b as u32)).is_some() {
                    admitted += 1;
                }
            }
        }
    }

    if admitted == 0 {
        return Err(DesirePathError::insufficient(
            "no triangulation edge survived the zone filters",
        ));
    }

    let stats = BuildStats {
        lattice_points: input.lattice.len(),
        poi_points: input.pois.len(),
        boundary_points: input.boundary.len(),
        candidate_edges: candidates.len(),
        admitted_edges: admitted,
        rejected: chain
            .stages()
            .iter()
            .map(|f| f.name())
            .zip(rejected)
            .collect(),
    };

    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        candidates = stats.candidate_edges,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "graph built"
    );

    Ok((graph, stats))
}
