// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use serde::{Deserialize, Serialize};

/// Dense index of a node inside one generation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(pub u32);

impl PointId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

impl EdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a graph node came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointOrigin {
    Lattice,
    Poi,
    BoundaryFill,
}

/// A graph node. Location, weight and origin are fixed at creation,
/// only `influence` and `show` move afterwards.
#[derive(Clone, Debug)]
pub struct Point {
    pub id: PointId,
    pub x: f64,
    pub y: f64,
    pub weight: f64,
    pub origin: PointOrigin,
    /// Caller-supplied id, POIs only.
    pub poi_id: Option<i64>,
    pub influence: f64,
    pub show: bool,
}

impl Point {
    pub fn new(id: PointId, x: f64, y: f64, origin: PointOrigin) -> Self {
        Self {
            id,
            x,
            y,
            weight: 0.0,
            origin,
            poi_id: None,
            influence: 0.0,
            show: false,
        }
    }

    pub fn poi(id: PointId, poi: &PoiInput) -> Self {
        Self {
            id,
            x: poi.x,
            y: poi.y,
            weight: poi.weight,
            origin: PointOrigin::Poi,
            poi_id: Some(poi.id),
            influence: 0.0,
            show: false,
        }
    }

    #[inline]
    pub fn is_poi(&self) -> bool {
        self.origin == PointOrigin::Poi
    }

    #[inline]
    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    #[inline]
    pub fn distance_to(&self, other: &Point) -> f64 {
        crate::geometry_utils::distance(self.xy(), other.xy())
    }
}

/// Undirected edge, stored once. `length` is the Euclidean distance and never
/// changes, `cost` is rewritten by the optimizer.
#[derive(Clone, Debug)]
pub struct Edge {
    pub from: PointId,
    pub to: PointId,
    pub length: f64,
    pub cost: f64,
}

impl Edge {
    pub fn other(&self, id: PointId) -> PointId {
        if self.from == id { self.to } else { self.from }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    /// Workspace outline only. Never constrains routing.
    #[serde(rename = "none", alias = "workspace")]
    Workspace,
    /// Impassable.
    Restricted,
    /// Paved, always walkable.
    Urban,
    /// Open terrain where desire paths form.
    Available,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZoneInput {
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    pub vertices: Vec<(f64, f64)>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoiInput {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_poi_weight")]
    pub weight: f64,
}

fn default_poi_weight() -> f64 {
    1.0
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputPoint {
    pub id: u32,
    pub poi_id: Option<i64>,
    pub x: f64,
    pub y: f64,
    pub weight: f64,
    /// Influence normalised to `[0, 1]` by the run maximum.
    pub influence: f64,
    pub show: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputEdge {
    pub from: u32,
    pub to: u32,
    pub cost: f64,
    pub length: f64,
}
