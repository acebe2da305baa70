//! Zone classification: turns caller polygons into the per-type layers the
//! sampler and edge filters query.

use crate::errors::DesirePathError;
use crate::geometry_utils::{polygon_from_ring, segment};
use crate::models::{ZoneInput, ZoneType};
use geo::{Area, BoundingRect, Contains, ConvexHull, Intersects, MultiPolygon, Point, Polygon};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};

type IndexedRect = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Polygons of a single zone type plus an R-tree over their bounding boxes.
#[derive(Debug, Clone, Default)]
pub struct ZoneLayer {
    polygons: Vec<Polygon<f64>>,
    index: RTree<IndexedRect>,
}

impl ZoneLayer {
    pub fn new(polygons: Vec<Polygon<f64>>) -> Self {
        let rects: Vec<IndexedRect> = polygons
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let rect = p.bounding_rect()?;
                Some(GeomWithData::new(
                    Rectangle::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    i,
                ))
            })
            .collect();

        Self {
            polygons,
            index: RTree::bulk_load(rects),
        }
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.polygons
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(|p| p.unsigned_area()).sum()
    }

    fn candidates<'a>(&'a self, envelope: AABB<[f64; 2]>) -> impl Iterator<Item = &'a Polygon<f64>> + 'a {
        self.index
            .locate_in_envelope_intersecting(&envelope)
            .map(move |r| &self.polygons[r.data])
    }

    /// True when the point lies strictly inside any polygon of the layer.
    pub fn contains(&self, p: (f64, f64)) -> bool {
        let point = Point::new(p.0, p.1);
        self.candidates(AABB::from_point([p.0, p.1]))
            .any(|poly| poly.contains(&point))
    }

    /// True when segment `a`-`b` touches any polygon of the layer, interior
    /// or boundary.
    pub fn intersects_segment(&self, a: (f64, f64), b: (f64, f64)) -> bool {
        let line = segment(a, b);
        self.candidates(segment_envelope(a, b))
            .any(|poly| line.intersects(poly))
    }

    /// True when segment `a`-`b` touches the outline of any polygon.
    pub fn crosses_boundary(&self, a: (f64, f64), b: (f64, f64)) -> bool {
        let line = segment(a, b);
        self.candidates(segment_envelope(a, b))
            .any(|poly| line.intersects(poly.exterior()))
    }
}

fn segment_envelope(a: (f64, f64), b: (f64, f64)) -> AABB<[f64; 2]> {
    AABB::from_corners([a.0.min(b.0), a.1.min(b.1)], [a.0.max(b.0), a.1.max(b.1)])
}

/// Read-only view of the site, grouped by zone type.
#[derive(Debug, Clone)]
pub struct PolygonMap {
    workspace: ZoneLayer,
    restricted: ZoneLayer,
    urban: ZoneLayer,
    available: ZoneLayer,
    render: ZoneLayer,
}

impl PolygonMap {
    /// Validates every ring and groups the polygons by type. A malformed ring
    /// fails the whole map.
    pub fn from_zones(zones: &[ZoneInput]) -> Result<Self, DesirePathError> {
        let mut workspace = Vec::new();
        let mut restricted = Vec::new();
        let mut urban = Vec::new();
        let mut available = Vec::new();

        for (index, zone) in zones.iter().enumerate() {
            let polygon = polygon_from_ring(&zone.vertices)
                .map_err(|defect| DesirePathError::zone(index, defect.to_string()))?;
            match zone.zone_type {
                ZoneType::Workspace => workspace.push(polygon),
                ZoneType::Restricted => restricted.push(polygon),
                ZoneType::Urban => urban.push(polygon),
                ZoneType::Available => available.push(polygon),
            }
        }

        // Without an explicit workspace the walkable zones define what is drawn.
        let render = if workspace.is_empty() {
            urban.iter().chain(available.iter()).cloned().collect()
        } else {
            workspace.clone()
        };

        Ok(Self {
            workspace: ZoneLayer::new(workspace),
            restricted: ZoneLayer::new(restricted),
            urban: ZoneLayer::new(urban),
            available: ZoneLayer::new(available),
            render: ZoneLayer::new(render),
        })
    }

    pub fn layer(&self, zone_type: ZoneType) -> &ZoneLayer {
        match zone_type {
            ZoneType::Workspace => &self.workspace,
            ZoneType::Restricted => &self.restricted,
            ZoneType::Urban => &self.urban,
            ZoneType::Available => &self.available,
        }
    }

    pub fn workspace(&self) -> &ZoneLayer {
        &self.workspace
    }

    pub fn restricted(&self) -> &ZoneLayer {
        &self.restricted
    }

    pub fn urban(&self) -> &ZoneLayer {
        &self.urban
    }

    pub fn available(&self) -> &ZoneLayer {
        &self.available
    }

    pub fn render(&self) -> &ZoneLayer {
        &self.render
    }

    /// Polygons desire paths are generated in.
    pub fn generation(&self) -> &ZoneLayer {
        &self.available
    }

    /// Inside Restricted with no Urban polygon covering the spot.
    pub fn is_blocked(&self, p: (f64, f64)) -> bool {
        self.restricted.contains(p) && !self.urban.contains(p)
    }

    pub fn is_walkable_zone(&self, p: (f64, f64)) -> bool {
        self.urban.contains(p) || self.available.contains(p)
    }

    /// Walkable zone and not blocked.
    pub fn is_passable(&self, p: (f64, f64)) -> bool {
        self.is_walkable_zone(p) && !self.is_blocked(p)
    }

    /// Convex hull of the render set, `None` when nothing renders.
    pub fn render_hull(&self) -> Option<Polygon<f64>> {
        if self.render.is_empty() {
            return None;
        }
        let hull = MultiPolygon::new(self.render.polygons().to_vec()).convex_hull();
        if hull.unsigned_area() > 0.0 { Some(hull) } else { None }
    }
}
