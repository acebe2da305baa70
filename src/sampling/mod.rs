//! Jittered hexagonal sampling of candidate graph nodes.

use crate::config::SamplingConfig;
use crate::models::ZoneType;
use crate::zones::PolygonMap;
use ahash::AHashSet as HashSet;
use geo::{BoundingRect, Contains, Point, Polygon, Rect};
use rand::Rng;

/// Lattice with horizontal spacing `2·size` and row spacing `size·√3`, odd
/// rows shifted by half a column. Anchored at the origin so that every
/// polygon sampled with the same size lands on the same cells.
#[derive(Debug, Clone, Copy)]
pub struct HexLattice {
    pub size: f64,
}

/// (layer, row, col)
type CellKey = (u32, i64, i64);

impl HexLattice {
    pub fn new(size: f64) -> Self {
        Self { size }
    }

    #[inline]
    pub fn horizontal_spacing(&self) -> f64 {
        2.0 * self.size
    }

    #[inline]
    pub fn vertical_spacing(&self) -> f64 {
        self.size * 3f64.sqrt()
    }

    /// Distance between a cell centre and its nearest neighbour. Diagonal and
    /// horizontal neighbours are both `2·size` away.
    #[inline]
    pub fn neighbour_spacing(&self) -> f64 {
        2.0 * self.size
    }

    /// Cell centres covering `rect`, with the whole lattice shifted by
    /// `offset` on both axes.
    pub fn cells_in(&self, rect: Rect<f64>, offset: f64) -> Vec<(i64, i64, f64, f64)> {
        let hs = self.horizontal_spacing();
        let vs = self.vertical_spacing();
        let (min, max) = (rect.min(), rect.max());

        let row_lo = ((min.y - offset) / vs).floor() as i64 - 1;
        let row_hi = ((max.y - offset) / vs).ceil() as i64 + 1;

        let mut cells = Vec::new();
        for row in row_lo..=row_hi {
            let y = row as f64 * vs + offset;
            let shift = if row.rem_euclid(2) == 1 { self.size } else { 0.0 } + offset;
            let col_lo = ((min.x - shift) / hs).floor() as i64 - 1;
            let col_hi = ((max.x - shift) / hs).ceil() as i64 + 1;
            for col in col_lo..=col_hi {
                cells.push((row, col, col as f64 * hs + shift, y));
            }
        }
        cells
    }
}

/// Hex size from the square root of the Available area, clamped to the
/// configured bounds. An explicit `hex_size` wins.
pub fn hex_size_for_area(available_area: f64, config: &SamplingConfig) -> f64 {
    if let Some(size) = config.hex_size {
        return size;
    }
    let raw = available_area.max(0.0).sqrt() / config.hex_area_divisor;
    raw.clamp(config.min_hex_size, config.max_hex_size)
}

fn jitter<R: Rng>(rng: &mut R, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.random_range(-amplitude..=amplitude)
    } else {
        0.0
    }
}

struct Fill<'a, R: Rng> {
    lattice: HexLattice,
    layers: u32,
    jitter_ratio: f64,
    rng: &'a mut R,
    seen: HashSet<CellKey>,
}

impl<'a, R: Rng> Fill<'a, R> {
    fn new(lattice: HexLattice, layers: u32, jitter_ratio: f64, rng: &'a mut R) -> Self {
        Self {
            lattice,
            layers: layers.max(1),
            jitter_ratio,
            rng,
            seen: HashSet::new(),
        }
    }

    /// Emits jittered cell centres of every layer inside `rect` for which
    /// `keep` holds. A cell is emitted at most once per fill.
    fn run<F>(&mut self, rect: Rect<f64>, keep: F, out: &mut Vec<(f64, f64)>)
    where
        F: Fn((f64, f64)) -> bool,
    {
        let amplitude = self.jitter_ratio * self.lattice.size;
        for layer in 0..self.layers {
            let offset = layer as f64 / self.layers as f64 * self.lattice.size;
            for (row, col, x, y) in self.lattice.cells_in(rect, offset) {
                if self.seen.contains(&(layer, row, col)) {
                    continue;
                }
                let p = (
                    x + jitter(&mut *self.rng, amplitude),
                    y + jitter(&mut *self.rng, amplitude),
                );
                if keep(p) {
                    self.seen.insert((layer, row, col));
                    out.push(p);
                }
            }
        }
    }
}

/// Samples a single polygon. Restricted polygons never yield points.
pub fn sample_polygon<R: Rng>(
    polygon: &Polygon<f64>,
    zone_type: ZoneType,
    size: f64,
    config: &SamplingConfig,
    rng: &mut R,
) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    if zone_type == ZoneType::Restricted || !(size > 0.0) {
        return out;
    }
    let Some(rect) = polygon.bounding_rect() else {
        return out;
    };
    let mut fill = Fill::new(HexLattice::new(size), config.density, config.jitter_ratio, rng);
    fill.run(rect, |p| polygon.contains(&Point::new(p.0, p.1)), &mut out);
    out
}

/// Samples every Available and Urban polygon on one shared lattice and drops
/// points that fall inside Restricted without Urban cover.
pub fn sample_zones<R: Rng>(
    map: &PolygonMap,
    size: f64,
    config: &SamplingConfig,
    rng: &mut R,
) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    if !(size > 0.0) {
        return out;
    }
    let mut fill = Fill::new(HexLattice::new(size), config.density, config.jitter_ratio, rng);

    for zone_type in [ZoneType::Available, ZoneType::Urban] {
        for polygon in map.layer(zone_type).polygons() {
            let Some(rect) = polygon.bounding_rect() else {
                continue;
            };
            fill.run(
                rect,
                |p| polygon.contains(&Point::new(p.0, p.1)) && !map.is_blocked(p),
                &mut out,
            );
        }
    }
    out
}

/// Coarse filler across the convex hull of the render set, kept only where
/// no Restricted, Urban or Available polygon lies. These points only steady
/// the triangulation near the edge of the site.
pub fn sample_outside<R: Rng>(
    map: &PolygonMap,
    size: f64,
    config: &SamplingConfig,
    rng: &mut R,
) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    let spacing = size * config.boundary_spacing_factor;
    if !(spacing > 0.0) {
        return out;
    }
    let Some(hull) = map.render_hull() else {
        return out;
    };
    let Some(rect) = hull.bounding_rect() else {
        return out;
    };

    let mut fill = Fill::new(HexLattice::new(spacing), 1, config.jitter_ratio, rng);
    fill.run(
        rect,
        |p| {
            hull.contains(&Point::new(p.0, p.1))
                && !map.restricted().contains(p)
                && !map.urban().contains(p)
                && !map.available().contains(p)
        },
        &mut out,
    );
    out
}
