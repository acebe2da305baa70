use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, Coord, Line, LineString, Polygon};
use thiserror::Error;

// point coincidence threshold in site units
pub const EPS_POS: f64 = 1e-9;

#[inline]
pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

#[inline]
pub fn segment(a: (f64, f64), b: (f64, f64)) -> Line<f64> {
    Line::new(Coord { x: a.0, y: a.1 }, Coord { x: b.0, y: b.1 })
}

/// Why a ring cannot be turned into a zone polygon.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RingDefect {
    #[error("ring has {0} distinct vertices, at least 3 are required")]
    TooFewVertices(usize),
    #[error("vertex {0} has a non-finite coordinate")]
    NonFinite(usize),
    #[error("ring encloses no area")]
    ZeroArea,
    #[error("ring edges {first} and {second} intersect")]
    SelfIntersection { first: usize, second: usize },
}

/// Normalises an open or closed ring into distinct vertices and validates
/// that it is simple. The returned polygon has a closed exterior.
pub fn polygon_from_ring(vertices: &[(f64, f64)]) -> Result<Polygon<f64>, RingDefect> {
    if let Some(i) = vertices
        .iter()
        .position(|(x, y)| !x.is_finite() || !y.is_finite())
    {
        return Err(RingDefect::NonFinite(i));
    }

    // Collapse repeated consecutive vertices and the closing vertex.
    let mut ring: Vec<(f64, f64)> = Vec::with_capacity(vertices.len());
    for &v in vertices {
        if let Some(&last) = ring.last() {
            if distance(last, v) <= EPS_POS {
                continue;
            }
        }
        ring.push(v);
    }
    while ring.len() > 1 && distance(ring[0], ring[ring.len() - 1]) <= EPS_POS {
        ring.pop();
    }

    if ring.len() < 3 {
        return Err(RingDefect::TooFewVertices(ring.len()));
    }

    check_simple(&ring)?;

    let polygon = Polygon::new(LineString::from(ring), vec![]);
    if polygon.unsigned_area() <= EPS_POS {
        return Err(RingDefect::ZeroArea);
    }
    Ok(polygon)
}

/// O(n^2) pairwise check of ring edges. Adjacent edges may only share their
/// common vertex.
fn check_simple(ring: &[(f64, f64)]) -> Result<(), RingDefect> {
    let n = ring.len();
    let edges: Vec<Line<f64>> = (0..n)
        .map(|i| segment(ring[i], ring[(i + 1) % n]))
        .collect();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => {
                    return Err(RingDefect::SelfIntersection {
                        first: i,
                        second: j,
                    });
                }
                Some(LineIntersection::SinglePoint { is_proper, .. }) => {
                    if !adjacent || is_proper {
                        return Err(RingDefect::SelfIntersection {
                            first: i,
                            second: j,
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_open_and_closed_squares() {
        let open = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let mut closed = open.clone();
        closed.push((0.0, 0.0));

        let a = polygon_from_ring(&open).unwrap();
        let b = polygon_from_ring(&closed).unwrap();
        assert!((a.unsigned_area() - 100.0).abs() < 1e-9);
        assert!((b.unsigned_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bow_tie() {
        let bow_tie = vec![(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)];
        assert!(matches!(
            polygon_from_ring(&bow_tie),
            Err(RingDefect::SelfIntersection { .. })
        ));
    }

    #[test]
    fn rejects_two_vertices() {
        let line = vec![(0.0, 0.0), (10.0, 0.0), (0.0, 0.0)];
        assert_eq!(
            polygon_from_ring(&line),
            Err(RingDefect::TooFewVertices(2))
        );
    }

    #[test]
    fn rejects_collinear_ring() {
        let flat = vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)];
        assert!(polygon_from_ring(&flat).is_err());
    }

    #[test]
    fn defects_read_as_messages() {
        assert_eq!(
            RingDefect::SelfIntersection { first: 0, second: 2 }.to_string(),
            "ring edges 0 and 2 intersect"
        );
        assert_eq!(
            RingDefect::TooFewVertices(2).to_string(),
            "ring has 2 distinct vertices, at least 3 are required"
        );
    }

    #[test]
    fn rejects_nan() {
        let bad = vec![(0.0, 0.0), (f64::NAN, 0.0), (0.0, 10.0)];
        assert_eq!(polygon_from_ring(&bad), Err(RingDefect::NonFinite(1)));
    }
}
