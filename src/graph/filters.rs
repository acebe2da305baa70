use crate::models::Point;
use crate::zones::PolygonMap;

/// One named stage of edge admission. Every stage is a pure predicate over
/// the two endpoints and the zone map.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeFilter {
    /// Drops triangulation edges longer than `max_length`, mostly long hull
    /// edges spanning concave parts of the site.
    DistanceCutoff { max_length: f64 },
    /// An edge touching Restricted ground survives only when it also touches
    /// Urban ground and neither endpoint sits in uncovered Restricted.
    RestrictedCrossing,
    /// Non-POI endpoints must lie in Urban or Available.
    ZoneMembership,
}

impl EdgeFilter {
    pub fn name(&self) -> &'static str {
        match self {
            EdgeFilter::DistanceCutoff { .. } => "distance_cutoff",
            EdgeFilter::RestrictedCrossing => "restricted_crossing",
            EdgeFilter::ZoneMembership => "zone_membership",
        }
    }

    pub fn admits(&self, a: &Point, b: &Point, zones: &PolygonMap) -> bool {
        match self {
            EdgeFilter::DistanceCutoff { max_length } => a.distance_to(b) <= *max_length,
            EdgeFilter::RestrictedCrossing => {
                if !zones.restricted().intersects_segment(a.xy(), b.xy()) {
                    return true;
                }
                zones.urban().intersects_segment(a.xy(), b.xy())
                    && !zones.is_blocked(a.xy())
                    && !zones.is_blocked(b.xy())
            }
            EdgeFilter::ZoneMembership => {
                let member = |p: &Point| p.is_poi() || zones.is_walkable_zone(p.xy());
                member(a) && member(b)
            }
        }
    }
}

/// Ordered list of stages; an edge is admitted when every stage admits it.
/// Cheap stages go first so the polygon queries run on fewer edges.
#[derive(Debug, Clone)]
pub struct FilterChain {
    stages: Vec<EdgeFilter>,
}

impl FilterChain {
    pub fn new(stages: Vec<EdgeFilter>) -> Self {
        Self { stages }
    }

    pub fn standard(max_length: f64) -> Self {
        Self::new(vec![
            EdgeFilter::DistanceCutoff { max_length },
            EdgeFilter::RestrictedCrossing,
            EdgeFilter::ZoneMembership,
        ])
    }

    pub fn stages(&self) -> &[EdgeFilter] {
        &self.stages
    }

    /// Index of the first stage rejecting the edge, `None` when admitted.
    pub fn first_rejection(&self, a: &Point, b: &Point, zones: &PolygonMap) -> Option<usize> {
        self.stages.iter().position(|f| !f.admits(a, b, zones))
    }

    pub fn admits(&self, a: &Point, b: &Point, zones: &PolygonMap) -> bool {
        self.first_rejection(a, b, zones).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PoiInput, PointId, PointOrigin, ZoneInput, ZoneType};

    fn zone(zone_type: ZoneType, x0: f64, y0: f64, x1: f64, y1: f64) -> ZoneInput {
        ZoneInput {
            zone_type,
            vertices: vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
        }
    }

    fn lattice(id: u32, x: f64, y: f64) -> Point {
        Point::new(PointId(id), x, y, PointOrigin::Lattice)
    }

    fn river() -> PolygonMap {
        // Available on both banks, a Restricted river in the middle and an
        // Urban bridge over it.
        PolygonMap::from_zones(&[
            zone(ZoneType::Available, 0.0, 0.0, 30.0, 30.0),
            zone(ZoneType::Restricted, 10.0, 0.0, 20.0, 30.0),
            zone(ZoneType::Urban, 8.0, 14.0, 22.0, 16.0),
        ])
        .unwrap()
    }

    #[test]
    fn distance_cutoff() {
        let map = river();
        let f = EdgeFilter::DistanceCutoff { max_length: 5.0 };
        assert!(f.admits(&lattice(0, 1.0, 1.0), &lattice(1, 4.0, 5.0), &map));
        assert!(!f.admits(&lattice(0, 1.0, 1.0), &lattice(1, 4.0, 5.1), &map));
    }

    #[test]
    fn restricted_crossing_without_bridge_is_rejected() {
        let map = river();
        let f = EdgeFilter::RestrictedCrossing;
        assert!(!f.admits(&lattice(0, 5.0, 5.0), &lattice(1, 25.0, 5.0), &map));
        assert!(f.admits(&lattice(0, 1.0, 5.0), &lattice(1, 9.0, 5.0), &map));
    }

    #[test]
    fn restricted_crossing_over_bridge_is_admitted() {
        let map = river();
        let f = EdgeFilter::RestrictedCrossing;
        assert!(f.admits(&lattice(0, 5.0, 15.0), &lattice(1, 25.0, 15.0), &map));
    }

    #[test]
    fn endpoint_in_uncovered_restricted_is_rejected_even_with_bridge() {
        let map = river();
        let f = EdgeFilter::RestrictedCrossing;
        // Segment touches the bridge but starts in the open river.
        assert!(!f.admits(&lattice(0, 15.0, 10.0), &lattice(1, 15.0, 15.0), &map));
    }

    #[test]
    fn membership_exempts_pois() {
        let map = river();
        let f = EdgeFilter::ZoneMembership;
        let outside = lattice(0, 50.0, 50.0);
        let inside = lattice(1, 2.0, 2.0);
        let poi = Point::poi(
            PointId(2),
            &PoiInput {
                id: 7,
                x: 50.0,
                y: 50.0,
                weight: 1.0,
            },
        );
        assert!(!f.admits(&outside, &inside, &map));
        assert!(f.admits(&poi, &inside, &map));
    }

    #[test]
    fn chain_reports_first_failing_stage() {
        let map = river();
        let chain = FilterChain::standard(100.0);
        let a = lattice(0, 5.0, 5.0);
        let b = lattice(1, 25.0, 5.0);
        assert_eq!(chain.first_rejection(&a, &b, &map), Some(1));
        assert_eq!(chain.stages()[1].name(), "restricted_crossing");
        assert!(chain.admits(&lattice(0, 2.0, 2.0), &lattice(1, 4.0, 4.0), &map));
    }
}
