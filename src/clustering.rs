use crate::config::ClusteringConfig;
use crate::errors::DesirePathError;
use crate::models::{Point, PointId};
use crate::zones::PolygonMap;
use std::time::Instant;

/// POIs merged into one routing endpoint. `representative` is the member
/// closest to the arithmetic centroid, carrying the summed member weight.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub members: Vec<PointId>,
    pub representative: Point,
}

impl Cluster {
    pub fn weight(&self) -> f64 {
        self.representative.weight
    }

    pub fn id(&self) -> PointId {
        self.representative.id
    }
}

#[derive(Debug, Clone)]
pub struct ClusterParams {
    pub initial_distance: f64,
    pub max_distance: f64,
    pub growth_factor: f64,
    pub target_clusters: usize,
}

impl ClusterParams {
    pub fn from_config(config: &ClusteringConfig, hex_size: f64) -> Self {
        let initial_distance = config.initial_distance_factor * hex_size;
        Self {
            initial_distance,
            max_distance: (config.max_distance_factor * hex_size).max(initial_distance),
            growth_factor: config.growth_factor,
            target_clusters: config.target_clusters,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    pub clusters: Vec<Cluster>,
    /// Distance cap of the round that was kept.
    pub distance: f64,
    pub rounds: usize,
}

/// Two POIs may share a cluster only across insignificant terrain: the
/// segment between them may not leave or enter an Available polygon and
/// may not touch Restricted ground.
fn same_terrain(a: &Point, b: &Point, zones: &PolygonMap) -> bool {
    !zones.available().crosses_boundary(a.xy(), b.xy())
        && !zones.restricted().intersects_segment(a.xy(), b.xy())
}

fn representative(members: &[&Point]) -> Point {
    let n = members.len() as f64;
    let cx = members.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = members.iter().map(|p| p.y).sum::<f64>() / n;

    let mut best = members[0];
    let mut best_d2 = f64::INFINITY;
    for &p in members {
        let d2 = (p.x - cx).powi(2) + (p.y - cy).powi(2);
        if d2 < best_d2 {
            best_d2 = d2;
            best = p;
        }
    }

    let mut rep = best.clone();
    rep.weight = members.iter().map(|p| p.weight).sum();
    rep
}

/// One greedy pass in input order. Each unclustered POI opens a cluster and
/// absorbs every later unclustered POI within `max_distance` of all current
/// members and on the same terrain as each of them.
pub fn cluster_once(pois: &[Point], zones: &PolygonMap, max_distance: f64) -> Vec<Cluster> {
    let mut assigned = vec![false; pois.len()];
    let mut clusters = Vec::new();

    for i in 0..pois.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut members: Vec<&Point> = vec![&pois[i]];

        for j in (i + 1)..pois.len() {
            if assigned[j] {
                continue;
            }
            let candidate = &pois[j];
            let fits = members.iter().all(|m| {
                m.distance_to(candidate) <= max_distance && same_terrain(m, candidate, zones)
            });
            if fits {
                assigned[j] = true;
                members.push(candidate);
            }
        }

        clusters.push(Cluster {
            members: members.iter().map(|p| p.id).collect(),
            representative: representative(&members),
        });
    }
    clusters
}

/// Clusters POIs, growing the distance cap until the cluster count reaches the
/// target or the cap hits its upper bound.
pub fn cluster_pois(
    pois: &[Point],
    zones: &PolygonMap,
    params: &ClusterParams,
) -> Result<ClusterOutcome, DesirePathError> {
    let start = Instant::now();
    if pois.is_empty() {
        return Err(DesirePathError::insufficient("no POIs to cluster"));
    }
    let total_weight: f64 = pois.iter().map(|p| p.weight).sum();
    if !(total_weight > 0.0) {
        return Err(DesirePathError::insufficient("POI weights sum to zero"));
    }

    let mut distance = params.initial_distance;
    let mut rounds = 0;
    let clusters = loop {
        rounds += 1;
        let clusters = cluster_once(pois, zones, distance);
        if clusters.len() <= params.target_clusters || distance >= params.max_distance {
            break clusters;
        }
        distance = (distance * params.growth_factor).min(params.max_distance);
    };

    tracing::info!(
        pois = pois.len(),
        clusters = clusters.len(),
        distance,
        rounds,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "pois clustered"
    );

    Ok(ClusterOutcome {
        clusters,
        distance,
        rounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PoiInput, ZoneInput, ZoneType};
    use ahash::AHashSet as HashSet;

    fn zone(zone_type: ZoneType, x0: f64, y0: f64, x1: f64, y1: f64) -> ZoneInput {
        ZoneInput {
            zone_type,
            vertices: vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
        }
    }

    fn pois(coords: &[(f64, f64, f64)]) -> Vec<Point> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y, weight))| {
                Point::poi(
                    PointId(i as u32),
                    &PoiInput {
                        id: i as i64,
                        x,
                        y,
                        weight,
                    },
                )
            })
            .collect()
    }

    fn open_field() -> PolygonMap {
        PolygonMap::from_zones(&[zone(ZoneType::Available, 0.0, 0.0, 1000.0, 1000.0)]).unwrap()
    }

    #[test]
    fn nearby_pois_merge_and_weights_add_up() {
        let map = open_field();
        let points = pois(&[
            (10.0, 10.0, 1.0),
            (12.0, 10.0, 2.0),
            (11.0, 12.0, 3.0),
            (500.0, 500.0, 4.0),
        ]);
        let clusters = cluster_once(&points, &map, 5.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members.len(), 3);
        assert!((clusters[0].weight() - 6.0).abs() < 1e-12);
        assert!((clusters[1].weight() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn representative_is_member_nearest_centroid() {
        let map = open_field();
        let points = pois(&[(0.5, 0.5, 1.0), (4.0, 0.5, 1.0), (2.0, 0.5, 1.0)]);
        let clusters = cluster_once(&points, &map, 10.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].id(), PointId(2));
    }

    #[test]
    fn partition_is_exact_and_respects_distance() {
        let map = open_field();
        let mut coords = Vec::new();
        for i in 0..12 {
            for j in 0..9 {
                coords.push((i as f64 * 7.3 + 1.0, j as f64 * 4.1 + 1.0, 1.0));
            }
        }
        let points = pois(&coords);
        let max_distance = 9.0;
        let clusters = cluster_once(&points, &map, max_distance);

        let mut seen = HashSet::new();
        for cluster in &clusters {
            for &m in &cluster.members {
                assert!(seen.insert(m), "{m:?} appears twice");
            }
            for &a in &cluster.members {
                for &b in &cluster.members {
                    let d = points[a.index()].distance_to(&points[b.index()]);
                    assert!(d <= max_distance);
                }
            }
        }
        assert_eq!(seen.len(), points.len());
    }

    #[test]
    fn restricted_ground_keeps_pois_apart() {
        let map = PolygonMap::from_zones(&[
            zone(ZoneType::Available, 0.0, 0.0, 100.0, 100.0),
            zone(ZoneType::Restricted, 49.0, 0.0, 51.0, 100.0),
        ])
        .unwrap();
        let points = pois(&[(47.0, 50.0, 1.0), (53.0, 50.0, 1.0)]);
        assert_eq!(cluster_once(&points, &map, 50.0).len(), 2);
    }

    #[test]
    fn available_boundary_keeps_pois_apart() {
        let map = PolygonMap::from_zones(&[
            zone(ZoneType::Available, 0.0, 0.0, 50.0, 100.0),
            zone(ZoneType::Urban, 50.0, 0.0, 100.0, 100.0),
        ])
        .unwrap();
        let points = pois(&[(48.0, 50.0, 1.0), (52.0, 50.0, 1.0)]);
        assert_eq!(cluster_once(&points, &map, 50.0).len(), 2);
    }

    #[test]
    fn distance_grows_until_target_is_met() {
        let map = open_field();
        let coords: Vec<(f64, f64, f64)> = (0..40).map(|i| (10.0 + i as f64 * 20.0, 500.0, 1.0)).collect();
        let points = pois(&coords);
        let params = ClusterParams {
            initial_distance: 5.0,
            max_distance: 1000.0,
            growth_factor: 1.2,
            target_clusters: 20,
        };
        let outcome = cluster_pois(&points, &map, &params).unwrap();
        assert!(outcome.clusters.len() <= 20);
        assert!(outcome.rounds > 1);
        assert!(outcome.distance >= 20.0);
    }

    #[test]
    fn growth_stops_at_upper_bound() {
        let map = open_field();
        let coords: Vec<(f64, f64, f64)> = (0..40).map(|i| (10.0 + i as f64 * 20.0, 500.0, 1.0)).collect();
        let points = pois(&coords);
        let params = ClusterParams {
            initial_distance: 5.0,
            max_distance: 8.0,
            growth_factor: 1.2,
            target_clusters: 20,
        };
        let outcome = cluster_pois(&points, &map, &params).unwrap();
        assert_eq!(outcome.clusters.len(), 40);
        assert_eq!(outcome.distance, 8.0);
    }

    #[test]
    fn zero_weight_pool_is_insufficient() {
        let map = open_field();
        let points = pois(&[(1.0, 1.0, 0.0), (900.0, 900.0, 0.0)]);
        let params = ClusterParams::from_config(&ClusteringConfig::default(), 5.0);
        let err = cluster_pois(&points, &map, &params).unwrap_err();
        assert!(err.is_insufficient_input());
    }
}
