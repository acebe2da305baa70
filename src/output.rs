use crate::config::OutputConfig;
use crate::graph::DesireGraph;
use crate::models::{OutputEdge, OutputPoint, PointId};
use crate::optimizer::OptimizerOutcome;
use crate::zones::PolygonMap;
use ahash::AHashSet as HashSet;

/// Number of paths kept: a share of the candidate pairs plus a site scale
/// term, clamped to the configured bounds.
pub fn target_path_count(
    pair_count: usize,
    available_area: f64,
    hex_size: f64,
    config: &OutputConfig,
) -> usize {
    let site_scale = if hex_size > 0.0 {
        available_area.max(0.0).sqrt() / (config.site_scale_divisor * hex_size)
    } else {
        0.0
    };
    let raw = config.pair_weight * pair_count as f64 + site_scale;
    (raw.round() as usize).clamp(config.min_paths, config.max_paths)
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub points: Vec<OutputPoint>,
    pub edges: Vec<OutputEdge>,
    pub selected_paths: usize,
}

fn output_point(graph: &DesireGraph, id: PointId) -> OutputPoint {
    let p = graph.point(id);
    OutputPoint {
        id: p.id.0,
        poi_id: p.poi_id,
        x: p.x,
        y: p.y,
        weight: p.weight,
        influence: p.influence,
        show: p.show,
    }
}

/// Normalises influence by the run maximum, marks every node of the `target`
/// best paths (by mean influence) as shown and extracts the shown, non-POI
/// nodes that lie in Available ground.
pub fn select_output(
    graph: &mut DesireGraph,
    outcome: &OptimizerOutcome,
    zones: &PolygonMap,
    target: usize,
    include_edges: bool,
) -> Selection {
    let max = outcome.max_influence;
    if outcome.paths.is_empty() || !(max > 0.0) {
        return Selection::default();
    }

    for &id in &outcome.touched {
        graph.point_mut(id).influence /= max;
    }

    let mut scored: Vec<(usize, f64)> = outcome
        .paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let total: f64 = path.nodes.iter().map(|&id| graph.point(id).influence).sum();
            (i, total / path.nodes.len() as f64)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(target);

    for &(i, _) in &scored {
        for &id in &outcome.paths[i].nodes {
            graph.point_mut(id).show = true;
        }
    }

    let kept: Vec<PointId> = graph
        .points()
        .iter()
        .filter(|p| p.show && !p.is_poi() && zones.available().contains(p.xy()))
        .map(|p| p.id)
        .collect();
    let kept_set: HashSet<PointId> = kept.iter().copied().collect();

    let mut edges = Vec::new();
    if include_edges {
        let mut emitted = HashSet::new();
        for &(i, _) in &scored {
            for hop in outcome.paths[i].nodes.windows(2) {
                let (a, b) = (hop[0], hop[1]);
                if !kept_set.contains(&a) || !kept_set.contains(&b) {
                    continue;
                }
                let Some(edge_id) = graph.edge_between(a, b) else {
                    continue;
                };
                if emitted.insert(edge_id) {
                    let e = graph.edge(edge_id);
                    edges.push(OutputEdge {
                        from: e.from.0,
                        to: e.to.0,
                        cost: e.cost,
                        length: e.length,
                    });
                }
            }
        }
    }

    tracing::info!(
        target,
        selected_paths = scored.len(),
        points = kept.len(),
        edges = edges.len(),
        "desire paths selected"
    );

    Selection {
        points: kept.into_iter().map(|id| output_point(graph, id)).collect(),
        edges,
        selected_paths: scored.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PoiInput, PointOrigin, ZoneInput, ZoneType};
    use crate::optimizer::RoutedPath;

    #[test]
    fn target_count_is_clamped() {
        let config = OutputConfig::default();
        assert_eq!(target_path_count(0, 0.0, 5.0, &config), 10);
        assert_eq!(target_path_count(10_000, 0.0, 5.0, &config), 100);
        // 0.5 * 60 + sqrt(250000) / (10 * 5)
        assert_eq!(target_path_count(60, 250_000.0, 5.0, &config), 40);
    }

    fn field() -> PolygonMap {
        PolygonMap::from_zones(&[ZoneInput {
            zone_type: ZoneType::Available,
            vertices: vec![(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)],
        }])
        .unwrap()
    }

    #[test]
    fn keeps_best_paths_and_drops_pois() {
        let mut g = DesireGraph::new();
        let poi = g.add_poi(&PoiInput {
            id: 1,
            x: 10.0,
            y: 10.0,
            weight: 1.0,
        });
        let a = g.add_point(20.0, 10.0, PointOrigin::Lattice);
        let b = g.add_point(30.0, 10.0, PointOrigin::Lattice);
        let c = g.add_point(20.0, 50.0, PointOrigin::Lattice);
        let d = g.add_point(30.0, 50.0, PointOrigin::Lattice);
        g.add_edge(poi, a);
        g.add_edge(a, b);
        g.add_edge(c, d);
        g.point_mut(poi).influence = 4.0;
        g.point_mut(a).influence = 4.0;
        g.point_mut(b).influence = 4.0;
        g.point_mut(c).influence = 1.0;
        g.point_mut(d).influence = 1.0;

        let outcome = OptimizerOutcome {
            paths: vec![
                RoutedPath {
                    from: c,
                    to: d,
                    nodes: vec![c, d],
                    weight: 1.0,
                },
                RoutedPath {
                    from: poi,
                    to: b,
                    nodes: vec![poi, a, b],
                    weight: 1.0,
                },
            ],
            unreachable: 0,
            touched: vec![poi, a, b, c, d],
            max_influence: 4.0,
        };

        let selection = select_output(&mut g, &outcome, &field(), 1, true);
        assert_eq!(selection.selected_paths, 1);
        let ids: Vec<u32> = selection.points.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.0, b.0]);
        assert!(selection.points.iter().all(|p| p.show && p.influence == 1.0));
        assert_eq!(selection.edges.len(), 1);
        assert!(!g.point(c).show);
        assert_eq!(g.point(c).influence, 0.25);
    }

    #[test]
    fn nothing_routed_selects_nothing() {
        let mut g = DesireGraph::new();
        g.add_point(1.0, 1.0, PointOrigin::Lattice);
        let selection = select_output(&mut g, &OptimizerOutcome::default(), &field(), 10, true);
        assert!(selection.points.is_empty());
        assert!(selection.edges.is_empty());
    }
}
