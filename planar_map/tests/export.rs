use geom::Pt2D;
use maputil::Timer;
use planar_map::{ExportOptions, PlanarMap, ShapeKind};
use tagged_map::{MapBuilder, NodeID, TaggedMap, WayID};

fn export(map: &TaggedMap, skip_repair: bool) -> PlanarMap {
    let opts = ExportOptions {
        skip_repair,
        ..Default::default()
    };
    let planar = PlanarMap::export(map, &opts, &mut Timer::throwaway()).unwrap();
    planar.validate().unwrap();
    planar
}

fn node_at(b: &MapBuilder, x: f64, y: f64) -> NodeID {
    let pt = Pt2D::new(x, y);
    b.map
        .all_nodes()
        .iter()
        .find(|(_, node)| node.pt.approx_eq(pt))
        .map(|(id, _)| *id)
        .unwrap()
}

fn passable(planar: &PlanarMap) -> usize {
    planar.all_edges().values().filter(|e| e.passable).count()
}

/// A road with a short connector up to building B. Building A shares B's east wall, but nothing
/// else.
fn terrace() -> (MapBuilder, WayID, WayID) {
    let mut b = MapBuilder::new();
    b.road(&[(-30.0, 0.0), (0.0, 0.0), (30.0, 0.0)], "6000");
    b.road(&[(0.0, 0.0), (0.0, 10.0)], "3000");
    let west = b.building_pts(&[(-5.0, 10.0), (0.0, 10.0), (5.0, 10.0), (5.0, 20.0), (-5.0, 20.0)]);
    let east = b.building(5.0, 10.0, 15.0, 20.0);
    (b, west, east)
}

#[test]
fn repair_opens_the_shortest_path() {
    let (b, west, east) = terrace();
    let before = export(&b.map, true);
    let west_shape = before.shapes_from_way(west)[0];
    let east_shape = before.shapes_from_way(east)[0];
    assert!(before.main_group().contains(&west_shape));
    assert!(!before.main_group().contains(&east_shape));

    let after = export(&b.map, false);
    assert_eq!(passable(&after), passable(&before) + 1);
    assert!(after.main_group().contains(&east_shape));
    assert_eq!(after.main_group().len(), before.main_group().len() + 1);

    // The only newly opened edge is the shared wall
    let opened: Vec<_> = after
        .all_edges()
        .values()
        .filter(|e| e.passable && !before.get_edge(e.id).passable)
        .collect();
    assert_eq!(opened.len(), 1);
    let shapes: Vec<_> = after.shapes_of_edge(opened[0].id).iter().cloned().collect();
    assert_eq!(shapes, vec![west_shape, east_shape]);
    assert!(after
        .get_shape(east_shape)
        .edges
        .iter()
        .any(|de| de.edge == opened[0].id && de.neighbour == Some(west_shape)));
}

#[test]
fn shared_wall_is_one_edge() {
    let (b, west, east) = terrace();
    let planar = export(&b.map, false);
    let corner1 = planar.node_for_source(node_at(&b, 5.0, 10.0)).unwrap();
    let corner2 = planar.node_for_source(node_at(&b, 5.0, 20.0)).unwrap();
    let wall = planar.find_edge(corner1, corner2).unwrap();

    let mut expected = vec![planar.shapes_from_way(west)[0], planar.shapes_from_way(east)[0]];
    expected.sort();
    assert_eq!(
        planar.shapes_of_edge(wall).iter().cloned().collect::<Vec<_>>(),
        expected
    );
    let users = planar
        .all_shapes()
        .values()
        .filter(|s| s.edges.iter().any(|de| de.edge == wall))
        .count();
    assert_eq!(users, 2);
}

#[test]
fn buildings_without_shared_edges() {
    let mut b = MapBuilder::new();
    let first = b.building(0.0, 0.0, 10.0, 10.0);
    let lonely = b.building(50.0, 0.0, 60.0, 10.0);

    // Nothing can be opened up, so the lonely building is only reported
    let mut timer = Timer::throwaway();
    let planar = PlanarMap::export(&b.map, &ExportOptions::default(), &mut timer).unwrap();
    planar.validate().unwrap();
    let lonely_shape = planar.shapes_from_way(lonely)[0];
    assert_eq!(
        planar.main_group().iter().cloned().collect::<Vec<_>>(),
        planar.shapes_from_way(first)
    );
    assert!(timer
        .warnings()
        .iter()
        .any(|w| w.contains(&lonely_shape.to_string())));
    assert_eq!(passable(&planar), 0);
}

#[test]
fn isolated_building_is_only_a_warning() {
    let (mut b, _, _) = terrace();
    let lonely = b.building(40.0, 30.0, 50.0, 40.0);

    let mut timer = Timer::throwaway();
    let planar = PlanarMap::export(&b.map, &ExportOptions::default(), &mut timer).unwrap();
    planar.validate().unwrap();
    let shape = planar.shapes_from_way(lonely)[0];
    assert!(!planar.main_group().contains(&shape));
    assert_eq!(
        planar
            .all_shapes()
            .values()
            .filter(|s| s.kind.is_building() && !planar.main_group().contains(&s.id))
            .count(),
        1
    );
    assert!(timer.warnings().iter().any(|w| w.contains(&shape.to_string())));
}

#[test]
fn serialized_roundtrip() {
    let (b, _, _) = terrace();
    let planar = export(&b.map, false);
    let raw = maputil::to_json(&planar).unwrap();
    let loaded = PlanarMap::from_serialized(&raw).unwrap();
    loaded.validate().unwrap();
    assert_eq!(loaded.summary(), planar.summary());
    for shape in loaded.all_shapes().values() {
        for de in &shape.edges {
            assert!(loaded.shapes_of_edge(de.edge).contains(&shape.id));
        }
    }
    assert_eq!(
        loaded
            .all_shapes()
            .values()
            .filter(|s| s.kind == ShapeKind::Junction)
            .count(),
        1
    );
}
