//! Randomized grid maps, checking the properties every export and entrance run should have.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use geom::{Distance, Line};
use maputil::Timer;
use planar_map::{EntranceGenerator, EntranceOptions, ExportOptions, PlanarMap};
use tagged_map::{line_crosses_way, MapBuilder, TaggedMap, WayID};

const BLOCK: f64 = 60.0;
const BLOCKS: usize = 3;

#[derive(Clone, Copy, PartialEq)]
enum Block {
    Empty,
    /// A building in the middle of the block, far from every road
    Isolated,
    /// A building reached by a short road from the south, with a second one attached to its
    /// east wall
    Terrace,
    /// A building near the west road, not touching it
    Detached,
}

struct Grid {
    map: TaggedMap,
    /// Buildings connected to the roads by ways alone
    reachable: BTreeSet<WayID>,
    stranded: BTreeSet<WayID>,
}

fn grid(seed: u64) -> Grid {
    let mut rng = XorShiftRng::seed_from_u64(seed);
    let mut blocks = Vec::new();
    for _ in 0..BLOCKS * BLOCKS {
        blocks.push(match rng.gen_range(0..4) {
            0 => Block::Empty,
            1 => Block::Isolated,
            2 => Block::Terrace,
            _ => Block::Detached,
        });
    }
    let block = |i: usize, j: usize| blocks[j * BLOCKS + i];

    let mut b = MapBuilder::new();
    for j in 0..=BLOCKS {
        let y = j as f64 * BLOCK;
        let mut pts = Vec::new();
        for i in 0..=BLOCKS {
            let x = i as f64 * BLOCK;
            pts.push((x, y));
            if i < BLOCKS && j < BLOCKS && block(i, j) == Block::Terrace {
                pts.push((x + 10.0, y));
            }
        }
        b.road(&pts, "6000");
    }
    for i in 0..=BLOCKS {
        let x = i as f64 * BLOCK;
        let pts: Vec<(f64, f64)> = (0..=BLOCKS).map(|j| (x, j as f64 * BLOCK)).collect();
        b.road(&pts, "6000");
    }

    let mut reachable = BTreeSet::new();
    let mut stranded = BTreeSet::new();
    for j in 0..BLOCKS {
        for i in 0..BLOCKS {
            let (x, y) = (i as f64 * BLOCK, j as f64 * BLOCK);
            match block(i, j) {
                Block::Empty => {}
                Block::Isolated => {
                    stranded.insert(b.building(x + 30.0, y + 30.0, x + 40.0, y + 40.0));
                }
                Block::Terrace => {
                    b.road(&[(x + 10.0, y), (x + 10.0, y + 15.0)], "3000");
                    reachable.insert(b.building_pts(&[
                        (x + 5.0, y + 15.0),
                        (x + 10.0, y + 15.0),
                        (x + 15.0, y + 15.0),
                        (x + 15.0, y + 25.0),
                        (x + 5.0, y + 25.0),
                    ]));
                    reachable.insert(b.building(x + 15.0, y + 15.0, x + 25.0, y + 25.0));
                }
                Block::Detached => {
                    stranded.insert(b.building(x + 5.0, y + 15.0, x + 15.0, y + 25.0));
                }
            }
        }
    }
    Grid {
        map: b.map,
        reachable,
        stranded,
    }
}

fn export(map: &TaggedMap) -> PlanarMap {
    let planar =
        PlanarMap::export(map, &ExportOptions::default(), &mut Timer::throwaway()).unwrap();
    planar.validate().unwrap();
    planar
}

#[test]
fn export_grids() {
    for seed in 0..5 {
        let grid = grid(seed);
        let planar = export(&grid.map);

        // Every edge is a wall of one or two shapes, and no pair of nodes has two edges
        let mut pairs = BTreeSet::new();
        for edge in planar.all_edges().values() {
            let users = planar.shapes_of_edge(edge.id).len();
            assert!(users == 1 || users == 2, "{} is used by {} shapes", edge.id, users);
            assert!(pairs.insert((edge.src.min(edge.dst), edge.src.max(edge.dst))));
            if edge.passable {
                assert_eq!(users, 2);
            }
        }

        for way in &grid.reachable {
            let shape = planar.shapes_from_way(*way)[0];
            assert!(planar.main_group().contains(&shape), "seed {}: {} is stranded", seed, way);
        }
        for way in &grid.stranded {
            let shape = planar.shapes_from_way(*way)[0];
            assert!(!planar.main_group().contains(&shape));
        }

        // Exporting again gives exactly the same result
        let again = export(&grid.map);
        assert_eq!(
            maputil::to_json(&planar).unwrap(),
            maputil::to_json(&again).unwrap()
        );
    }
}

#[test]
fn entrances_on_grids() {
    for seed in 0..5 {
        let mut grid = grid(seed);
        let opts = EntranceOptions::default();
        let mut gen = EntranceGenerator::new(&grid.map, opts.clone());
        let created = gen
            .generate_all(&mut grid.map, &mut Timer::throwaway())
            .unwrap();
        let map = &grid.map;

        let mut lines: Vec<(WayID, Line)> = Vec::new();
        for way in &created {
            assert!(map.get_way(*way).unwrap().is_entrance());
            let pts = map.way_pts(*way).unwrap();
            assert_eq!(pts.len(), 2);
            let line = Line::must_new(pts[0], pts[1]);
            assert!(line.length() >= opts.min_length() && line.length() <= opts.max_length());

            // Nothing else is crossed, except where the connector starts and ends
            for other in map.all_ways().keys() {
                if *other == *way || !map.get_way(*other).unwrap().kind.is_relevant() {
                    continue;
                }
                let walls = map.way_lines(*other).unwrap();
                assert!(
                    !line_crosses_way(&line, &walls),
                    "seed {}: {} crosses {}",
                    seed,
                    way,
                    other
                );
            }
            lines.push((*way, line));
        }
        for (idx, (w1, l1)) in lines.iter().enumerate() {
            let trimmed = l1.shortened(Distance::meters(0.01)).unwrap();
            for (w2, l2) in &lines[idx + 1..] {
                assert!(!trimmed.intersects(l2), "{} and {} cross", w1, w2);
            }
        }

        // Every building can reach a road now
        assert!(map.unconnected_ways().is_empty(), "seed {}", seed);
        let planar = export(map);
        for shape in planar.all_shapes().values() {
            if shape.kind.is_building() {
                assert!(planar.main_group().contains(&shape.id), "seed {}: {}", seed, shape.id);
            }
        }
    }
}
