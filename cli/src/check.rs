use anyhow::Result;

use maputil::{prettyprint_usize, Timer};
use tagged_map::TaggedMap;

pub fn run(input: String) -> Result<()> {
    let mut timer = Timer::new("check map");
    let map = TaggedMap::load_json(&input, &mut timer)?;
    println!("{}", map.summary());

    let overlaps = map.find_overlaps();
    println!("{} ways overlap something", prettyprint_usize(overlaps.len()));
    for id in &overlaps {
        println!("  {}", id);
    }

    let groups = map.connected_groups();
    println!(
        "{} connected groups; the largest has {} ways",
        prettyprint_usize(groups.len()),
        prettyprint_usize(groups.first().map(|g| g.len()).unwrap_or(0))
    );
    let unconnected = map.unconnected_ways();
    println!(
        "{} ways can't reach the main network",
        prettyprint_usize(unconnected.len())
    );
    for id in &unconnected {
        println!("  {}", id);
    }
    let no_access = map.buildings_without_road_access();
    println!(
        "{} buildings don't touch a road in the main network",
        prettyprint_usize(no_access.len())
    );
    Ok(())
}
