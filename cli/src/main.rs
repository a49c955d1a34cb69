//! Command-line tools for preparing rescue maps: connecting buildings to the road network,
//! checking a tagged map for problems, and exporting the planar map.

#[macro_use]
extern crate log;

mod check;

use anyhow::Result;
use structopt::StructOpt;

use maputil::Timer;
use planar_map::{EntranceGenerator, EntranceMode, EntranceOptions, ExportOptions, PlanarMap};
use tagged_map::{TaggedMap, WayID};

#[derive(StructOpt)]
#[structopt(name = "rcr", about = "Rescue map preparation tools")]
enum Command {
    /// Adds connector roads to buildings that can't reach the road network, then writes the
    /// updated tagged map.
    PlaceEntrances {
        /// The path to a tagged map in JSON
        #[structopt(long)]
        input: String,
        /// Where to write the updated map
        #[structopt(long)]
        output: String,
        /// Only connect this one building, by way ID
        #[structopt(long)]
        building: Option<i64>,
        #[structopt(flatten)]
        opts: EntranceOptions,
    },
    /// Deletes connector roads created earlier, along with the nodes they inserted.
    RemoveEntrances {
        /// The path to a tagged map in JSON
        #[structopt(long)]
        input: String,
        /// Where to write the updated map
        #[structopt(long)]
        output: String,
        /// The way IDs of the connectors. If none are given, every connector is removed.
        #[structopt(long)]
        way: Vec<i64>,
    },
    /// Removes repeated nodes and road clusters disconnected from the main network.
    Clean {
        /// The path to a tagged map in JSON
        #[structopt(long)]
        input: String,
        /// Where to write the cleaned map
        #[structopt(long)]
        output: String,
    },
    /// Reports overlapping geometry and ways that can't reach the main network.
    Check {
        /// The path to a tagged map in JSON
        #[structopt()]
        input: String,
    },
    /// Builds the planar map and writes it as JSON.
    Export {
        /// The path to a tagged map in JSON
        #[structopt(long)]
        input: String,
        /// Where to write the planar map
        #[structopt(long)]
        output: String,
        #[structopt(flatten)]
        opts: ExportOptions,
    },
}

fn main() -> Result<()> {
    maputil::logger::setup();

    match Command::from_args() {
        Command::PlaceEntrances {
            input,
            output,
            building,
            opts,
        } => place_entrances(input, output, building, opts),
        Command::RemoveEntrances { input, output, way } => remove_entrances(input, output, way),
        Command::Clean { input, output } => clean(input, output),
        Command::Check { input } => check::run(input),
        Command::Export {
            input,
            output,
            opts,
        } => export(input, output, opts),
    }
}

fn place_entrances(
    input: String,
    output: String,
    building: Option<i64>,
    opts: EntranceOptions,
) -> Result<()> {
    let mut timer = Timer::new("place entrances");
    let mut map = TaggedMap::load_json(&input, &mut timer)?;
    let mut generator = EntranceGenerator::new(&map, opts);
    match building {
        Some(id) => {
            let building = WayID(id);
            let mode = if map.largest_connected_group().contains(&building) {
                EntranceMode::RoadsOnly
            } else {
                EntranceMode::Any
            };
            match generator.place_entrance(&mut map, building, mode)? {
                Some(way) => println!("Connected {} with {}", building, way),
                None => println!("Couldn't find an entrance for {}", building),
            }
        }
        None => {
            let created = generator.generate_all(&mut map, &mut timer)?;
            println!("Created {} entrances", created.len());
        }
    }
    map.save_json(&output)?;
    info!("Wrote {}", output);
    Ok(())
}

fn remove_entrances(input: String, output: String, ways: Vec<i64>) -> Result<()> {
    let mut timer = Timer::new("remove entrances");
    let mut map = TaggedMap::load_json(&input, &mut timer)?;
    let ways: Vec<WayID> = if ways.is_empty() {
        map.all_ways()
            .iter()
            .filter(|(_, w)| w.is_entrance())
            .map(|(id, _)| *id)
            .collect()
    } else {
        ways.into_iter().map(WayID).collect()
    };
    for id in &ways {
        map.remove_entrance(*id)?;
    }
    timer.note(format!("Removed {} entrances", ways.len()));
    map.save_json(&output)?;
    info!("Wrote {}", output);
    Ok(())
}

fn clean(input: String, output: String) -> Result<()> {
    let mut timer = Timer::new("clean map");
    let mut map = TaggedMap::load_json(&input, &mut timer)?;
    let ids: Vec<WayID> = map.all_ways().keys().cloned().collect();
    let mut fixed = 0;
    for id in ids {
        if map.remove_duplicate_nodes(id)? {
            fixed += 1;
        }
    }
    timer.note(format!("Removed repeated nodes from {} ways", fixed));
    map.remove_disconnected_roads(&mut timer)?;
    timer.note(map.summary());
    map.save_json(&output)?;
    info!("Wrote {}", output);
    Ok(())
}

fn export(input: String, output: String, opts: ExportOptions) -> Result<()> {
    let mut timer = Timer::new("export planar map");
    let map = TaggedMap::load_json(&input, &mut timer)?;
    let planar = PlanarMap::export(&map, &opts, &mut timer)?;
    planar.validate()?;
    planar.save_json(&output)?;
    info!("Wrote {}", output);
    Ok(())
}
