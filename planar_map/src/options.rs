use serde::{Deserialize, Serialize};
use structopt::StructOpt;

use geom::Distance;

/// How entrances are searched for and created.
#[derive(StructOpt, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntranceOptions {
    /// Width of each created connector road, in millimeters. Endpoints snap to existing nodes
    /// within half of this.
    #[structopt(long, default_value = "3000")]
    pub entrance_width_mm: u32,
    /// Walls shorter than this (in meters) don't get an entrance at their midpoint.
    #[structopt(long, default_value = "2.0")]
    pub min_wall_length: f64,
    /// In meters
    #[structopt(long, default_value = "0.5")]
    pub min_entrance_length: f64,
    /// In meters. Also the search radius around each candidate anchor.
    #[structopt(long, default_value = "50.0")]
    pub max_entrance_length: f64,
    /// Connectors whose direction mismatch is at most this are preferred. 0 means the connector
    /// leaves the building and meets its target head-on.
    #[structopt(long, default_value = "0.5")]
    pub deviation_threshold: f64,
    /// When candidates are otherwise equally good, pick the longest instead of the shortest.
    #[structopt(long)]
    pub prefer_longer: bool,
}

impl Default for EntranceOptions {
    fn default() -> Self {
        EntranceOptions {
            entrance_width_mm: tagged_map::DEFAULT_ENTRANCE_WIDTH_MM,
            min_wall_length: 2.0,
            min_entrance_length: 0.5,
            max_entrance_length: 50.0,
            deviation_threshold: 0.5,
            prefer_longer: false,
        }
    }
}

impl EntranceOptions {
    pub fn entrance_width(&self) -> Distance {
        Distance::millimeters(self.entrance_width_mm)
    }

    pub fn min_length(&self) -> Distance {
        Distance::meters(self.min_entrance_length)
    }

    pub fn max_length(&self) -> Distance {
        Distance::meters(self.max_entrance_length)
    }
}

/// Tuning for the planar map export.
#[derive(StructOpt, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Two roads meeting at a junction are treated as parallel when the cosine of the angle
    /// between their kerbs is at least this.
    #[structopt(long, default_value = "0.9")]
    pub parallel_cos_threshold: f64,
    /// Kerb apexes stay within this many half-widths of the junction, measured along each
    /// road.
    #[structopt(long, default_value = "2.0")]
    pub junction_clamp_factor: f64,
    /// Don't open up walls to connect stranded buildings.
    #[structopt(long)]
    pub skip_repair: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            parallel_cos_threshold: 0.9,
            junction_clamp_factor: 2.0,
            skip_repair: false,
        }
    }
}
