//! Utilities shared by the map crates: timing and logging, small collections, tag handling, and
//! JSON I/O.

#[macro_use]
extern crate log;

mod collections;
mod io;
pub mod logger;
mod tags;
mod time;

pub use crate::collections::MultiMap;
pub use crate::io::{
    deserialize_btreemap, from_json, read_json, serialize_btreemap, to_json, write_json,
};
pub use crate::tags::Tags;
pub use crate::time::{prettyprint_time, prettyprint_usize, Timer};
