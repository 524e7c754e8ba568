// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Conversion of [OpenStreetMap](https://www.openstreetmap.org/) data into a routing [Graph](crate::Graph).

mod profile;
mod reader;

pub use profile::{Classification, Direction, Profile, CAR_PROFILE};
pub use reader::{
    load_from_buffer, load_from_file, load_from_io, Error, Extract, FileFormat, Options, Road,
};
