// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use graph_builder::GraphBuilder;

use crate::osm::{Profile, CAR_PROFILE};
use crate::Graph;

mod graph_builder;
mod model;
mod xml;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the first bytes of the content
    Unknown,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,

    /// [OSM PBF](https://wiki.openstreetmap.org/wiki/PBF_Format), which is recognized
    /// but not supported - convert it to XML first (e.g. with `osmium cat`).
    Pbf,
}

impl FileFormat {
    /// Guesses the format of a file from its first bytes.
    pub fn detect(head: &[u8]) -> Self {
        let trimmed = head
            .strip_prefix(b"\xEF\xBB\xBF")
            .unwrap_or(head)
            .trim_ascii_start();

        if head.starts_with(&[0x1F, 0x8B]) {
            Self::XmlGz
        } else if head.starts_with(b"BZh") {
            Self::XmlBz2
        } else if trimmed.starts_with(b"<") {
            Self::Xml
        } else if head.get(4..15) == Some(&b"\x0A\x09OSMHeader"[..]) {
            // 4-byte BlobHeader length, followed by the `type` field with "OSMHeader"
            Self::Pbf
        } else {
            Self::Unknown
        }
    }
}

/// Additional controls for interpreting OSM data as a routing [Graph].
#[derive(Debug, Clone, Copy)]
pub struct Options<'a> {
    /// How OSM ways should be classified and converted into a [Graph].
    pub profile: &'a Profile<'a>,

    /// Format of the input data.
    pub file_format: FileFormat,

    /// Filter nodes by a specific bounding box. In order: left (min lon), bottom (min lat),
    /// right (max lon), top (max lat). Ignored if all values are set to zero, or at least one
    /// of them is not finite.
    pub bbox: [f64; 4],
}

impl Default for Options<'static> {
    fn default() -> Self {
        Self {
            profile: &CAR_PROFILE,
            file_format: FileFormat::Unknown,
            bbox: [0.0; 4],
        }
    }
}

/// Error which can occur when loading OSM data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unsupported file format: {0:?}")]
    UnsupportedFormat(FileFormat),

    #[error("no nodes with valid positions in the source data")]
    Empty,
}

/// Geometry of all drivable ways sharing the same name and highway class,
/// kept for drawing. Roads don't participate in routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Road {
    /// Value of the name=* tag, or "unnamed".
    pub name: String,

    /// Value of the highway=* tag.
    pub highway: String,

    /// Node references of every way making up this road, one list per way.
    /// References may point to nodes which are absent from the [Graph].
    pub segments: Vec<Vec<i64>>,
}

/// Everything extracted from an OSM file.
#[derive(Debug, Clone, Default)]
pub struct Extract {
    pub graph: Graph,
    pub roads: Vec<Road>,
}

fn non_empty(extract: Extract) -> Result<Extract, Error> {
    if extract.graph.is_empty() {
        Err(Error::Empty)
    } else {
        Ok(extract)
    }
}

fn load_xml<R: BufRead>(options: &Options<'_>, reader: R) -> Result<Extract, Error> {
    let extract = GraphBuilder::new(options).add_features(xml::Reader::from_io(reader))?;
    non_empty(extract)
}

/// Parse OSM features from a reader into a [Graph] as per the provided [Options].
///
/// The provided stream will be automatically wrapped in a buffered reader when needed.
/// On error, nothing is returned - a partially read file never results in a partial graph.
pub fn load_from_io<R: io::Read>(options: &Options<'_>, reader: R) -> Result<Extract, Error> {
    let mut b = io::BufReader::new(reader);
    if b.fill_buf()?.is_empty() {
        return Err(Error::Empty);
    }

    let file_format = match options.file_format {
        FileFormat::Unknown => {
            let detected = FileFormat::detect(b.fill_buf()?);
            log::debug!("detected file format: {detected:?}");
            detected
        }
        forced => forced,
    };

    match file_format {
        FileFormat::Xml => load_xml(options, b),

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(b);
            load_xml(options, io::BufReader::new(d))
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(b);
            load_xml(options, io::BufReader::new(d))
        }

        FileFormat::Pbf | FileFormat::Unknown => Err(Error::UnsupportedFormat(file_format)),
    }
}

/// Parse OSM features from a file at the provided path into a [Graph] as per the provided [Options].
pub fn load_from_file<P: AsRef<Path>>(options: &Options<'_>, path: P) -> Result<Extract, Error> {
    let f = File::open(path)?;
    load_from_io(options, f)
}

/// Parse OSM features from an in-memory buffer into a [Graph] as per the provided [Options].
pub fn load_from_buffer(options: &Options<'_>, data: &[u8]) -> Result<Extract, Error> {
    let is_xml = match options.file_format {
        FileFormat::Xml => true,
        FileFormat::Unknown => FileFormat::detect(data) == FileFormat::Xml,
        _ => false,
    };

    if is_xml {
        // Fast path is available for in-memory XML data
        let extract = GraphBuilder::new(options).add_features(xml::Reader::from_buffer(data))?;
        non_empty(extract)
    } else {
        load_from_io(options, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect() {
        assert_eq!(FileFormat::detect(b"<?xml version='1.0'?>"), FileFormat::Xml);
        assert_eq!(FileFormat::detect(b"\xEF\xBB\xBF\n  <osm>"), FileFormat::Xml);
        assert_eq!(FileFormat::detect(&[0x1F, 0x8B, 0x08, 0x00]), FileFormat::XmlGz);
        assert_eq!(FileFormat::detect(b"BZh91AY&SY"), FileFormat::XmlBz2);
        assert_eq!(
            FileFormat::detect(b"\x00\x00\x00\x0D\x0A\x09OSMHeader"),
            FileFormat::Pbf
        );
        assert_eq!(FileFormat::detect(b"hello"), FileFormat::Unknown);
        assert_eq!(FileFormat::detect(b""), FileFormat::Unknown);
    }

    #[test]
    fn empty_source_is_an_error() {
        let options = Options::default();
        let result = load_from_buffer(&options, b"<osm version='0.6'></osm>");
        assert!(matches!(result, Err(Error::Empty)));
    }

    #[test]
    fn zero_byte_source_is_empty() {
        let options = Options::default();
        assert!(matches!(load_from_buffer(&options, b""), Err(Error::Empty)));
        assert!(matches!(
            load_from_io(&options, io::Cursor::new(b"")),
            Err(Error::Empty)
        ));

        let forced_gz = Options {
            file_format: FileFormat::XmlGz,
            ..options
        };
        assert!(matches!(load_from_buffer(&forced_gz, b""), Err(Error::Empty)));
    }

    #[test]
    fn unreadable_source_is_an_error() {
        let options = Options::default();
        assert!(matches!(
            load_from_buffer(&options, b"\x00\x00\x00\x0D\x0A\x09OSMHeader"),
            Err(Error::UnsupportedFormat(FileFormat::Pbf))
        ));
        assert!(matches!(
            load_from_buffer(&options, b"<osm><node id='1' lat='1' lon='1'></way></osm>"),
            Err(Error::Xml(_))
        ));
        assert!(matches!(
            load_from_file(&options, "/nonexistent/karachi.osm"),
            Err(Error::Io(_))
        ));
    }
}
