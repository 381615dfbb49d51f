// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! KML rendering and parsing.
//!
//! The writer emits one `Placemark` with a red width-3 `LineString` per
//! track; the parser pulls LineStrings back out of arbitrary KML
//! documents (first LineString per Placemark).

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt::Write as _;

use crate::error::{AppError, Result};

pub const KML_NS: &str = "http://www.opengis.net/kml/2.2";

/// KML color in aabbggrr order: opaque red.
const LINE_COLOR: &str = "ff0000ff";
const LINE_WIDTH: &str = "3";

/// A single lon/lat(/alt) coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
    pub alt: Option<f64>,
}

/// A named LineString track.
#[derive(Debug, Clone)]
pub struct KmlTrack {
    pub name: String,
    pub coordinates: Vec<Coordinate>,
}

/// Render tracks into a standalone KML document.
pub fn render_kml(tracks: &[KmlTrack]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(out, "<kml xmlns=\"{KML_NS}\">");
    out.push_str("  <Document>\n");

    for track in tracks {
        out.push_str("    <Placemark>\n");
        let _ = writeln!(out, "      <name>{}</name>", escape(&track.name));
        out.push_str("      <Style>\n        <LineStyle>\n");
        let _ = writeln!(out, "          <color>{LINE_COLOR}</color>");
        let _ = writeln!(out, "          <width>{LINE_WIDTH}</width>");
        out.push_str("        </LineStyle>\n      </Style>\n");
        out.push_str("      <LineString>\n        <coordinates>\n");
        for coordinate in &track.coordinates {
            match coordinate.alt {
                Some(alt) => {
                    let _ = writeln!(
                        out,
                        "          {},{},{}",
                        coordinate.lon, coordinate.lat, alt
                    );
                }
                None => {
                    let _ = writeln!(out, "          {},{}", coordinate.lon, coordinate.lat);
                }
            }
        }
        out.push_str("        </coordinates>\n      </LineString>\n");
        out.push_str("    </Placemark>\n");
    }

    out.push_str("  </Document>\n</kml>\n");
    out
}

/// Extract LineString tracks from a KML document.
///
/// Placemarks without a LineString (or with empty coordinates) are
/// ignored; a Placemark missing a `<name>` falls back to `default_name`.
pub fn parse_kml_tracks(xml: &str, default_name: &str) -> Result<Vec<KmlTrack>> {
    let mut reader = Reader::from_str(xml);
    let mut tracks: Vec<KmlTrack> = Vec::new();

    let mut in_placemark = false;
    let mut in_linestring = false;
    let mut capture_name = false;
    let mut capture_coordinates = false;
    let mut name: Option<String> = None;
    let mut coordinates: Option<Vec<Coordinate>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Placemark" => {
                    in_placemark = true;
                    name = None;
                    coordinates = None;
                }
                b"LineString" if in_placemark => in_linestring = true,
                b"name" if in_placemark && !in_linestring && name.is_none() => {
                    capture_name = true;
                }
                b"coordinates" if in_linestring && coordinates.is_none() => {
                    capture_coordinates = true;
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| AppError::Xml(e.to_string()))?;
                if capture_name {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        name = Some(trimmed.to_string());
                    }
                } else if capture_coordinates {
                    let parsed = parse_coordinates(&text);
                    if !parsed.is_empty() {
                        coordinates = Some(parsed);
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"Placemark" => {
                    if let Some(coords) = coordinates.take() {
                        tracks.push(KmlTrack {
                            name: name.take().unwrap_or_else(|| default_name.to_string()),
                            coordinates: coords,
                        });
                    }
                    in_placemark = false;
                    in_linestring = false;
                }
                b"LineString" => in_linestring = false,
                b"name" => capture_name = false,
                b"coordinates" => capture_coordinates = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(AppError::Xml(e.to_string())),
            _ => {}
        }
    }

    Ok(tracks)
}

/// Convert a KML `coordinates` string into lon/lat(/alt) tuples.
/// Malformed chunks are skipped; a malformed altitude becomes 0.
pub fn parse_coordinates(raw: &str) -> Vec<Coordinate> {
    raw.split_whitespace()
        .filter_map(|chunk| {
            let mut parts = chunk.split(',');
            let lon = parts.next()?.parse::<f64>().ok()?;
            let lat = parts.next()?.parse::<f64>().ok()?;
            let alt = match parts.next() {
                Some(part) if !part.is_empty() => Some(part.parse::<f64>().unwrap_or(0.0)),
                _ => None,
            };
            Some(Coordinate { lon, lat, alt })
        })
        .collect()
}
