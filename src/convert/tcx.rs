// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Minimal TCX (Training Center XML) reader.
//!
//! Only the pieces needed for mapping are extracted: trackpoint
//! positions (with optional altitude) and the lap count. Trackpoints
//! without a GPS position are skipped.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::convert::kml::Coordinate;
use crate::error::{AppError, Result};

/// GPS data pulled from one TCX file.
#[derive(Debug, Clone, Default)]
pub struct TcxTrack {
    pub points: Vec<Coordinate>,
    pub laps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Capture {
    None,
    Latitude,
    Longitude,
    Altitude,
}

/// Parse a TCX document.
pub fn parse_tcx(xml: &str) -> Result<TcxTrack> {
    let mut reader = Reader::from_str(xml);
    let mut track = TcxTrack::default();

    let mut capture = Capture::None;
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;
    let mut alt: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Lap" => track.laps += 1,
                b"Trackpoint" => {
                    lat = None;
                    lon = None;
                    alt = None;
                }
                b"LatitudeDegrees" => capture = Capture::Latitude,
                b"LongitudeDegrees" => capture = Capture::Longitude,
                b"AltitudeMeters" => capture = Capture::Altitude,
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| AppError::Xml(e.to_string()))?;
                let value = text.trim().parse::<f64>().ok();
                match capture {
                    Capture::Latitude => lat = value,
                    Capture::Longitude => lon = value,
                    Capture::Altitude => alt = value,
                    Capture::None => {}
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"LatitudeDegrees" | b"LongitudeDegrees" | b"AltitudeMeters" => {
                    capture = Capture::None;
                }
                b"Trackpoint" => {
                    if let (Some(lat), Some(lon)) = (lat, lon) {
                        track.points.push(Coordinate { lon, lat, alt });
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(AppError::Xml(e.to_string())),
            _ => {}
        }
    }

    Ok(track)
}
