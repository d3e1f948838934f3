use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{local_name, number, set_number_once, set_once, Parser, DEFAULT_ACTIVITY_NAME};
use crate::error::ParseError;
use crate::pipeline::distance::meters_between;
use crate::types::activity::{ActivityRecord, SamplePoint};

const RUNNING_TYPE: &str = "running";

pub struct GpxParser;

#[derive(Default)]
struct TrackBuilder {
    name: Option<String>,
    kind: Option<String>,
    points: Vec<SamplePoint>,
    /// Last retained position and its cumulative distance.
    previous: Option<(f64, f64, f64)>,
}

impl TrackBuilder {
    fn push(&mut self, point: TrkptBuilder) {
        let (Some(time), Some(altitude), Some(latitude), Some(longitude)) =
            (point.time, point.altitude, point.latitude, point.longitude)
        else {
            return;
        };

        let distance = match self.previous {
            Some((prev_lat, prev_lon, prev_distance)) => {
                prev_distance + meters_between(prev_lat, prev_lon, latitude, longitude)
            }
            None => 0.0,
        };
        self.previous = Some((latitude, longitude, distance));

        self.points.push(SamplePoint {
            time,
            altitude,
            distance,
            latitude,
            longitude,
            cadence: point.cadence,
            speed: None,
            heart_rate: point.heart_rate,
        });
    }

    fn is_running(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|kind| kind.trim().eq_ignore_ascii_case(RUNNING_TYPE))
    }

    fn finish(self) -> Option<ActivityRecord> {
        if !self.is_running() {
            return None;
        }
        let time = self.points.first()?.time.clone();
        Some(ActivityRecord {
            name: self.name.unwrap_or_else(|| DEFAULT_ACTIVITY_NAME.to_string()),
            time,
            points: self.points,
        })
    }
}

#[derive(Default)]
struct TrkptBuilder {
    time: Option<String>,
    altitude: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    cadence: Option<f64>,
    heart_rate: Option<f64>,
}

impl TrkptBuilder {
    fn from_start(e: &BytesStart<'_>) -> Result<Self, ParseError> {
        let mut point = Self::default();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
            let value = attr
                .unescape_value()
                .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
            match attr.key.local_name().as_ref() {
                b"lat" => point.latitude = number(&value),
                b"lon" => point.longitude = number(&value),
                _ => {}
            }
        }
        Ok(point)
    }

    fn accept(&mut self, element: &str, text: &str) {
        match element {
            "time" => set_once(&mut self.time, text),
            "ele" => set_number_once(&mut self.altitude, text),
            "hr" => set_number_once(&mut self.heart_rate, text),
            "cad" => set_number_once(&mut self.cadence, text),
            _ => {}
        }
    }
}

impl Parser for GpxParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<ActivityRecord>, ParseError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut activities = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut track: Option<TrackBuilder> = None;
        let mut trkpt: Option<TrkptBuilder> = None;
        let mut buf = Vec::new();

        loop {
            let text = match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = local_name(e.local_name().as_ref());
                    match name.as_str() {
                        "trk" => track = Some(TrackBuilder::default()),
                        "trkpt" if track.is_some() => trkpt = Some(TrkptBuilder::from_start(&e)?),
                        _ => {}
                    }
                    path.push(name);
                    None
                }
                Ok(Event::End(e)) => {
                    let name = local_name(e.local_name().as_ref());
                    match name.as_str() {
                        "trkpt" => {
                            if let (Some(point), Some(track)) = (trkpt.take(), track.as_mut()) {
                                track.push(point);
                            }
                        }
                        "trk" => {
                            if let Some(record) = track.take().and_then(TrackBuilder::finish) {
                                activities.push(record);
                            }
                        }
                        _ => {}
                    }
                    path.pop();
                    None
                }
                Ok(Event::Text(e)) => Some(
                    e.unescape()
                        .map_err(|e| ParseError::InvalidGpx(e.to_string()))?
                        .into_owned(),
                ),
                Ok(Event::CData(e)) => Some(String::from_utf8_lossy(&e.into_inner()).into_owned()),
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::InvalidGpx(e.to_string())),
                _ => None,
            };

            if let Some(text) = text {
                let element = path.last().map(String::as_str);
                let parent = path.len().checked_sub(2).map(|i| path[i].as_str());
                match (element, trkpt.as_mut(), track.as_mut()) {
                    (Some(element), Some(point), _) => point.accept(element, &text),
                    (Some("name"), None, Some(track)) if parent == Some("trk") => {
                        set_once(&mut track.name, &text)
                    }
                    (Some("type"), None, Some(track)) if parent == Some("trk") => {
                        set_once(&mut track.kind, &text)
                    }
                    _ => {}
                }
            }
            buf.clear();
        }

        tracing::debug!("Parsed {} running tracks from GPX", activities.len());
        Ok(activities)
    }
}
