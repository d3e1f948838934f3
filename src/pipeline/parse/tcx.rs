use quick_xml::events::Event;
use quick_xml::Reader;

use super::{local_name, set_number_once, set_once, Parser, DEFAULT_ACTIVITY_NAME};
use crate::error::ParseError;
use crate::types::activity::{ActivityRecord, SamplePoint};

const RUNNING_SPORT: &str = "Running";

pub struct TcxParser;

#[derive(Default)]
struct ActivityBuilder {
    running: bool,
    id: Option<String>,
    notes: Option<String>,
    points: Vec<SamplePoint>,
}

impl ActivityBuilder {
    fn finish(self) -> Option<ActivityRecord> {
        if !self.running || self.points.is_empty() {
            return None;
        }
        Some(ActivityRecord {
            name: self
                .notes
                .unwrap_or_else(|| DEFAULT_ACTIVITY_NAME.to_string()),
            time: self.id?,
            points: self.points,
        })
    }
}

#[derive(Default)]
struct TrackpointBuilder {
    time: Option<String>,
    altitude: Option<f64>,
    distance: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    cadence: Option<f64>,
    speed: Option<f64>,
    heart_rate: Option<f64>,
}

impl TrackpointBuilder {
    fn accept(&mut self, element: &str, parent: Option<&str>, text: &str) {
        match element {
            "Time" => set_once(&mut self.time, text),
            "AltitudeMeters" => set_number_once(&mut self.altitude, text),
            "DistanceMeters" => set_number_once(&mut self.distance, text),
            "LatitudeDegrees" => set_number_once(&mut self.latitude, text),
            "LongitudeDegrees" => set_number_once(&mut self.longitude, text),
            "RunCadence" | "Cadence" => set_number_once(&mut self.cadence, text),
            "Speed" => set_number_once(&mut self.speed, text),
            "Value" if parent == Some("HeartRateBpm") => set_number_once(&mut self.heart_rate, text),
            _ => {}
        }
    }

    fn finish(self) -> Option<SamplePoint> {
        Some(SamplePoint {
            time: self.time?,
            altitude: self.altitude?,
            distance: self.distance?,
            latitude: self.latitude?,
            longitude: self.longitude?,
            cadence: self.cadence,
            speed: self.speed,
            heart_rate: self.heart_rate,
        })
    }
}

impl Parser for TcxParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<ActivityRecord>, ParseError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut activities = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut activity: Option<ActivityBuilder> = None;
        let mut trackpoint: Option<TrackpointBuilder> = None;
        let mut buf = Vec::new();

        loop {
            let text = match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = local_name(e.local_name().as_ref());
                    match name.as_str() {
                        "Activity" => {
                            let mut sport = None;
                            for attr in e.attributes() {
                                let attr = attr.map_err(|e| ParseError::InvalidTcx(e.to_string()))?;
                                if attr.key.local_name().as_ref() == b"Sport" {
                                    let value = attr
                                        .unescape_value()
                                        .map_err(|e| ParseError::InvalidTcx(e.to_string()))?;
                                    sport = Some(value.into_owned());
                                }
                            }
                            activity = Some(ActivityBuilder {
                                running: sport.as_deref() == Some(RUNNING_SPORT),
                                ..ActivityBuilder::default()
                            });
                        }
                        "Trackpoint" if activity.is_some() => {
                            trackpoint = Some(TrackpointBuilder::default());
                        }
                        _ => {}
                    }
                    path.push(name);
                    None
                }
                Ok(Event::End(e)) => {
                    let name = local_name(e.local_name().as_ref());
                    match name.as_str() {
                        "Trackpoint" => {
                            let point = trackpoint.take().and_then(TrackpointBuilder::finish);
                            if let (Some(point), Some(activity)) = (point, activity.as_mut()) {
                                activity.points.push(point);
                            }
                        }
                        "Activity" => {
                            if let Some(record) = activity.take().and_then(ActivityBuilder::finish) {
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
                        .map_err(|e| ParseError::InvalidTcx(e.to_string()))?
                        .into_owned(),
                ),
                Ok(Event::CData(e)) => Some(String::from_utf8_lossy(&e.into_inner()).into_owned()),
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::InvalidTcx(e.to_string())),
                _ => None,
            };

            if let Some(text) = text {
                let element = path.last().map(String::as_str);
                let parent = path.len().checked_sub(2).map(|i| path[i].as_str());
                match (element, trackpoint.as_mut(), activity.as_mut()) {
                    (Some(element), Some(point), _) => point.accept(element, parent, &text),
                    (Some("Id"), None, Some(activity)) => set_once(&mut activity.id, &text),
                    (Some("Notes"), None, Some(activity)) => set_once(&mut activity.notes, &text),
                    _ => {}
                }
            }
            buf.clear();
        }

        tracing::debug!("Parsed {} running activities from TCX", activities.len());
        Ok(activities)
    }
}
