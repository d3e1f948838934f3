use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One timestamped GPS sample of a run, as posted to the fitness backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub time: String,
    pub altitude: f64,
    pub distance: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub cadence: Option<f64>,
    pub speed: Option<f64>,
    pub heart_rate: Option<f64>,
}

impl SamplePoint {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub name: String,
    /// Session start, verbatim from the source file.
    pub time: String,
    pub points: Vec<SamplePoint>,
}

impl ActivityRecord {
    /// Key under which the record is stored in a read batch.
    pub fn key(&self) -> &str {
        &self.time
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Tcx,
    Gpx,
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        ext.parse().ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Tcx => "tcx",
            FileFormat::Gpx => "gpx",
        }
    }
}

impl FromStr for FileFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tcx" => Ok(FileFormat::Tcx),
            "gpx" => Ok(FileFormat::Gpx),
            _ => Err(ParseError::UnsupportedFormat(s.to_string())),
        }
    }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_filename_is_case_insensitive() {
        assert_eq!(FileFormat::from_filename("Morning.TCX"), Some(FileFormat::Tcx));
        assert_eq!(FileFormat::from_filename("track.gpx"), Some(FileFormat::Gpx));
        assert_eq!(FileFormat::from_filename("notes.txt"), None);
        assert_eq!(FileFormat::from_filename("gpx"), None);
    }

    #[test]
    fn format_parses_query_values() {
        assert_eq!(" TCX ".parse::<FileFormat>().expect("tcx"), FileFormat::Tcx);
        assert_eq!("gpx".parse::<FileFormat>().expect("gpx"), FileFormat::Gpx);
        let err = "fit".parse::<FileFormat>().expect_err("fit");
        assert!(matches!(err, ParseError::UnsupportedFormat(ref value) if value == "fit"));
    }

    #[test]
    fn absent_optional_fields_serialize_as_null() {
        let point = SamplePoint {
            time: "2017-03-04T08:00:00Z".to_string(),
            altitude: 12.5,
            distance: 0.0,
            latitude: 51.5,
            longitude: -0.12,
            cadence: None,
            speed: Some(3.1),
            heart_rate: None,
        };
        let json = serde_json::to_value(&point).expect("serialize");
        assert!(json["cadence"].is_null());
        assert!(json["heart_rate"].is_null());
        assert_eq!(json["speed"], 3.1);
        assert_eq!(json["time"], "2017-03-04T08:00:00Z");
    }

    #[test]
    fn timestamps_keep_fractional_seconds() {
        let ts = parse_timestamp("2017-03-04T08:00:01.500Z").expect("timestamp");
        assert_eq!(ts.timestamp_millis() % 1000, 500);
        assert!(parse_timestamp("yesterday").is_none());
    }
}
