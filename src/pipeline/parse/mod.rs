mod gpx;
mod tcx;

use crate::error::ParseError;
use crate::types::activity::{ActivityRecord, FileFormat};

pub use gpx::GpxParser;
pub use tcx::TcxParser;

/// Name given to runs whose file carries none.
pub const DEFAULT_ACTIVITY_NAME: &str = "Run";

pub trait Parser {
    /// Extracts every running activity with at least one usable sample.
    fn parse(&self, bytes: &[u8]) -> Result<Vec<ActivityRecord>, ParseError>;
}

pub fn parse(bytes: &[u8], format: FileFormat) -> Result<Vec<ActivityRecord>, ParseError> {
    match format {
        FileFormat::Tcx => TcxParser.parse(bytes),
        FileFormat::Gpx => GpxParser.parse(bytes),
    }
}

fn local_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn set_once(slot: &mut Option<String>, text: &str) {
    if slot.is_none() {
        *slot = Some(text.to_string());
    }
}

fn set_number_once(slot: &mut Option<f64>, text: &str) {
    if slot.is_none() {
        *slot = number(text);
    }
}
