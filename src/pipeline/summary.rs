use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::types::activity::ActivityRecord;

const THUMBNAIL_SIZE: f64 = 30.0;
const FITNESS_DAYS: f64 = 42.0;
const FATIGUE_DAYS: f64 = 7.0;

/// Heart-rate reserve parameters for training impulse.
#[derive(Debug, Clone, Copy)]
pub struct HeartRateZones {
    pub resting: f64,
    pub maximum: f64,
    pub male: bool,
}

impl Default for HeartRateZones {
    fn default() -> Self {
        Self {
            resting: 50.0,
            maximum: 203.0,
            male: true,
        }
    }
}

/// What the page lists for each run found in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub key: String,
    pub name: String,
    pub time: String,
    pub points: usize,
    pub distance_km: f64,
    pub total_seconds: f64,
    pub duration: String,
    pub average_pace: f64,
    pub average_pace_label: String,
    pub trimp: Option<f64>,
    pub thumbnail: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyLoad {
    pub date: NaiveDate,
    pub trimp: f64,
    pub fitness: f64,
    pub fatigue: f64,
    pub form: f64,
}

pub fn summarize(activity: &ActivityRecord, zones: &HeartRateZones) -> RunSummary {
    let distance_km = total_distance_km(activity);
    let total_seconds = total_seconds(activity);
    let average_pace = average_pace(distance_km, total_seconds);
    RunSummary {
        key: activity.key().to_string(),
        name: activity.name.clone(),
        time: activity.time.clone(),
        points: activity.points.len(),
        distance_km,
        total_seconds,
        duration: format_duration(total_seconds),
        average_pace,
        average_pace_label: format_pace(average_pace),
        trimp: trimp(activity, zones),
        thumbnail: thumbnail(activity),
    }
}

pub fn total_distance_km(activity: &ActivityRecord) -> f64 {
    activity
        .points
        .last()
        .map(|p| p.distance / 1000.0)
        .unwrap_or(0.0)
}

pub fn total_seconds(activity: &ActivityRecord) -> f64 {
    let first = activity.points.first().and_then(|p| p.timestamp());
    let last = activity.points.last().and_then(|p| p.timestamp());
    match (first, last) {
        (Some(first), Some(last)) => (last - first).num_milliseconds().max(0) as f64 / 1000.0,
        _ => 0.0,
    }
}

/// Minutes per kilometer; zero for a run that covered no distance.
pub fn average_pace(distance_km: f64, seconds: f64) -> f64 {
    if distance_km <= 0.0 {
        return 0.0;
    }
    (seconds / 60.0) / distance_km
}

pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let total_minutes = total_seconds / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

pub fn format_pace(minutes_per_km: f64) -> String {
    let pace = minutes_per_km.max(0.0);
    let minutes = pace.trunc();
    let seconds = ((pace - minutes) * 60.0).trunc();
    format!("{}:{:02}", minutes as u64, seconds as u64)
}

/// Banister training impulse over consecutive heart-rate samples. `None`
/// when the run has no heart-rate data.
pub fn trimp(activity: &ActivityRecord, zones: &HeartRateZones) -> Option<f64> {
    let mut samples: Vec<_> = activity
        .points
        .iter()
        .filter_map(|p| Some((p.timestamp()?, p.heart_rate?)))
        .collect();
    if samples.is_empty() {
        return None;
    }
    samples.sort_by_key(|(time, _)| *time);

    let reserve_range = zones.maximum - zones.resting;
    if reserve_range <= 0.0 {
        return None;
    }
    let exponent = if zones.male { 1.92 } else { 1.67 };

    let total: f64 = samples
        .windows(2)
        .map(|pair| {
            let (t0, hr0) = pair[0];
            let (t1, hr1) = pair[1];
            let minutes = (t1 - t0).num_milliseconds() as f64 / 60_000.0;
            let average = (hr0 + hr1) / 2.0;
            let reserve = ((average - zones.resting) / reserve_range).clamp(0.0, 1.0);
            minutes * reserve * 0.64 * (exponent * reserve).exp()
        })
        .sum();
    Some(total)
}

/// Track scaled into a 30x30 box with north up.
pub fn thumbnail(activity: &ActivityRecord) -> Vec<[f64; 2]> {
    let points = &activity.points;
    if points.is_empty() {
        return Vec::new();
    }
    let (min_lat, max_lat) = extent(points.iter().map(|p| p.latitude));
    let (min_lon, max_lon) = extent(points.iter().map(|p| p.longitude));
    let lat_range = max_lat - min_lat;
    let lon_range = max_lon - min_lon;

    let scale = |value: f64, min: f64, range: f64| {
        if range > 0.0 {
            (value - min) / range
        } else {
            0.5
        }
    };

    points
        .iter()
        .map(|p| {
            [
                THUMBNAIL_SIZE * scale(p.longitude, min_lon, lon_range),
                THUMBNAIL_SIZE * (1.0 - scale(p.latitude, min_lat, lat_range)),
            ]
        })
        .collect()
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Daily TRIMP with exponentially weighted fitness (42 days) and fatigue
/// (7 days), from the first to the last run date.
pub fn training_load<'a>(
    activities: impl IntoIterator<Item = &'a ActivityRecord>,
    zones: &HeartRateZones,
) -> Vec<DailyLoad> {
    let mut calendar: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for activity in activities {
        let Some(start) = activity.start() else {
            continue;
        };
        *calendar.entry(start.date_naive()).or_insert(0.0) += trimp(activity, zones).unwrap_or(0.0);
    }

    let (Some(&first), Some(&last)) = (calendar.keys().next(), calendar.keys().next_back()) else {
        return Vec::new();
    };

    let fitness_rate = 1.0 - (-1.0 / FITNESS_DAYS).exp();
    let fatigue_rate = 1.0 - (-1.0 / FATIGUE_DAYS).exp();

    let mut days = Vec::new();
    let mut date = first;
    let mut previous: Option<(f64, f64)> = None;
    while date <= last {
        let trimp = calendar.get(&date).copied().unwrap_or(0.0);
        let (fitness, fatigue) = match previous {
            Some((fitness, fatigue)) => (
                fitness + (trimp - fitness) * fitness_rate,
                fatigue + (trimp - fatigue) * fatigue_rate,
            ),
            None => (0.0, 0.0),
        };
        previous = Some((fitness, fatigue));
        days.push(DailyLoad {
            date,
            trimp,
            fitness,
            fatigue,
            form: fitness - fatigue,
        });
        date += Duration::days(1);
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::activity::SamplePoint;

    fn point(time: &str, distance: f64, lat: f64, lon: f64, hr: Option<f64>) -> SamplePoint {
        SamplePoint {
            time: time.to_string(),
            altitude: 0.0,
            distance,
            latitude: lat,
            longitude: lon,
            cadence: None,
            speed: None,
            heart_rate: hr,
        }
    }

    fn run(day: u32, hr: Option<f64>) -> ActivityRecord {
        let start = format!("2017-03-{:02}T08:00:00Z", day);
        ActivityRecord {
            name: "Run".to_string(),
            time: start.clone(),
            points: vec![
                point(&start, 0.0, 47.0, 11.0, hr),
                point(&format!("2017-03-{:02}T08:25:00Z", day), 5000.0, 47.01, 11.02, hr),
            ],
        }
    }

    #[test]
    fn summary_totals_and_labels() {
        let summary = summarize(&run(4, None), &HeartRateZones::default());
        assert_eq!(summary.distance_km, 5.0);
        assert_eq!(summary.total_seconds, 1500.0);
        assert_eq!(summary.duration, "25:00");
        assert_eq!(summary.average_pace, 5.0);
        assert_eq!(summary.average_pace_label, "5:00");
        assert_eq!(summary.trimp, None);
        assert_eq!(summary.thumbnail, vec![[0.0, 30.0], [30.0, 0.0]]);
    }

    #[test]
    fn durations_switch_to_hours() {
        assert_eq!(format_duration(59.0), "0:59");
        assert_eq!(format_duration(3725.0), "1:02:05");
        assert_eq!(format_pace(4.5), "4:30");
        assert_eq!(average_pace(0.0, 100.0), 0.0);
    }

    #[test]
    fn trimp_weights_heart_rate_reserve() {
        let zones = HeartRateZones {
            resting: 50.0,
            maximum: 200.0,
            male: true,
        };
        let value = trimp(&run(4, Some(125.0)), &zones).expect("trimp");
        let expected = 25.0 * 0.5 * 0.64 * (1.92_f64 * 0.5).exp();
        assert!((value - expected).abs() < 1e-9);

        let female = HeartRateZones { male: false, ..zones };
        assert!(trimp(&run(4, Some(125.0)), &female).expect("trimp") < value);

        let resting = trimp(&run(4, Some(40.0)), &zones).expect("trimp");
        assert_eq!(resting, 0.0);
    }

    #[test]
    fn heart_rate_reserve_caps_above_maximum() {
        let zones = HeartRateZones {
            resting: 50.0,
            maximum: 130.0,
            male: true,
        };
        let value = trimp(&run(4, Some(200.0)), &zones).expect("trimp");
        let expected = 25.0 * 1.0 * 0.64 * 1.92_f64.exp();
        assert!((value - expected).abs() < 1e-9);
    }

    #[test]
    fn training_load_fills_rest_days() {
        let zones = HeartRateZones::default();
        let runs = [run(1, Some(150.0)), run(4, Some(150.0))];
        let load = training_load(runs.iter(), &zones);
        assert_eq!(load.len(), 4);
        assert_eq!(load[0].fitness, 0.0);
        assert_eq!(load[1].trimp, 0.0);
        assert!(load[3].trimp > 0.0);
        assert!(load[3].fatigue > load[3].fitness);
        assert!((load[3].form - (load[3].fitness - load[3].fatigue)).abs() < 1e-12);
        assert!(training_load(std::iter::empty(), &zones).is_empty());
    }
}
