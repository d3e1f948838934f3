use serde_json::{Map, Value};

use crate::types::activity::{ActivityRecord, SamplePoint};
use crate::types::route::{RouteCollection, RouteFeature, MARKER_PROGRESS, MARKER_START, MARKER_STOP};

/// Raw samples per unit of reduction factor.
const POINTS_PER_REDUCTION: usize = 200;

/// Builds the segment-and-marker route description for a run: one line per
/// consecutive pair of reduced points, then the progress, start and stop
/// markers. Segment values come from the newer point of the pair.
pub fn build_route(activity: &ActivityRecord) -> RouteCollection {
    let points = reduced_points(&activity.points);
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return RouteCollection::default();
    };

    let with_heart_rate = points.iter().all(|p| p.heart_rate.is_some());
    let with_cadence = points.iter().all(|p| p.cadence.is_some());

    let mut features: Vec<RouteFeature> = points
        .windows(2)
        .enumerate()
        .map(|(idx, pair)| {
            let (a, b) = (&pair[0], &pair[1]);
            let mut values = Map::new();
            values.insert("elevation".to_string(), number(b.altitude));
            values.insert("pace".to_string(), number(segment_speed(a, b)));
            if with_heart_rate {
                values.insert("heart_rate".to_string(), optional(b.heart_rate));
            }
            if with_cadence {
                values.insert("cadence".to_string(), optional(b.cadence));
            }
            values.insert("distance".to_string(), number(b.distance));
            RouteFeature::segment(idx as u64, vec![coordinate(a), coordinate(b)], values)
        })
        .collect();

    features.push(RouteFeature::marker(MARKER_PROGRESS, coordinate(first)));
    features.push(RouteFeature::marker(MARKER_START, coordinate(first)));
    features.push(RouteFeature::marker(MARKER_STOP, coordinate(last)));

    tracing::debug!(
        "Built route from {} of {} points",
        points.len(),
        activity.points.len()
    );
    RouteCollection::new(features)
}

/// How many raw samples are averaged into one route point, so a route stays
/// at a few hundred segments however dense the recording is.
pub fn reduction_factor(point_count: usize) -> usize {
    (point_count / POINTS_PER_REDUCTION).max(1)
}

/// The first sample as recorded, then the rest condensed
/// `reduction_factor` samples at a time. A short final chunk is condensed
/// on its own.
pub fn reduced_points(points: &[SamplePoint]) -> Vec<SamplePoint> {
    let Some((first, rest)) = points.split_first() else {
        return Vec::new();
    };
    let factor = reduction_factor(points.len());
    if factor == 1 {
        return points.to_vec();
    }
    std::iter::once(first.clone())
        .chain(rest.chunks(factor).filter_map(condense_points))
        .collect()
}

/// Averages a chunk of samples into one. Time is the first sample's;
/// optional fields average over the samples that carry them.
pub fn condense_points(chunk: &[SamplePoint]) -> Option<SamplePoint> {
    let first = chunk.first()?;
    let count = chunk.len() as f64;
    let mean = |field: fn(&SamplePoint) -> f64| chunk.iter().map(field).sum::<f64>() / count;
    let mean_present = |field: fn(&SamplePoint) -> Option<f64>| {
        let present: Vec<f64> = chunk.iter().filter_map(field).collect();
        (!present.is_empty()).then(|| present.iter().sum::<f64>() / present.len() as f64)
    };

    Some(SamplePoint {
        time: first.time.clone(),
        altitude: mean(|p| p.altitude),
        distance: mean(|p| p.distance),
        latitude: mean(|p| p.latitude),
        longitude: mean(|p| p.longitude),
        cadence: mean_present(|p| p.cadence),
        speed: mean_present(|p| p.speed),
        heart_rate: mean_present(|p| p.heart_rate),
    })
}

fn coordinate(point: &SamplePoint) -> [f64; 2] {
    [point.longitude, point.latitude]
}

/// Meters per second over the segment; falls back to the recorded speed
/// when the timestamps do not advance.
fn segment_speed(a: &SamplePoint, b: &SamplePoint) -> f64 {
    let elapsed = match (a.timestamp(), b.timestamp()) {
        (Some(ta), Some(tb)) => (tb - ta).num_milliseconds() as f64 / 1000.0,
        _ => 0.0,
    };
    if elapsed > 0.0 {
        return ((b.distance - a.distance) / elapsed).max(0.0);
    }
    b.speed.or(a.speed).unwrap_or(0.0)
}

fn optional(value: Option<f64>) -> Value {
    value.map(number).unwrap_or(Value::Null)
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::route::{FeatureId, Geometry};

    fn point(seconds: u32, distance: f64, lon: f64) -> SamplePoint {
        SamplePoint {
            time: format!("2017-03-04T08:00:{:02}Z", seconds),
            altitude: 10.0 + distance / 10.0,
            distance,
            latitude: 47.0,
            longitude: lon,
            cadence: None,
            speed: None,
            heart_rate: Some(140.0 + seconds as f64),
        }
    }

    fn activity(points: Vec<SamplePoint>) -> ActivityRecord {
        ActivityRecord {
            name: "Run".to_string(),
            time: points
                .first()
                .map(|p| p.time.clone())
                .unwrap_or_default(),
            points,
        }
    }

    #[test]
    fn builds_segments_then_markers() {
        let run = activity(vec![point(0, 0.0, 11.0), point(10, 30.0, 11.1), point(20, 70.0, 11.2)]);
        let route = build_route(&run);
        assert_eq!(route.features.len(), 5);
        assert_eq!(route.segments().count(), 2);

        let first = &route.features[0];
        assert_eq!(first.id(), &FeatureId::Index(0));
        assert_eq!(first.value("pace"), Some(3.0));
        assert_eq!(first.value("distance"), Some(30.0));
        assert_eq!(first.value("elevation"), Some(13.0));
        assert_eq!(first.value("heart_rate"), Some(150.0));
        assert!(first.properties.values.get("cadence").is_none());
        assert_eq!(
            first.geometry,
            Geometry::LineString {
                coordinates: vec![[11.0, 47.0], [11.1, 47.0]]
            }
        );

        let stop = route
            .find(&FeatureId::marker(MARKER_STOP))
            .expect("stop marker");
        assert_eq!(stop.geometry.first_coordinate(), Some([11.2, 47.0]));
        let progress = route
            .find(&FeatureId::marker(MARKER_PROGRESS))
            .expect("progress marker");
        assert_eq!(progress.geometry.first_coordinate(), Some([11.0, 47.0]));
    }

    #[test]
    fn segments_share_one_property_schema() {
        let mut points = vec![point(0, 0.0, 11.0), point(5, 10.0, 11.1), point(9, 20.0, 11.2)];
        points[1].heart_rate = None;
        let route = build_route(&activity(points));
        let keys: Vec<Vec<&String>> = route
            .segments()
            .map(|f| f.properties.values.keys().collect())
            .collect();
        assert_eq!(keys[0], keys[1]);
        assert!(!keys[0].iter().any(|k| k.as_str() == "heart_rate"));
    }

    fn dense(count: usize) -> Vec<SamplePoint> {
        (0..count)
            .map(|i| SamplePoint {
                time: format!("2017-03-04T{:02}:{:02}:{:02}Z", 8 + i / 3600, i / 60 % 60, i % 60),
                altitude: 100.0,
                distance: i as f64 * 10.0,
                latitude: 47.0 + i as f64 * 1e-4,
                longitude: 11.0,
                cadence: None,
                speed: None,
                heart_rate: None,
            })
            .collect()
    }

    #[test]
    fn reduction_factor_grows_every_two_hundred_points() {
        assert_eq!(reduction_factor(0), 1);
        assert_eq!(reduction_factor(199), 1);
        assert_eq!(reduction_factor(399), 1);
        assert_eq!(reduction_factor(401), 2);
        assert_eq!(reduction_factor(5000), 25);
    }

    #[test]
    fn reduced_points_keep_first_sample_and_condense_the_rest() {
        assert_eq!(reduced_points(&dense(399)), dense(399));

        let points = dense(401);
        let reduced = reduced_points(&points);
        assert_eq!(reduced.len(), 201);
        assert_eq!(reduced[0], points[0]);
        assert_eq!(reduced[1].time, points[1].time);
        assert_eq!(reduced[1].distance, 15.0);
        assert_eq!(reduced[200].distance, 3995.0);

        let route = build_route(&activity(dense(5000)));
        assert_eq!(route.segments().count(), 200);
    }

    #[test]
    fn condensed_point_averages_present_values() {
        let mut chunk = vec![point(0, 10.0, 11.0), point(10, 30.0, 11.2), point(20, 50.0, 11.4)];
        chunk[0].speed = Some(3.0);
        chunk[2].speed = Some(4.0);
        chunk[1].heart_rate = None;

        let condensed = condense_points(&chunk).expect("condensed");
        assert_eq!(condensed.time, chunk[0].time);
        assert_eq!(condensed.distance, 30.0);
        assert!((condensed.longitude - 11.2).abs() < 1e-12);
        assert_eq!(condensed.speed, Some(3.5));
        assert_eq!(condensed.heart_rate, Some(150.0));
        assert_eq!(condensed.cadence, None);
        assert!(condense_points(&[]).is_none());
    }

    #[test]
    fn single_point_route_has_only_markers() {
        let route = build_route(&activity(vec![point(0, 0.0, 11.0)]));
        assert_eq!(route.segments().count(), 0);
        assert_eq!(route.features.len(), 3);
        assert!(build_route(&activity(Vec::new())).features.is_empty());
    }
}
