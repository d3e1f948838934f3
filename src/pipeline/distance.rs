/// Statute miles per degree of arc (60 nautical miles * 1.1515).
const MILES_PER_DEGREE: f64 = 60.0 * 1.1515;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Miles,
    Kilometers,
    Meters,
    NauticalMiles,
}

impl DistanceUnit {
    fn per_mile(self) -> f64 {
        match self {
            DistanceUnit::Miles => 1.0,
            DistanceUnit::Kilometers => 1.609344,
            DistanceUnit::Meters => 1609.344,
            DistanceUnit::NauticalMiles => 0.8684,
        }
    }
}

/// Great-circle distance by the spherical law of cosines.
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64, unit: DistanceUnit) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let theta = (lon1 - lon2).to_radians();

    // Rounding can push the cosine just past 1 for coincident points.
    let cosine = (phi1.sin() * phi2.sin() + phi1.cos() * phi2.cos() * theta.cos()).clamp(-1.0, 1.0);
    let degrees = cosine.acos().to_degrees();

    degrees * MILES_PER_DEGREE * unit.per_mile()
}

pub fn meters_between(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    great_circle_distance(lat1, lon1, lat2, lon2, DistanceUnit::Meters)
}
