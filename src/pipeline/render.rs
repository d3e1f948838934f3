//! Map overlays, chart series and hover synchronization for a route.
//!
//! Everything here is derived from a [`RouteCollection`]; the page draws the
//! result with its mapping and charting libraries.

use serde::Serialize;

use crate::error::RenderError;
use crate::types::palette::{self, Bounds, POINT_LINE_COLOR};
use crate::types::route::{FeatureId, Geometry, RouteCollection, RouteFeature, MARKER_PROGRESS};

const DISTANCE_FIELD: &str = "distance";
const MARKER_RADIUS: f64 = 5.0;
const MARKER_WEIGHT: f64 = 1.0;
const MARKER_FILL_OPACITY: f64 = 0.8;
const SERIES_BACKGROUND_SHADE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureStyle {
    Line {
        color: String,
        opacity: f64,
    },
    Marker {
        radius: f64,
        fill_color: String,
        color: String,
        weight: f64,
        opacity: f64,
        fill_opacity: f64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct StyledFeature {
    pub feature: RouteFeature,
    pub style: FeatureStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overlay {
    pub title: String,
    pub field: String,
    pub features: Vec<StyledFeature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseLayer {
    pub name: &'static str,
    pub provider: &'static str,
    pub default: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub base_layers: Vec<BaseLayer>,
    pub overlays: Vec<Overlay>,
    pub active_overlay: Option<String>,
    /// `[[south, west], [north, east]]`
    pub bounds: Option<[[f64; 2]; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<ChartPoint>,
    pub y_axis_id: String,
    pub border_color: String,
    pub background_color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisPosition {
    Left,
    Right,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TickFormat {
    Number,
    /// `m:ss` per kilometer for a value in meters per second.
    Pace,
    /// Meters shown as kilometers with two decimals.
    Kilometers,
}

impl TickFormat {
    pub fn label(self, value: f64) -> String {
        match self {
            TickFormat::Number => format!("{}", value),
            TickFormat::Pace => format_pace_tick(value),
            TickFormat::Kilometers => format_distance_tick(value),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Axis {
    pub id: String,
    pub position: AxisPosition,
    pub label: String,
    pub ticks: TickFormat,
    pub max: Option<f64>,
    pub max_label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub datasets: Vec<Dataset>,
    pub x_axis: Axis,
    pub y_axes: Vec<Axis>,
}

#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub fields: Vec<String>,
    pub map: MapView,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Numeric segment fields worth plotting, in document order. Taken from the
/// first line segment; `id` and `distance` are excluded.
pub fn route_fields(route: &RouteCollection) -> Vec<String> {
    route
        .segments()
        .next()
        .map(|segment| {
            segment
                .properties
                .values
                .keys()
                .filter(|key| !key.eq_ignore_ascii_case("id") && key.as_str() != DISTANCE_FIELD)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

pub fn property_bounds(route: &RouteCollection, field: &str) -> Option<Bounds> {
    Bounds::from_values(route.segments().filter_map(|f| f.value(field)))
}

pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    out
}

pub fn style_feature(feature: &RouteFeature, field: &str, bounds: Option<&Bounds>) -> FeatureStyle {
    match &feature.geometry {
        Geometry::Point { .. } => {
            let color = match feature.id() {
                FeatureId::Marker(name) => palette::marker_color(name),
                FeatureId::Index(_) => None,
            }
            .unwrap_or(POINT_LINE_COLOR)
            .to_string();
            FeatureStyle::Marker {
                radius: MARKER_RADIUS,
                fill_color: color.clone(),
                color,
                weight: MARKER_WEIGHT,
                opacity: 1.0,
                fill_opacity: MARKER_FILL_OPACITY,
            }
        }
        Geometry::LineString { .. } => {
            let color = match (feature.value(field), bounds) {
                (Some(value), Some(bounds)) => palette::band_color(value, bounds),
                _ => POINT_LINE_COLOR,
            };
            FeatureStyle::Line {
                color: color.to_string(),
                opacity: 1.0,
            }
        }
    }
}

pub fn overlay(route: &RouteCollection, field: &str) -> Overlay {
    let bounds = property_bounds(route, field);
    Overlay {
        title: title_case(field),
        field: field.to_string(),
        features: route
            .features
            .iter()
            .map(|feature| StyledFeature {
                feature: feature.clone(),
                style: style_feature(feature, field, bounds.as_ref()),
            })
            .collect(),
    }
}

pub fn map_view(route: &RouteCollection) -> MapView {
    let overlays: Vec<Overlay> = route_fields(route)
        .iter()
        .map(|field| overlay(route, field))
        .collect();
    MapView {
        base_layers: vec![
            BaseLayer {
                name: "Light",
                provider: "CartoDB.Positron",
                default: false,
            },
            BaseLayer {
                name: "Dark",
                provider: "CartoDB.DarkMatter",
                default: true,
            },
        ],
        active_overlay: overlays.first().map(|o| o.title.clone()),
        overlays,
        bounds: route_bounds(route),
    }
}

fn route_bounds(route: &RouteCollection) -> Option<[[f64; 2]; 2]> {
    let coordinates = route
        .features
        .iter()
        .flat_map(|f| f.geometry.coordinates().iter().copied());
    let mut bounds: Option<[[f64; 2]; 2]> = None;
    for [lon, lat] in coordinates {
        let b = bounds.get_or_insert([[lat, lon], [lat, lon]]);
        b[0][0] = b[0][0].min(lat);
        b[0][1] = b[0][1].min(lon);
        b[1][0] = b[1][0].max(lat);
        b[1][1] = b[1][1].max(lon);
    }
    bounds
}

/// One chart point per line segment so that a dataset index is also the
/// segment index.
pub fn chart_series(route: &RouteCollection, field: &str) -> Vec<ChartPoint> {
    route
        .segments()
        .map(|f| ChartPoint {
            x: f.value(DISTANCE_FIELD),
            y: f.value(field),
        })
        .collect()
}

pub fn chart_spec(route: &RouteCollection) -> ChartSpec {
    let fields = route_fields(route);
    let mut datasets = Vec::with_capacity(fields.len());
    let mut y_axes = Vec::with_capacity(fields.len());

    for (i, field) in fields.iter().enumerate() {
        let title = title_case(field);
        let axis_id = format!("{}-axis", field);
        let border_color = palette::series_color(i);
        let background_color = palette::shade_rgb(&border_color, SERIES_BACKGROUND_SHADE)
            .unwrap_or_else(|| border_color.clone());

        datasets.push(Dataset {
            label: title.clone(),
            data: chart_series(route, field),
            y_axis_id: axis_id.clone(),
            border_color,
            background_color,
        });
        y_axes.push(Axis {
            id: axis_id,
            position: if i % 2 == 1 {
                AxisPosition::Right
            } else {
                AxisPosition::Left
            },
            label: title,
            ticks: match field.as_str() {
                "pace" | "speed" => TickFormat::Pace,
                _ => TickFormat::Number,
            },
            max: None,
            max_label: None,
        });
    }

    let max_distance = route
        .segments()
        .filter_map(|f| f.value(DISTANCE_FIELD))
        .fold(0.0_f64, f64::max);

    ChartSpec {
        datasets,
        x_axis: Axis {
            id: "distance-axis".to_string(),
            position: AxisPosition::Bottom,
            label: "Distance".to_string(),
            ticks: TickFormat::Kilometers,
            max: Some(max_distance),
            max_label: Some(TickFormat::Kilometers.label(max_distance)),
        },
        y_axes,
    }
}

pub fn build_view(route: &RouteCollection) -> Result<View, RenderError> {
    if route.segments().next().is_none() {
        return Err(RenderError::EmptyRoute);
    }
    Ok(View {
        fields: route_fields(route),
        map: map_view(route),
        chart: chart_spec(route),
    })
}

/// Moves the progress marker to the start of the segment under the chart
/// cursor.
pub fn hover(route: &mut RouteCollection, index: u64) -> Result<ProgressUpdate, RenderError> {
    let [longitude, latitude] = route
        .segments()
        .find(|f| f.id().as_index() == Some(index))
        .and_then(|f| f.geometry.first_coordinate())
        .ok_or(RenderError::UnknownSegment(index))?;

    let marker = route
        .find_mut(&FeatureId::marker(MARKER_PROGRESS))
        .ok_or(RenderError::MissingMarker(MARKER_PROGRESS))?;
    marker.geometry = Geometry::Point {
        coordinates: [longitude, latitude],
    };

    Ok(ProgressUpdate {
        latitude,
        longitude,
    })
}

pub fn format_pace_tick(meters_per_second: f64) -> String {
    if !(meters_per_second.is_finite() && meters_per_second > 0.0) {
        return "-".to_string();
    }
    let seconds_per_km = 1000.0 / meters_per_second;
    let minutes = (seconds_per_km / 60.0).floor();
    let seconds = (seconds_per_km - minutes * 60.0).floor();
    format!("{}:{:02}", minutes as u64, seconds as u64)
}

pub fn format_distance_tick(meters: f64) -> String {
    format!("{:.2}", meters / 1000.0)
}
