#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod builder;
pub mod geodesic;

use anyhow::Result;
use geojson::{Geometry, Value};
use serde::{Deserialize, Serialize};

pub use self::builder::{build_route_path, RouteError, RouteMode, RoutingBackend, Waypoint};

/// A (longitude, latitude) position in degrees. Paths are ordered sequences
/// of these; geometry comes from external authors, so any individual
/// coordinate may be malformed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_valid(self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// Routes sharing a chain ID render as one continuous journey, sharing a
/// single marker across their back-to-back animations.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub String);

/// The travel polyline. Always has at least 2 valid coordinates; malformed
/// points may appear between them and are skipped by the geodesic math.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutePath {
    points: Vec<Coordinate>,
}

impl RoutePath {
    pub fn new(points: Vec<Coordinate>) -> Result<Self> {
        let valid = points.iter().filter(|pt| pt.is_valid()).count();
        if valid < 2 {
            bail!(
                "RoutePath needs at least 2 valid points, got {} valid of {}",
                valid,
                points.len()
            );
        }
        // Malformed points are reported once here; the per-frame geodesic
        // walkers skip them silently.
        if valid < points.len() {
            warn!(
                "Skipping {} malformed of {} path coordinates",
                points.len() - valid,
                points.len()
            );
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    /// The first valid coordinate. The constructor guarantees one exists.
    pub fn origin(&self) -> Coordinate {
        *self
            .points
            .iter()
            .find(|pt| pt.is_valid())
            .unwrap_or(&self.points[0])
    }

    /// The last valid coordinate.
    pub fn destination(&self) -> Coordinate {
        *self
            .points
            .iter()
            .rev()
            .find(|pt| pt.is_valid())
            .unwrap_or(&self.points[self.points.len() - 1])
    }

    pub fn to_geojson(&self) -> Geometry {
        let line = self
            .points
            .iter()
            .map(|pt| vec![pt.lon, pt.lat])
            .collect::<Vec<_>>();
        Geometry::new(Value::LineString(line))
    }

    pub fn from_geojson(geometry: &Geometry) -> Result<Self> {
        match &geometry.value {
            Value::LineString(line) => {
                let mut points = Vec::new();
                for pos in line {
                    if pos.len() < 2 {
                        bail!("LineString position has {} ordinates", pos.len());
                    }
                    points.push(Coordinate::new(pos[0], pos[1]));
                }
                Self::new(points)
            }
            other => bail!("expected a LineString, got {:?}", other),
        }
    }
}

/// Immutable description of one route animation, authored by the route
/// editor and persisted as JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteAnimationSpec {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub path: RoutePath,
    pub icon: IconSpec,
    pub remaining_color: String,
    pub visited_color: String,
    pub stroke_width: f64,
    pub duration_ms: f64,
    pub chain_id: Option<ChainId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IconSpec {
    pub kind: IconKind,
    pub custom_image: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IconKind {
    Vehicle,
    Walk,
    Boat,
    Plane,
    Custom,
}

/// A discrete camera jump attached to a route, applied when playback starts
/// ("before") or after the destination is reached ("after").
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraTransition {
    pub center: Coordinate,
    pub zoom: f64,
}
