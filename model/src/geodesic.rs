//! Great-circle distance and position interpolation over externally-authored
//! paths. Positions within a segment use planar linear interpolation of
//! lon/lat, a close approximation over short segments; long segments drift
//! from the true great-circle track.

use crate::Coordinate;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Haversine distance in kilometres. Symmetric, and 0 iff the points match.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Total length in kilometres over consecutive valid points. Malformed
/// points contribute nothing; a path with fewer than 2 valid points has
/// length 0.
pub fn path_length(path: &[Coordinate]) -> f64 {
    let mut total = 0.0;
    let mut prev: Option<Coordinate> = None;
    for pt in valid_points(path) {
        if let Some(prev) = prev {
            total += distance(prev, pt);
        }
        prev = Some(pt);
    }
    total
}

/// The coordinate `d` kilometres along the path. Clamps to the endpoints,
/// skips malformed points, and only returns None when no valid point exists.
pub fn position_at_distance(path: &[Coordinate], d: f64) -> Option<Coordinate> {
    let mut iter = valid_points(path);
    let first = iter.next()?;
    if d <= 0.0 {
        return Some(first);
    }

    let mut covered = 0.0;
    let mut prev = first;
    for pt in iter {
        let segment = distance(prev, pt);
        if covered + segment >= d {
            if segment == 0.0 {
                return Some(pt);
            }
            let pct = (d - covered) / segment;
            return Some(Coordinate::new(
                prev.lon + (pt.lon - prev.lon) * pct,
                prev.lat + (pt.lat - prev.lat) * pct,
            ));
        }
        covered += segment;
        prev = pt;
    }
    // Past the end of the path
    Some(prev)
}

/// The sub-path already traversed at `progress`, ending with one
/// interpolated cut point at the progress boundary.
pub fn visited_prefix(path: &[Coordinate], progress: f64) -> Vec<Coordinate> {
    let progress = progress.clamp(0.0, 1.0);
    let target = progress * path_length(path);

    let mut result = Vec::new();
    let mut covered = 0.0;
    let mut prev: Option<Coordinate> = None;
    for pt in valid_points(path) {
        if let Some(prev) = prev {
            let segment = distance(prev, pt);
            if covered + segment >= target {
                break;
            }
            covered += segment;
        }
        result.push(pt);
        prev = Some(pt);
    }
    if let Some(cut) = position_at_distance(path, target) {
        result.push(cut);
    }
    result
}

/// Planar angle in degrees of the segment being traversed at `progress`
/// (atan2 of the lat/lon deltas, counterclockwise from due east). Only used
/// for marker rotation, not navigation-grade heading. None when the path has
/// no non-degenerate segment there.
pub fn bearing(path: &[Coordinate], progress: f64) -> Option<f64> {
    let progress = progress.clamp(0.0, 1.0);
    let target = progress * path_length(path);

    let mut covered = 0.0;
    let mut prev: Option<Coordinate> = None;
    let mut last_segment = None;
    for pt in valid_points(path) {
        if let Some(prev) = prev {
            let segment = distance(prev, pt);
            if segment > 0.0 {
                last_segment = Some((prev, pt));
            }
            if covered + segment >= target && segment > 0.0 {
                return Some(segment_angle(prev, pt));
            }
            covered += segment;
        }
        prev = Some(pt);
    }
    // At progress 1 the accumulated distance may fall just short of the
    // target from float rounding; use the last real segment.
    last_segment.map(|(a, b)| segment_angle(a, b))
}

fn segment_angle(a: Coordinate, b: Coordinate) -> f64 {
    (b.lat - a.lat).atan2(b.lon - a.lon).to_degrees()
}

/// Iterate the valid points of a path. Malformed geometry is reported once
/// at `RoutePath` construction; these walkers run every frame and stay
/// silent.
fn valid_points(path: &[Coordinate]) -> impl Iterator<Item = Coordinate> + '_ {
    path.iter().copied().filter(|pt| pt.is_valid())
}
