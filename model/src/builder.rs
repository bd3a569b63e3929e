use std::collections::BTreeSet;

use thiserror::Error;

use crate::{Coordinate, RoutePath};

/// A waypoint reference as supplied by the authoring UI. Resolution to a
/// coordinate happens upstream; `pos` is None when it failed.
#[derive(Clone, Debug)]
pub struct Waypoint {
    pub id: String,
    pub pos: Option<Coordinate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteMode {
    /// Follow the road network between waypoints.
    Road,
    /// Connect the waypoints directly.
    Straight,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route connects the requested waypoints")]
    RouteNotFound,
    #[error("need at least 2 distinct resolvable waypoints, got {0}")]
    InsufficientWaypoints(usize),
    #[error("routing backend returned a malformed path: {0}")]
    MalformedPath(String),
}

/// The external routing collaborator, resolving an ordered waypoint list to
/// one stitched polyline covering all of them in order.
pub trait RoutingBackend {
    fn resolve_route(
        &self,
        waypoints: &[Coordinate],
        mode: RouteMode,
    ) -> Result<RoutePath, RouteError>;
}

/// Turn an ordered waypoint list (start, intermediate stops, end) into a
/// single travel polyline. Duplicate waypoint IDs are dropped, keeping the
/// first occurrence; unresolvable waypoints are dropped too. Never returns a
/// partial path.
pub fn build_route_path(
    backend: &dyn RoutingBackend,
    waypoints: &[Waypoint],
    mode: RouteMode,
) -> Result<RoutePath, RouteError> {
    let mut seen = BTreeSet::new();
    let mut coords = Vec::new();
    let mut unresolved = 0;
    for wp in waypoints {
        if !seen.insert(wp.id.clone()) {
            continue;
        }
        match wp.pos {
            Some(pos) if pos.is_valid() => coords.push(pos),
            _ => unresolved += 1,
        }
    }
    if unresolved > 0 {
        warn!("Dropped {} unresolvable waypoints", unresolved);
    }
    if coords.len() < 2 {
        return Err(RouteError::InsufficientWaypoints(coords.len()));
    }

    let path = match mode {
        RouteMode::Road => backend.resolve_route(&coords, mode)?,
        RouteMode::Straight => RoutePath::new(coords)
            .map_err(|err| RouteError::MalformedPath(err.to_string()))?,
    };

    let valid = path.points().iter().filter(|pt| pt.is_valid()).count();
    if valid < 2 {
        return Err(RouteError::MalformedPath(format!(
            "{} valid points",
            valid
        )));
    }
    Ok(path)
}
