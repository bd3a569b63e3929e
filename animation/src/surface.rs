use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use model::{Coordinate, IconSpec};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolylineId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathStyle {
    pub color: String,
    pub width: f64,
}

/// Opaque marker content produced by the icon collaborator.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerVisual {
    pub content: String,
}

/// The icon/asset collaborator.
pub trait IconRenderer {
    fn render_icon(&self, icon: &IconSpec) -> MarkerVisual;
}

/// The host map widget, reduced to the primitives this core consumes. The
/// widget may be torn down at any moment; `is_alive` is checked before every
/// mutation via [`SurfaceHandle`].
pub trait MapSurface {
    fn is_alive(&self) -> bool;

    fn add_polyline(&mut self, path: &[Coordinate], style: &PathStyle) -> PolylineId;
    fn update_polyline(&mut self, id: PolylineId, path: &[Coordinate], style: &PathStyle);
    fn remove_polyline(&mut self, id: PolylineId);

    fn add_marker(&mut self, visual: &MarkerVisual, pos: Coordinate) -> MarkerId;
    fn move_marker(&mut self, id: MarkerId, pos: Coordinate, rotation_degrees: f64);
    fn remove_marker(&mut self, id: MarkerId);

    fn pan_to(&mut self, center: Coordinate);
    fn set_zoom(&mut self, zoom: f64);
    fn zoom(&self) -> f64;
    /// True while the camera is mid-transition (host-driven fly/zoom).
    fn is_camera_moving(&self) -> bool;
}

/// Capability wrapper that centralizes the liveness checks against the host
/// widget. Every surface mutation goes through [`SurfaceHandle::with`]; when
/// the surface is detached or reports dead, the mutation silently no-ops for
/// this frame and the caller retries on the next one.
#[derive(Clone)]
pub struct SurfaceHandle {
    inner: Rc<RefCell<Option<Box<dyn MapSurface>>>>,
}

impl SurfaceHandle {
    pub fn new(surface: Box<dyn MapSurface>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Some(surface))),
        }
    }

    /// A handle with no surface attached; every `with` call no-ops.
    pub fn detached() -> Self {
        Self {
            inner: Rc::new(RefCell::new(None)),
        }
    }

    pub fn is_usable(&self) -> bool {
        match &*self.inner.borrow() {
            Some(surface) => surface.is_alive(),
            None => false,
        }
    }

    /// Run `f` against the surface if it is attached and alive. Returns None
    /// when it isn't, which callers treat as "skip this frame's mutation".
    pub fn with<T>(&self, f: impl FnOnce(&mut dyn MapSurface) -> T) -> Option<T> {
        let mut borrow = self.inner.borrow_mut();
        match borrow.as_mut() {
            Some(surface) if surface.is_alive() => Some(f(surface.as_mut())),
            _ => None,
        }
    }

    /// Drop the surface, e.g. when the owning widget unmounts. Idempotent.
    pub fn detach(&self) {
        *self.inner.borrow_mut() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FlakySurface {
        alive: Rc<Cell<bool>>,
        pans: Rc<Cell<usize>>,
    }

    impl MapSurface for FlakySurface {
        fn is_alive(&self) -> bool {
            self.alive.get()
        }
        fn add_polyline(&mut self, _: &[Coordinate], _: &PathStyle) -> PolylineId {
            PolylineId(0)
        }
        fn update_polyline(&mut self, _: PolylineId, _: &[Coordinate], _: &PathStyle) {}
        fn remove_polyline(&mut self, _: PolylineId) {}
        fn add_marker(&mut self, _: &MarkerVisual, _: Coordinate) -> MarkerId {
            MarkerId(0)
        }
        fn move_marker(&mut self, _: MarkerId, _: Coordinate, _: f64) {}
        fn remove_marker(&mut self, _: MarkerId) {}
        fn pan_to(&mut self, _: Coordinate) {
            self.pans.set(self.pans.get() + 1);
        }
        fn set_zoom(&mut self, _: f64) {}
        fn zoom(&self) -> f64 {
            10.0
        }
        fn is_camera_moving(&self) -> bool {
            false
        }
    }

    #[test]
    fn with_skips_dead_surface() {
        let alive = Rc::new(Cell::new(true));
        let pans = Rc::new(Cell::new(0));
        let handle = SurfaceHandle::new(Box::new(FlakySurface {
            alive: alive.clone(),
            pans: pans.clone(),
        }));

        assert!(handle.is_usable());
        assert!(handle
            .with(|s| s.pan_to(Coordinate::new(0.0, 0.0)))
            .is_some());
        assert_eq!(pans.get(), 1);

        alive.set(false);
        assert!(!handle.is_usable());
        assert!(handle
            .with(|s| s.pan_to(Coordinate::new(0.0, 0.0)))
            .is_none());
        assert_eq!(pans.get(), 1);

        // Recovers when the surface comes back
        alive.set(true);
        assert!(handle
            .with(|s| s.pan_to(Coordinate::new(0.0, 0.0)))
            .is_some());
        assert_eq!(pans.get(), 2);
    }

    #[test]
    fn detach_is_idempotent() {
        let handle = SurfaceHandle::detached();
        assert!(!handle.is_usable());
        assert!(handle.with(|s| s.zoom()).is_none());
        handle.detach();
        handle.detach();
        assert!(!handle.is_usable());
    }
}
