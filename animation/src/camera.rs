use model::{CameraTransition, Coordinate};

use crate::surface::SurfaceHandle;

/// At most one pan command per animation frame, so a fast position stream
/// doesn't saturate the host widget.
const PAN_THROTTLE_MS: f64 = 16.0;
/// Zoom differences below this aren't worth a command.
const ZOOM_EPSILON: f64 = 0.01;
/// Fraction of the zoom gap closed per applied command.
const ZOOM_STEP: f64 = 0.25;

#[derive(Clone, Copy, Debug, Default)]
pub struct CameraFollow {
    pub enabled: bool,
    pub target_zoom: Option<f64>,
}

/// Translates runner position updates into throttled camera commands, and
/// applies the optional discrete before/after transitions around a route's
/// playback window.
pub struct CameraSync {
    follow: CameraFollow,
    before: Option<CameraTransition>,
    after: Option<CameraTransition>,
    /// Set when a prior segment in the same chain already positioned the
    /// camera; suppresses both transitions to avoid redundant jumps.
    skip_transitions: bool,

    before_applied: bool,
    after_applied: bool,
    last_pan_ms: Option<f64>,
}

impl CameraSync {
    pub fn new(
        follow: CameraFollow,
        before: Option<CameraTransition>,
        after: Option<CameraTransition>,
        skip_transitions: bool,
    ) -> Self {
        Self {
            follow,
            before,
            after,
            skip_transitions,
            before_applied: false,
            after_applied: false,
            last_pan_ms: None,
        }
    }

    /// Apply the "before" transition, once per play cycle. Doesn't block the
    /// animation's own start; if the surface is unusable right now, the next
    /// position frame retries.
    pub fn on_play(&mut self, surface: &SurfaceHandle) {
        self.try_before(surface);
    }

    pub fn on_position(&mut self, surface: &SurfaceHandle, pos: Coordinate, now_ms: f64) {
        if !self.before_applied {
            self.try_before(surface);
        }
        if !self.follow.enabled {
            return;
        }
        // Don't fight a host-driven camera transition
        if surface.with(|s| s.is_camera_moving()) != Some(false) {
            return;
        }
        if let Some(last) = self.last_pan_ms {
            if now_ms - last < PAN_THROTTLE_MS {
                return;
            }
        }
        let target_zoom = self.follow.target_zoom;
        let applied = surface.with(|s| {
            s.pan_to(pos);
            if let Some(target) = target_zoom {
                let current = s.zoom();
                if (current - target).abs() > ZOOM_EPSILON {
                    s.set_zoom(current + (target - current) * ZOOM_STEP);
                }
            }
        });
        if applied.is_some() {
            self.last_pan_ms = Some(now_ms);
        }
    }

    /// True while an "after" transition still needs a usable surface. The
    /// orchestrator keeps scheduling frames until this clears.
    pub fn after_pending(&self) -> bool {
        !self.skip_transitions && !self.after_applied && self.after.is_some()
    }

    /// Apply the "after" transition, once, when the destination is reached.
    /// Leaves it pending if the surface is unusable right now.
    pub fn on_complete(&mut self, surface: &SurfaceHandle) {
        if self.after_applied || self.skip_transitions {
            return;
        }
        if let Some(transition) = self.after {
            if apply(surface, transition) {
                self.after_applied = true;
            }
        } else {
            self.after_applied = true;
        }
    }

    /// Re-arm both transitions for the next play cycle.
    pub fn on_stop(&mut self) {
        self.before_applied = false;
        self.after_applied = false;
        self.last_pan_ms = None;
    }

    fn try_before(&mut self, surface: &SurfaceHandle) {
        if self.before_applied {
            return;
        }
        if self.skip_transitions {
            self.before_applied = true;
            return;
        }
        match self.before {
            Some(transition) => {
                if apply(surface, transition) {
                    self.before_applied = true;
                }
            }
            None => self.before_applied = true,
        }
    }
}

fn apply(surface: &SurfaceHandle, transition: CameraTransition) -> bool {
    surface
        .with(|s| {
            s.pan_to(transition.center);
            s.set_zoom(transition.zoom);
        })
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::surface::{MapSurface, MarkerId, MarkerVisual, PathStyle, PolylineId};

    #[derive(Default)]
    struct CameraLog {
        pans: Vec<Coordinate>,
        zooms: Vec<f64>,
        moving: bool,
        zoom: f64,
    }

    struct CameraSurface {
        log: Rc<RefCell<CameraLog>>,
    }

    impl MapSurface for CameraSurface {
        fn is_alive(&self) -> bool {
            true
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
        fn pan_to(&mut self, center: Coordinate) {
            self.log.borrow_mut().pans.push(center);
        }
        fn set_zoom(&mut self, zoom: f64) {
            let mut log = self.log.borrow_mut();
            log.zoom = zoom;
            log.zooms.push(zoom);
        }
        fn zoom(&self) -> f64 {
            self.log.borrow().zoom
        }
        fn is_camera_moving(&self) -> bool {
            self.log.borrow().moving
        }
    }

    fn setup() -> (SurfaceHandle, Rc<RefCell<CameraLog>>) {
        let log = Rc::new(RefCell::new(CameraLog::default()));
        let surface = SurfaceHandle::new(Box::new(CameraSurface { log: log.clone() }));
        (surface, log)
    }

    #[test]
    fn follow_pans_are_throttled() {
        let (surface, log) = setup();
        let mut camera = CameraSync::new(
            CameraFollow {
                enabled: true,
                target_zoom: None,
            },
            None,
            None,
            false,
        );

        // 1 ms apart: only the first and the one past the 16 ms window land
        for i in 0..20 {
            camera.on_position(&surface, Coordinate::new(i as f64, 0.0), i as f64);
        }
        assert_eq!(log.borrow().pans.len(), 2);
        assert_eq!(log.borrow().pans[0], Coordinate::new(0.0, 0.0));
        assert_eq!(log.borrow().pans[1], Coordinate::new(16.0, 0.0));
    }

    #[test]
    fn follow_defers_to_host_camera_motion() {
        let (surface, log) = setup();
        let mut camera = CameraSync::new(
            CameraFollow {
                enabled: true,
                target_zoom: None,
            },
            None,
            None,
            false,
        );

        log.borrow_mut().moving = true;
        camera.on_position(&surface, Coordinate::new(1.0, 1.0), 0.0);
        assert!(log.borrow().pans.is_empty());

        log.borrow_mut().moving = false;
        camera.on_position(&surface, Coordinate::new(2.0, 2.0), 20.0);
        assert_eq!(log.borrow().pans.len(), 1);
    }

    #[test]
    fn follow_zoom_nudges_toward_target() {
        let (surface, log) = setup();
        log.borrow_mut().zoom = 8.0;
        let mut camera = CameraSync::new(
            CameraFollow {
                enabled: true,
                target_zoom: Some(12.0),
            },
            None,
            None,
            false,
        );

        camera.on_position(&surface, Coordinate::new(0.0, 0.0), 0.0);
        assert_eq!(log.borrow().zooms, vec![9.0]);
        camera.on_position(&surface, Coordinate::new(0.0, 0.0), 20.0);
        assert_eq!(log.borrow().zooms, vec![9.0, 9.75]);
    }

    #[test]
    fn before_and_after_fire_once_per_cycle() {
        let (surface, log) = setup();
        let before = CameraTransition {
            center: Coordinate::new(1.0, 1.0),
            zoom: 10.0,
        };
        let after = CameraTransition {
            center: Coordinate::new(2.0, 2.0),
            zoom: 4.0,
        };
        let mut camera = CameraSync::new(CameraFollow::default(), Some(before), Some(after), false);

        camera.on_play(&surface);
        camera.on_play(&surface);
        assert_eq!(log.borrow().pans, vec![before.center]);

        camera.on_complete(&surface);
        camera.on_complete(&surface);
        assert_eq!(log.borrow().pans, vec![before.center, after.center]);

        // Stop re-arms for the next cycle
        camera.on_stop();
        camera.on_play(&surface);
        assert_eq!(
            log.borrow().pans,
            vec![before.center, after.center, before.center]
        );
    }

    #[test]
    fn skip_flag_suppresses_transitions() {
        let (surface, log) = setup();
        let before = CameraTransition {
            center: Coordinate::new(1.0, 1.0),
            zoom: 10.0,
        };
        let mut camera = CameraSync::new(CameraFollow::default(), Some(before), Some(before), true);

        camera.on_play(&surface);
        camera.on_complete(&surface);
        assert!(log.borrow().pans.is_empty());
    }

    #[test]
    fn before_retries_until_the_surface_is_usable() {
        let (surface, log) = setup();
        let before = CameraTransition {
            center: Coordinate::new(1.0, 1.0),
            zoom: 10.0,
        };
        let mut camera = CameraSync::new(CameraFollow::default(), Some(before), None, false);

        let dead = SurfaceHandle::detached();
        camera.on_play(&dead);
        assert!(log.borrow().pans.is_empty());

        // Next position frame against a live surface lands it
        camera.on_position(&surface, Coordinate::new(0.0, 0.0), 0.0);
        assert_eq!(log.borrow().pans, vec![before.center]);
    }
}
