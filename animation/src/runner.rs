use std::cell::RefCell;
use std::rc::Rc;

use model::{geodesic, Coordinate, RouteAnimationSpec};

use crate::pool::{MarkerPool, MemberId};
use crate::surface::{IconRenderer, MarkerId, MarkerVisual, PathStyle, PolylineId, SurfaceHandle};

/// Whether the host should schedule another frame for this runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameRequest {
    Continue,
    Idle,
}

/// What one frame produced, for the camera synchronizer and the host.
#[derive(Clone, Copy, Debug)]
pub struct FrameOutcome {
    pub request: FrameRequest,
    pub position: Option<Coordinate>,
    pub just_completed: bool,
}

impl FrameOutcome {
    fn idle() -> Self {
        Self {
            request: FrameRequest::Idle,
            position: None,
            just_completed: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Idle,
    /// `started_at` is set on the first frame of this play cycle.
    Playing { started_at: Option<f64> },
    Completed,
}

/// Drives one route animation: a monotonic progress clock, per-frame
/// position/rotation/visited-path computation, and the surface updates for
/// this route's visuals. Chained runners share their marker through the
/// [`MarkerPool`]; unchained ones own a marker directly.
pub struct AnimationRunner {
    spec: RouteAnimationSpec,
    surface: SurfaceHandle,
    /// Present iff the spec carries a chain ID.
    pool: Option<(Rc<RefCell<MarkerPool>>, MemberId)>,
    visual: MarkerVisual,
    total_length: f64,

    phase: Phase,
    progress: f64,
    has_completed: bool,
    last_rotation: f64,

    remaining_line: Option<PolylineId>,
    visited_line: Option<PolylineId>,
    solo_marker: Option<MarkerId>,

    on_position: Option<Box<dyn FnMut(Coordinate, f64)>>,
    on_complete: Option<Box<dyn FnMut()>>,

    torn_down: bool,
}

impl AnimationRunner {
    pub fn new(
        mut spec: RouteAnimationSpec,
        surface: SurfaceHandle,
        pool: Rc<RefCell<MarkerPool>>,
        icons: &dyn IconRenderer,
    ) -> Self {
        // A NaN/infinite duration would poison the progress math; degrade it
        // to "complete immediately", like any other duration <= 0
        if !spec.duration_ms.is_finite() {
            warn!(
                "Route duration {}ms isn't finite, treating as 0",
                spec.duration_ms
            );
            spec.duration_ms = 0.0;
        }
        let visual = icons.render_icon(&spec.icon);
        let total_length = geodesic::path_length(spec.path.points());
        let pool = spec.chain_id.as_ref().map(|chain| {
            let member = pool.borrow_mut().register(chain);
            (pool.clone(), member)
        });
        Self {
            spec,
            surface,
            pool,
            visual,
            total_length,
            phase: Phase::Idle,
            progress: 0.0,
            has_completed: false,
            last_rotation: 0.0,
            remaining_line: None,
            visited_line: None,
            solo_marker: None,
            on_position: None,
            on_complete: None,
            torn_down: false,
        }
    }

    pub fn set_on_position(&mut self, cb: Box<dyn FnMut(Coordinate, f64)>) {
        self.on_position = Some(cb);
    }

    pub fn set_on_complete(&mut self, cb: Box<dyn FnMut()>) {
        self.on_complete = Some(cb);
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.phase, Phase::Playing { .. })
    }

    pub fn has_completed(&self) -> bool {
        self.has_completed
    }

    /// Enter `Playing`. A no-op while `has_completed` is set; restarting a
    /// finished route requires an explicit stop first, so upstream re-renders
    /// can't trigger spurious replay loops. Also a no-op if already playing.
    pub fn play(&mut self) {
        if self.has_completed || self.is_playing() {
            return;
        }
        self.phase = Phase::Playing { started_at: None };
        if let Some((pool, member)) = &self.pool {
            pool.borrow_mut()
                .set_member_animating(self.chain(), *member, true);
        }
        debug!("Runner starting, duration {}ms", self.spec.duration_ms);
    }

    /// Advance one frame. Surface mutations silently skip when the host
    /// widget is unusable this frame and are retried on the next one.
    pub fn on_frame(&mut self, now_ms: f64) -> FrameOutcome {
        let started_at = match self.phase {
            Phase::Playing { started_at } => started_at.unwrap_or(now_ms),
            _ => return FrameOutcome::idle(),
        };
        self.phase = Phase::Playing {
            started_at: Some(started_at),
        };

        self.ensure_visuals();

        let elapsed = (now_ms - started_at).max(0.0);
        self.progress = if self.spec.duration_ms <= 0.0 {
            // Zero or negative duration: complete on the next frame
            1.0
        } else {
            (elapsed / self.spec.duration_ms).clamp(0.0, 1.0)
        };

        let path = self.spec.path.points();
        let traveled = (self.progress * self.total_length).max(0.0);
        let position = geodesic::position_at_distance(path, traveled);

        if let Some(pos) = position {
            if let Some(rotation) = geodesic::bearing(path, self.progress) {
                self.last_rotation = rotation;
            }
            let rotation = self.last_rotation;

            match &self.pool {
                Some((pool, member)) => {
                    pool.borrow_mut().update_position(
                        self.chain(),
                        *member,
                        &self.surface,
                        pos,
                        rotation,
                    );
                }
                None => {
                    if let Some(marker) = self.solo_marker {
                        let _ = self.surface.with(|s| s.move_marker(marker, pos, rotation));
                    }
                }
            }

            if let Some(cb) = &mut self.on_position {
                cb(pos, self.progress);
            }

            self.draw_visited();
        }

        if self.progress >= 1.0 {
            self.phase = Phase::Completed;
            self.has_completed = true;
            if let Some((pool, member)) = &self.pool {
                pool.borrow_mut()
                    .set_member_animating(self.chain(), *member, false);
            }
            debug!("Runner completed");
            if let Some(cb) = &mut self.on_complete {
                cb();
            }
            return FrameOutcome {
                request: FrameRequest::Idle,
                position,
                just_completed: true,
            };
        }

        FrameOutcome {
            request: FrameRequest::Continue,
            position,
            just_completed: false,
        }
    }

    /// Discard progress and return to `Idle`: marker back at the origin,
    /// visited path cleared, completion flag reset. Idempotent.
    pub fn stop(&mut self) {
        if self.phase == Phase::Idle && self.progress == 0.0 && !self.has_completed {
            return;
        }
        self.phase = Phase::Idle;
        self.progress = 0.0;
        self.has_completed = false;
        self.last_rotation = 0.0;

        let origin = self.origin();
        match &self.pool {
            Some((pool, member)) => {
                let chain = self.chain().clone();
                let mut pool = pool.borrow_mut();
                // Applies only while this member still owns motion, so a
                // stopped member never yanks the marker away from whichever
                // member is animating it now.
                pool.update_position(&chain, *member, &self.surface, origin, 0.0);
                pool.set_member_animating(&chain, *member, false);
            }
            None => {
                if let Some(marker) = self.solo_marker {
                    let _ = self.surface.with(|s| s.move_marker(marker, origin, 0.0));
                }
            }
        }

        if let Some(line) = self.visited_line.take() {
            let _ = self.surface.with(|s| s.remove_polyline(line));
        }
        debug!("Runner stopped and reset");
    }

    /// Remove this runner's visuals and leave its chain. Idempotent; called
    /// on drop.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Some(line) = self.remaining_line.take() {
            let _ = self.surface.with(|s| s.remove_polyline(line));
        }
        if let Some(line) = self.visited_line.take() {
            let _ = self.surface.with(|s| s.remove_polyline(line));
        }
        if let Some(marker) = self.solo_marker.take() {
            let _ = self.surface.with(|s| s.remove_marker(marker));
        }
        if let Some((pool, member)) = self.pool.take() {
            if let Some(chain) = &self.spec.chain_id {
                pool.borrow_mut().release(chain, member, &self.surface);
            }
        }
    }

    fn chain(&self) -> &model::ChainId {
        self.spec
            .chain_id
            .as_ref()
            .unwrap_or_else(|| unreachable!("pool membership implies a chain ID"))
    }

    /// The configured origin, falling back to the path's first valid point
    /// when the authored origin is malformed.
    fn origin(&self) -> Coordinate {
        if self.spec.origin.is_valid() {
            self.spec.origin
        } else {
            self.spec.path.origin()
        }
    }

    fn remaining_style(&self) -> PathStyle {
        PathStyle {
            color: self.spec.remaining_color.clone(),
            width: self.spec.stroke_width,
        }
    }

    fn visited_style(&self) -> PathStyle {
        PathStyle {
            color: self.spec.visited_color.clone(),
            width: self.spec.stroke_width,
        }
    }

    /// Lazily create the route polyline and marker. Retried every frame
    /// until the surface accepts them.
    fn ensure_visuals(&mut self) {
        if self.remaining_line.is_none() {
            let style = self.remaining_style();
            self.remaining_line = self
                .surface
                .with(|s| s.add_polyline(self.spec.path.points(), &style));
        }
        match &self.pool {
            Some((pool, _)) => {
                let origin = self.origin();
                let _ = pool.borrow_mut().get_or_create_marker(
                    self.chain(),
                    &self.surface,
                    &self.visual,
                    origin,
                );
            }
            None => {
                if self.solo_marker.is_none() {
                    let origin = self.origin();
                    self.solo_marker =
                        self.surface.with(|s| s.add_marker(&self.visual, origin));
                }
            }
        }
    }

    fn draw_visited(&mut self) {
        let visited = geodesic::visited_prefix(self.spec.path.points(), self.progress);
        let style = self.visited_style();
        match self.visited_line {
            Some(line) => {
                let _ = self
                    .surface
                    .with(|s| s.update_polyline(line, &visited, &style));
            }
            None => {
                self.visited_line = self.surface.with(|s| s.add_polyline(&visited, &style));
            }
        }
    }
}

impl Drop for AnimationRunner {
    fn drop(&mut self) {
        self.teardown();
    }
}
