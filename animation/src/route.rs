use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;

use model::{CameraTransition, Coordinate, RouteAnimationSpec};

use crate::camera::{CameraFollow, CameraSync};
use crate::clock::Clock;
use crate::pool::MarkerPool;
use crate::runner::{AnimationRunner, FrameRequest};
use crate::surface::{IconRenderer, SurfaceHandle};

/// Host-supplied playback options, collected by the authoring UI.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaybackConfig {
    pub follow_camera: bool,
    pub follow_zoom: Option<f64>,
    pub before: Option<CameraTransition>,
    pub after: Option<CameraTransition>,
    /// Set when a prior segment in the chain already positioned the camera.
    pub skip_camera_transitions: bool,
}

/// The adapter between the host map widget and one route animation: owns the
/// runner and camera sync, translates the host's `is_playing` signal and
/// frame ticks, and tears everything down on drop. This is the only layer
/// aware of host wiring.
pub struct RouteAnimation {
    runner: AnimationRunner,
    camera: CameraSync,
    clock: Rc<dyn Clock>,
    surface: SurfaceHandle,
    playing_signal: bool,
}

impl RouteAnimation {
    pub fn new(
        spec: RouteAnimationSpec,
        config: PlaybackConfig,
        surface: SurfaceHandle,
        pool: Rc<RefCell<MarkerPool>>,
        icons: &dyn IconRenderer,
        clock: Rc<dyn Clock>,
    ) -> Result<Self> {
        if !spec.duration_ms.is_finite() {
            bail!("route duration must be finite, got {}", spec.duration_ms);
        }
        let runner = AnimationRunner::new(spec, surface.clone(), pool, icons);
        let camera = CameraSync::new(
            CameraFollow {
                enabled: config.follow_camera,
                target_zoom: config.follow_zoom,
            },
            config.before,
            config.after,
            config.skip_camera_transitions,
        );
        Ok(Self {
            runner,
            camera,
            clock,
            surface,
            playing_signal: false,
        })
    }

    /// The host `is_playing` signal. Repeats of the current value are
    /// ignored, so upstream re-renders can't restart a finished route.
    pub fn set_playing(&mut self, playing: bool) {
        if playing == self.playing_signal {
            return;
        }
        self.playing_signal = playing;
        if playing {
            self.runner.play();
            self.camera.on_play(&self.surface);
        } else {
            self.runner.stop();
            self.camera.on_stop();
        }
    }

    /// One tick of the host's frame scheduler. Returns whether another frame
    /// should be scheduled.
    pub fn on_frame(&mut self) -> FrameRequest {
        let now = self.clock.now_ms();
        let outcome = self.runner.on_frame(now);
        if let Some(pos) = outcome.position {
            self.camera.on_position(&self.surface, pos, now);
        }
        if outcome.just_completed || (self.runner.has_completed() && self.camera.after_pending()) {
            self.camera.on_complete(&self.surface);
        }
        // The completing frame may land while the surface is unusable; keep
        // a frame scheduled until the "after" transition applies
        if self.runner.has_completed() && self.camera.after_pending() {
            return FrameRequest::Continue;
        }
        outcome.request
    }

    pub fn set_on_position(&mut self, cb: Box<dyn FnMut(Coordinate, f64)>) {
        self.runner.set_on_position(cb);
    }

    pub fn set_on_complete(&mut self, cb: Box<dyn FnMut()>) {
        self.runner.set_on_complete(cb);
    }

    pub fn progress(&self) -> f64 {
        self.runner.progress()
    }

    pub fn is_playing(&self) -> bool {
        self.runner.is_playing()
    }

    pub fn has_completed(&self) -> bool {
        self.runner.has_completed()
    }
}
