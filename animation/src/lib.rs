//! Animates a marker along a geographic route on a host map widget, keeping
//! the marker visually continuous across chained route segments. The widget
//! itself, the routing backend, and the icon renderer are consumed behind
//! traits; everything here runs cooperatively on the host's animation-frame
//! scheduler.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod camera;
mod clock;
mod pool;
mod route;
mod runner;
mod surface;

pub use self::camera::{CameraFollow, CameraSync};
pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::pool::{MarkerPool, MemberId};
pub use self::route::{PlaybackConfig, RouteAnimation};
pub use self::runner::{AnimationRunner, FrameOutcome, FrameRequest};
pub use self::surface::{
    IconRenderer, MapSurface, MarkerId, MarkerVisual, PathStyle, PolylineId, SurfaceHandle,
};
