//! Per-pixel classification of a track field into a colour image.
//!
//! Every pixel `(x, y)` of a `width × height` grid is sampled at the integer
//! coordinate `(x, y)` and its distance `d` is bucketed:
//!
//! ```text
//!          d < surface_margin - half_width   →  Surface
//!  surface_margin - half_width ≤ d < boundary_limit   →  Boundary
//!          boundary_limit ≤ d < shoulder_limit        →  Shoulder
//!          shoulder_limit ≤ d                         →  OffTrack
//! ```
//!
//! Columns are independent, so they are evaluated in parallel with Rayon.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use ndarray::{Array3, ArrayView3, Axis, parallel::prelude::*};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    field::Field,
    types::{Point, Value},
};

/// The band a pixel falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelClass {
    Surface,
    Boundary,
    Shoulder,
    OffTrack,
}

/// Thresholds and colours used by [`rasterize_with_policy`].
///
/// ```rust,ignore
/// let policy = RasterPolicy::default()
///     .with_thresholds(3., 0., 8.)
///     .with_off_track_color([20, 90, 20]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterPolicy {
    /// Surface ends at `surface_margin - half_width`. Default: `2`.
    pub surface_margin: Value,
    /// Boundary ends here. Default: `0`.
    pub boundary_limit: Value,
    /// Shoulder ends here; everything further out is off-track. Default: `5`.
    pub shoulder_limit: Value,
    pub surface_color: [u8; 3],
    pub boundary_color: [u8; 3],
    pub shoulder_color: [u8; 3],
    pub off_track_color: [u8; 3],
}

impl Default for RasterPolicy {
    fn default() -> Self {
        Self {
            surface_margin: 2.,
            boundary_limit: 0.,
            shoulder_limit: 5.,
            surface_color: [230, 230, 230],
            boundary_color: [10, 10, 15],
            shoulder_color: [200, 200, 0],
            off_track_color: [0, 150, 0],
        }
    }
}

impl RasterPolicy {
    pub fn with_thresholds(
        mut self,
        surface_margin: Value,
        boundary_limit: Value,
        shoulder_limit: Value,
    ) -> Self {
        self.surface_margin = surface_margin;
        self.boundary_limit = boundary_limit;
        self.shoulder_limit = shoulder_limit;
        self
    }

    pub fn with_surface_color(mut self, color: [u8; 3]) -> Self {
        self.surface_color = color;
        self
    }

    pub fn with_boundary_color(mut self, color: [u8; 3]) -> Self {
        self.boundary_color = color;
        self
    }

    pub fn with_shoulder_color(mut self, color: [u8; 3]) -> Self {
        self.shoulder_color = color;
        self
    }

    pub fn with_off_track_color(mut self, color: [u8; 3]) -> Self {
        self.off_track_color = color;
        self
    }

    /// Buckets a signed distance. NaN lands in [`PixelClass::OffTrack`].
    #[inline]
    pub fn classify(&self, d: Value, half_width: Value) -> PixelClass {
        if d < self.surface_margin - half_width {
            PixelClass::Surface
        } else if d < self.boundary_limit {
            PixelClass::Boundary
        } else if d < self.shoulder_limit {
            PixelClass::Shoulder
        } else {
            PixelClass::OffTrack
        }
    }

    #[inline]
    pub fn color(&self, class: PixelClass) -> [u8; 3] {
        match class {
            PixelClass::Surface => self.surface_color,
            PixelClass::Boundary => self.boundary_color,
            PixelClass::Shoulder => self.shoulder_color,
            PixelClass::OffTrack => self.off_track_color,
        }
    }
}

/// A dense `width × height × 3` RGB grid, indexed `[x, y, channel]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackImage {
    pixels: Array3<u8>,
}

impl TrackImage {
    /// Wraps an existing grid. Returns `None` unless the last axis has 3 channels.
    pub fn from_array(pixels: Array3<u8>) -> Option<Self> {
        (pixels.dim().2 == 3).then_some(Self { pixels })
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().1
    }

    /// `true` if the grid is `width × height × 3`.
    pub fn has_shape(&self, width: usize, height: usize) -> bool {
        self.pixels.dim() == (width, height, 3)
    }

    /// RGB colour at `(x, y)`.
    ///
    /// # Panics
    /// Panics if `(x, y)` is outside the image.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        [
            self.pixels[[x, y, 0]],
            self.pixels[[x, y, 1]],
            self.pixels[[x, y, 2]],
        ]
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    pub fn into_array(self) -> Array3<u8> {
        self.pixels
    }

    /// Row-major (`y` outer, `x` inner) RGBA bytes with opaque alpha, the
    /// layout GPU textures expect.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let (width, height, _) = self.pixels.dim();
        let mut data = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&self.pixel(x, y));
                data.push(u8::MAX);
            }
        }
        data
    }
}

/// Rasterizes with [`RasterPolicy::default`].
pub fn rasterize(field: &Field, width: usize, height: usize, half_width: Value) -> TrackImage {
    rasterize_with_policy(field, width, height, half_width, &RasterPolicy::default())
}

pub fn rasterize_with_policy(
    field: &Field,
    width: usize,
    height: usize,
    half_width: Value,
    policy: &RasterPolicy,
) -> TrackImage {
    let never = AtomicBool::new(false);
    let pixels = fill_columns(field, width, height, half_width, policy, &never);
    TrackImage { pixels }
}

/// Like [`rasterize_with_policy`], but gives up once `cancel` is set.
///
/// Each column checks the flag before it starts, so setting it stops the
/// remaining work promptly. Returns `None` if the flag was seen set.
pub fn rasterize_until(
    field: &Field,
    width: usize,
    height: usize,
    half_width: Value,
    policy: &RasterPolicy,
    cancel: &AtomicBool,
) -> Option<TrackImage> {
    let pixels = fill_columns(field, width, height, half_width, policy, cancel);
    if cancel.load(Ordering::Relaxed) {
        debug!(width, height, "rasterization cancelled");
        return None;
    }
    Some(TrackImage { pixels })
}

/// One field query per pixel, parallelised over X columns.
fn fill_columns(
    field: &Field,
    width: usize,
    height: usize,
    half_width: Value,
    policy: &RasterPolicy,
    cancel: &AtomicBool,
) -> Array3<u8> {
    let started = Instant::now();
    let mut pixels = Array3::<u8>::zeros((width, height, 3));

    pixels
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(x, mut column)| {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            for (y, mut rgb) in column.axis_iter_mut(Axis(0)).enumerate() {
                let d = field.query(&Point::new(x as Value, y as Value));
                let color = policy.color(policy.classify(d, half_width));
                rgb.iter_mut().zip(color).for_each(|(dst, src)| *dst = src);
            }
        });

    debug!(
        width,
        height,
        nodes = field.node_count(),
        "rasterized track in {:?}",
        started.elapsed()
    );
    pixels
}
