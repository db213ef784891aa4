//! Sphere tracing: walk a ray through a [`Field`] in steps of the field's own
//! distance value until it lands on the zero-level surface.
//!
//! ```text
//!  origin ●────────●─────●──●─●  surface
//!         |<- d0 ->|<-d1->|
//! ```
//!
//! Each step is safe because `|field(p)|` is a lower bound on how far the ray
//! can travel before crossing the surface. The loop always ends: the walk
//! stops at `max_distance`, and it also stops as soon as a step no longer
//! moves the travelled distance in floating point (a zero or negative
//! `epsilon`, or a ray creeping toward a tangent point).

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::{
    field::Field,
    types::{Point, Ray, Value, Vector},
    utils::safe_normalize,
};

pub const DEFAULT_EPSILON: Value = 1e-5;
pub const DEFAULT_MAX_DISTANCE: Value = 1000.;

/// Tolerance and distance budget for [`march_with_config`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarchConfig {
    /// A sample with `|d| <= epsilon` counts as on the surface. Default: `1e-5`.
    pub epsilon: Value,
    /// The walk never goes further than this. Default: `1000`.
    pub max_distance: Value,
}

impl Default for MarchConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

impl MarchConfig {
    pub fn with_epsilon(mut self, epsilon: Value) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_distance(mut self, max_distance: Value) -> Self {
        self.max_distance = max_distance;
        self
    }
}

/// Outcome of one sphere-tracing run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayMarchResult {
    /// Distance travelled along the normalised ray, at most `max_distance`.
    pub distance: Value,
    /// `origin + distance * direction`.
    pub hit_point: Point,
}

impl RayMarchResult {
    /// `true` when the walk used up the whole budget without reaching the surface.
    pub fn missed(&self, config: &MarchConfig) -> bool {
        self.distance >= config.max_distance
    }
}

/// Marches with [`MarchConfig::default`].
pub fn march(field: &Field, origin: Point, direction: Vector) -> RayMarchResult {
    march_with_config(field, origin, direction, &MarchConfig::default())
}

/// Sphere-traces `field` from `origin` along `direction`.
///
/// A zero `direction` returns `max_distance` with the origin as hit point.
pub fn march_with_config(
    field: &Field,
    origin: Point,
    direction: Vector,
    config: &MarchConfig,
) -> RayMarchResult {
    let Some(direction) = safe_normalize(&direction) else {
        return RayMarchResult {
            distance: config.max_distance,
            hit_point: origin,
        };
    };

    let mut distance: Value = 0.;
    let mut sample = field.query(&origin).abs();
    while sample > config.epsilon && distance < config.max_distance {
        let next = distance + sample;
        if next == distance {
            break;
        }
        distance = next;
        sample = field.query(&(origin + direction * distance)).abs();
    }

    let distance = distance.min(config.max_distance);
    RayMarchResult {
        distance,
        hit_point: origin + direction * distance,
    }
}

/// Marches many independent rays in parallel. Results keep the order of `rays`.
pub fn march_batch(field: &Field, rays: &[Ray], config: &MarchConfig) -> Vec<RayMarchResult> {
    rays.par_iter()
        .map(|ray| march_with_config(field, ray.origin, ray.direction, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Field {
        Field::circle(50.).translate(200., 200.)
    }

    #[test]
    fn zero_direction_returns_origin() {
        let origin = Point::new(12., 34.);
        let result = march(&target(), origin, Vector::zeros());
        assert_eq!(result.distance, DEFAULT_MAX_DISTANCE);
        assert_eq!(result.hit_point, origin);
    }

    #[test]
    fn hits_circle_head_on() {
        let origin = Point::new(200., 100.);
        let result = march(&target(), origin, Point::new(200., 200.) - origin);
        assert!((result.distance - 50.).abs() < DEFAULT_EPSILON);
        assert!((result.hit_point - Point::new(200., 150.)).norm() < DEFAULT_EPSILON);
        assert!(!result.missed(&MarchConfig::default()));
    }

    #[test]
    fn identity_field_terminates_at_budget() {
        let config = MarchConfig::default().with_max_distance(250.);
        let result = march_with_config(
            &Field::identity(),
            Point::origin(),
            Vector::new(1., 1.),
            &config,
        );
        assert_eq!(result.distance, 250.);
        assert!(result.hit_point.x.is_finite());
        assert!(result.missed(&config));
    }

    #[test]
    fn ray_pointing_away_misses() {
        let origin = Point::new(200., 100.);
        let result = march(&target(), origin, Vector::new(0., -1.));
        assert_eq!(result.distance, DEFAULT_MAX_DISTANCE);
        assert!(result.missed(&MarchConfig::default()));
    }

    #[test]
    fn negative_epsilon_stops_on_the_surface() {
        let config = MarchConfig::default().with_epsilon(-1.);
        let origin = Point::new(200., 100.);
        let result = march_with_config(&target(), origin, Vector::new(0., 1.), &config);
        assert_eq!(result.distance, 50.);
        assert_eq!(result.hit_point, Point::new(200., 150.));
    }

    #[test]
    fn zero_epsilon_tangent_ray_terminates() {
        // Grazes the bottom of a small circle at (200, 0). The steps shrink
        // toward zero and never reach it.
        let radius = 1. / 1024.;
        let field = Field::circle(radius).translate(200., radius);
        let config = MarchConfig::default().with_epsilon(0.);
        let result = march_with_config(&field, Point::origin(), Vector::new(1., 0.), &config);
        assert!(result.distance < DEFAULT_MAX_DISTANCE);
        assert!((result.distance - 200.).abs() < 1e-6, "{result:?}");
    }

    #[test]
    fn far_tangent_with_default_epsilon_terminates() {
        // Near 1e12 the float spacing is larger than the default epsilon, so
        // the creeping steps stop moving before they get below it.
        let config = MarchConfig::default().with_max_distance(1e13);
        let field = Field::circle(0.5).translate(1e12, 0.5);
        let result = march_with_config(&field, Point::origin(), Vector::new(1., 0.), &config);
        assert!(result.distance < 1e13);
        assert!((result.distance - 1e12).abs() < 1., "{result:?}");
    }

    #[test]
    fn batch_matches_single_rays() {
        let field = target();
        let config = MarchConfig::default();
        let rays: Vec<Ray> = (0..16)
            .map(|i| {
                let angle = i as Value * std::f64::consts::PI / 8.;
                Ray::new(Point::new(200., 200.), Vector::new(angle.cos(), angle.sin()))
            })
            .collect();
        let batch = march_batch(&field, &rays, &config);
        for (ray, result) in rays.iter().zip(&batch) {
            assert_eq!(
                *result,
                march_with_config(&field, ray.origin, ray.direction, &config)
            );
            // From the centre every direction reaches the rim after 50 units.
            assert!((result.distance - 50.).abs() < 1e-4);
        }
    }
}
