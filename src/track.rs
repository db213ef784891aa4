use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{Result, TrackError},
    field::Field,
    march::{MarchConfig, RayMarchResult, march_batch, march_with_config},
    raster::{PixelClass, RasterPolicy, TrackImage, rasterize_until},
    segment::Segment,
    types::{Point, Ray, Value, Vector},
};

/// A gate the car has to cross, from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub a: Point,
    pub b: Point,
}

/// The authored form of a track: its segments, raster settings and the
/// image rasterized from them.
///
/// The image is produced once in the constructor and never changes. Building
/// twice from the same inputs gives the same image byte for byte.
///
/// Deserializing runs the same checks as the constructor, so a decoded builder
/// always has at least one segment and an image of the stated size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrackBuilderParts")]
pub struct TrackBuilder {
    segments: Vec<Segment>,
    width: usize,
    height: usize,
    half_width: Value,
    policy: RasterPolicy,
    image: TrackImage,
}

/// Unchecked mirror of [`TrackBuilder`]'s fields, as they come off the wire.
#[derive(Deserialize)]
struct TrackBuilderParts {
    segments: Vec<Segment>,
    width: usize,
    height: usize,
    half_width: Value,
    policy: RasterPolicy,
    image: TrackImage,
}

impl TryFrom<TrackBuilderParts> for TrackBuilder {
    type Error = TrackError;

    fn try_from(parts: TrackBuilderParts) -> Result<Self> {
        let builder = Self {
            segments: parts.segments,
            width: parts.width,
            height: parts.height,
            half_width: parts.half_width,
            policy: parts.policy,
            image: parts.image,
        };
        builder.validate()?;
        Ok(builder)
    }
}

impl TrackBuilder {
    /// Builds with [`RasterPolicy::default`].
    pub fn new(
        segments: Vec<Segment>,
        width: usize,
        height: usize,
        half_width: Value,
    ) -> Result<Self> {
        Self::with_policy(segments, width, height, half_width, RasterPolicy::default())
    }

    pub fn with_policy(
        segments: Vec<Segment>,
        width: usize,
        height: usize,
        half_width: Value,
        policy: RasterPolicy,
    ) -> Result<Self> {
        Self::build(
            segments,
            width,
            height,
            half_width,
            policy,
            &AtomicBool::new(false),
        )
    }

    /// Validates the inputs, composes the field and rasterizes it.
    ///
    /// Returns [`TrackError::Cancelled`] if `cancel` is set before the image is done.
    pub fn build(
        segments: Vec<Segment>,
        width: usize,
        height: usize,
        half_width: Value,
        policy: RasterPolicy,
        cancel: &AtomicBool,
    ) -> Result<Self> {
        check_inputs(&segments, width, height, half_width)?;

        let field = compose(&segments, half_width);
        let image = rasterize_until(&field, width, height, half_width, &policy, cancel)
            .ok_or(TrackError::Cancelled)?;

        info!(
            segments = segments.len(),
            width, height, half_width, "built track"
        );

        Ok(Self {
            segments,
            width,
            height,
            half_width,
            policy,
            image,
        })
    }

    /// Re-checks everything the constructor guarantees.
    fn validate(&self) -> Result<()> {
        check_inputs(&self.segments, self.width, self.height, self.half_width)?;
        if !self.image.has_shape(self.width, self.height) {
            return Err(TrackError::ImageMismatch);
        }
        Ok(())
    }

    /// The hollowed union of every segment's field.
    pub fn field(&self) -> Field {
        compose(&self.segments, self.half_width)
    }

    /// Start point of the first segment.
    pub fn start(&self) -> Point {
        self.segments[0].start_point()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn half_width(&self) -> Value {
        self.half_width
    }

    pub fn policy(&self) -> &RasterPolicy {
        &self.policy
    }

    pub fn image(&self) -> &TrackImage {
        &self.image
    }

    pub fn make_track(&self) -> Track {
        Track {
            field: self.field(),
            start: self.start(),
            checkpoints: Vec::new(),
            image: self.image.clone(),
            half_width: self.half_width,
            policy: self.policy,
        }
    }
}

/// A playable track: its field for live queries plus the pre-rendered image.
///
/// Serializable for export only. Persist the [`TrackBuilder`] and call
/// [`TrackBuilder::make_track`] to get a track back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    field: Field,
    start: Point,
    checkpoints: Vec<Checkpoint>,
    image: TrackImage,
    half_width: Value,
    policy: RasterPolicy,
}

impl Track {
    /// The image the render layer should draw.
    pub fn display(&self) -> &TrackImage {
        &self.image
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Signed distance from `p` to the edge of the track corridor.
    pub fn distance(&self, p: &Point) -> Value {
        self.field.query(p)
    }

    /// The band `p` falls into, using the policy the image was drawn with.
    pub fn classify(&self, p: &Point) -> PixelClass {
        self.policy.classify(self.distance(p), self.half_width)
    }

    /// First crossing of a track edge along the ray, with default settings.
    pub fn cast_ray(&self, origin: Point, direction: Vector) -> RayMarchResult {
        self.cast_ray_with_config(origin, direction, &MarchConfig::default())
    }

    pub fn cast_ray_with_config(
        &self,
        origin: Point,
        direction: Vector,
        config: &MarchConfig,
    ) -> RayMarchResult {
        march_with_config(&self.field, origin, direction, config)
    }

    /// Casts independent rays in parallel, e.g. one car's distance sensors.
    pub fn cast_rays(&self, rays: &[Ray], config: &MarchConfig) -> Vec<RayMarchResult> {
        march_batch(&self.field, rays, config)
    }
}

fn compose(segments: &[Segment], half_width: Value) -> Field {
    segments
        .iter()
        .map(Segment::to_field)
        .sum::<Field>()
        .annular(half_width)
}

fn check_inputs(segments: &[Segment], width: usize, height: usize, half_width: Value) -> Result<()> {
    if segments.is_empty() {
        return Err(TrackError::NoSegments);
    }
    if width == 0 || height == 0 {
        return Err(TrackError::InvalidDimensions { width, height });
    }
    if !half_width.is_finite() || half_width < 0. {
        return Err(TrackError::InvalidHalfWidth(half_width));
    }
    if let Some(index) = segments.iter().position(|s| !s.is_finite()) {
        return Err(TrackError::NonFiniteSegment(index));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_loop() -> Vec<Segment> {
        vec![
            Segment::line(Point::new(20., 20.), Point::new(60., 20.)),
            Segment::bezier(
                Point::new(60., 20.),
                Point::new(80., 20.),
                Point::new(80., 40.),
            ),
            Segment::line(Point::new(80., 40.), Point::new(80., 60.)),
            Segment::line(Point::new(80., 60.), Point::new(20., 60.)),
            Segment::line(Point::new(20., 60.), Point::new(20., 20.)),
        ]
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            TrackBuilder::new(vec![], 10, 10, 5.),
            Err(TrackError::NoSegments)
        ));
        assert!(matches!(
            TrackBuilder::new(square_loop(), 0, 10, 5.),
            Err(TrackError::InvalidDimensions { width: 0, height: 10 })
        ));
        assert!(matches!(
            TrackBuilder::new(square_loop(), 10, 10, -1.),
            Err(TrackError::InvalidHalfWidth(_))
        ));
        let mut segments = square_loop();
        segments.push(Segment::line(Point::new(0., 0.), Point::new(f64::INFINITY, 0.)));
        assert!(matches!(
            TrackBuilder::new(segments, 10, 10, 5.),
            Err(TrackError::NonFiniteSegment(5))
        ));
    }

    #[test]
    fn decoding_checks_segments_and_image() {
        let builder = TrackBuilder::new(square_loop(), 100, 80, 6.).unwrap();
        let encode = |segments: Vec<Segment>, width: usize| {
            bincode::serialize(&(
                segments,
                width,
                builder.height(),
                builder.half_width(),
                *builder.policy(),
                builder.image().clone(),
            ))
            .unwrap()
        };

        let decoded: TrackBuilder =
            bincode::deserialize(&encode(square_loop(), 100)).unwrap();
        assert_eq!(decoded, builder);

        let empty = bincode::deserialize::<TrackBuilder>(&encode(vec![], 100)).unwrap_err();
        assert!(empty.to_string().contains("NoSegments"), "{empty}");

        let resized = bincode::deserialize::<TrackBuilder>(&encode(square_loop(), 50)).unwrap_err();
        assert!(resized.to_string().contains("ImageMismatch"), "{resized}");
    }

    #[test]
    fn start_is_first_segment_start() {
        let builder = TrackBuilder::new(square_loop(), 100, 80, 6.).unwrap();
        assert_eq!(builder.start(), Point::new(20., 20.));
        let track = builder.make_track();
        assert_eq!(track.start(), Point::new(20., 20.));
        assert!(track.checkpoints().is_empty());
        assert_eq!(track.display(), builder.image());
    }

    #[test]
    fn cancelled_build_is_an_error() {
        let cancel = AtomicBool::new(true);
        let result = TrackBuilder::build(
            square_loop(),
            100,
            80,
            6.,
            RasterPolicy::default(),
            &cancel,
        );
        assert!(matches!(result, Err(TrackError::Cancelled)));
    }

    #[test]
    fn centre_line_is_surface_and_far_field_is_off_track() {
        let track = TrackBuilder::new(square_loop(), 100, 80, 6.)
            .unwrap()
            .make_track();
        assert_eq!(track.classify(&Point::new(40., 20.)), PixelClass::Surface);
        assert_eq!(track.classify(&Point::new(40., 40.)), PixelClass::OffTrack);
        assert_eq!(track.classify(&Point::new(40., 25.)), PixelClass::Boundary);
    }

    #[test]
    fn ray_from_centre_line_hits_the_edge() {
        let track = TrackBuilder::new(square_loop(), 100, 80, 6.)
            .unwrap()
            .make_track();
        // Centre line at y = 20, corridor edge 6 units either side.
        let hit = track.cast_ray(Point::new(40., 20.), Vector::new(0., 1.));
        assert!((hit.distance - 6.).abs() < 1e-4, "{hit:?}");
    }
}
