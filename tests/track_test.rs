use bevy_sdf_track::{
    error::TrackError,
    primitives::line_segment_distance,
    raster::{PixelClass, RasterPolicy},
    segment::Segment,
    track::TrackBuilder,
    types::{Point, Ray, Value, Vector},
    march::MarchConfig,
};

fn single_line() -> Vec<Segment> {
    vec![Segment::line(Point::new(10., 50.), Point::new(90., 50.))]
}

#[test]
fn single_line_bands() {
    let policy = RasterPolicy::default();
    let builder = TrackBuilder::new(single_line(), 100, 100, 10.).unwrap();
    let image = builder.image();
    assert_eq!((image.width(), image.height()), (100, 100));

    // Distance from the centre line along x = 50.
    let expect = [
        (50, PixelClass::Surface),
        (51, PixelClass::Surface),
        (52, PixelClass::Boundary),
        (58, PixelClass::Boundary),
        (59, PixelClass::Boundary),
        (60, PixelClass::Shoulder),
        (64, PixelClass::Shoulder),
        (65, PixelClass::OffTrack),
        (80, PixelClass::OffTrack),
        (41, PixelClass::Boundary),
        (35, PixelClass::OffTrack),
    ];
    for (y, class) in expect {
        assert_eq!(image.pixel(50, y), policy.color(class), "y = {y}");
    }
}

#[test]
fn single_line_whole_grid_matches_band_formula() {
    let policy = RasterPolicy::default();
    let builder = TrackBuilder::new(single_line(), 100, 100, 10.).unwrap();
    let (a, b) = (Point::new(10., 50.), Point::new(90., 50.));
    for x in 0..100 {
        for y in 0..100 {
            let p = Point::new(x as Value, y as Value);
            let d = line_segment_distance(&p, &a, &b).abs() - 10.;
            let expected = policy.color(policy.classify(d, 10.));
            assert_eq!(builder.image().pixel(x, y), expected, "({x}, {y})");
        }
    }
}

#[test]
fn rebuilding_is_deterministic() {
    let segments = vec![
        Segment::line(Point::new(20., 30.), Point::new(120., 30.)),
        Segment::bezier(
            Point::new(120., 30.),
            Point::new(180., 30.),
            Point::new(180., 90.),
        ),
        Segment::bezier(
            Point::new(180., 90.),
            Point::new(180., 150.),
            Point::new(20., 30.),
        ),
    ];
    let first = TrackBuilder::new(segments.clone(), 200, 160, 12.).unwrap();
    let second = TrackBuilder::new(segments, 200, 160, 12.).unwrap();
    assert_eq!(first.image(), second.image());
    assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
}

#[test]
fn segment_order_does_not_change_the_image() {
    let mut segments = vec![
        Segment::line(Point::new(10., 10.), Point::new(70., 10.)),
        Segment::line(Point::new(70., 10.), Point::new(70., 70.)),
        Segment::bezier(
            Point::new(70., 70.),
            Point::new(10., 70.),
            Point::new(10., 10.),
        ),
    ];
    let forward = TrackBuilder::new(segments.clone(), 80, 80, 5.).unwrap();
    segments.reverse();
    let reversed = TrackBuilder::new(segments, 80, 80, 5.).unwrap();
    assert_eq!(forward.image(), reversed.image());
}

#[test]
fn custom_policy_is_used_for_image_and_queries() {
    let policy = RasterPolicy::default()
        .with_thresholds(4., 0., 2.)
        .with_surface_color([1, 1, 1]);
    let builder = TrackBuilder::with_policy(single_line(), 100, 100, 10., policy).unwrap();
    assert_eq!(builder.image().pixel(50, 53), [1, 1, 1]);
    let track = builder.make_track();
    assert_eq!(track.classify(&Point::new(50., 53.)), PixelClass::Surface);
    assert_eq!(track.classify(&Point::new(50., 61.)), PixelClass::Shoulder);
    assert_eq!(track.classify(&Point::new(50., 62.)), PixelClass::OffTrack);
}

#[test]
fn sensor_rays_hit_both_edges() {
    let track = TrackBuilder::new(single_line(), 100, 100, 10.)
        .unwrap()
        .make_track();
    let config = MarchConfig::default();
    let rays = [
        Ray::new(Point::new(50., 50.), Vector::new(0., 1.)),
        Ray::new(Point::new(50., 50.), Vector::new(0., -1.)),
        Ray::new(Point::new(50., 50.), Vector::zeros()),
    ];
    let hits = track.cast_rays(&rays, &config);
    assert!((hits[0].distance - 10.).abs() < 1e-5);
    assert!((hits[1].distance - 10.).abs() < 1e-5);
    assert!(hits[2].missed(&config));
    assert_eq!(hits[2].hit_point, Point::new(50., 50.));
}

#[test]
fn save_and_load_round_trip_through_a_file() {
    let builder = TrackBuilder::new(single_line(), 40, 30, 6.).unwrap();
    let path = std::env::temp_dir().join(format!("sdf-track-{}.strk", std::process::id()));
    builder.save(&path).unwrap();
    let loaded = TrackBuilder::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, builder);
    assert_eq!(loaded.make_track().display(), builder.image());
}

#[test]
fn loading_garbage_is_an_error() {
    let path = std::env::temp_dir().join(format!("sdf-track-bad-{}.strk", std::process::id()));
    std::fs::write(&path, b"definitely not a track").unwrap();
    let result = TrackBuilder::load(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(TrackError::InvalidMagic)));

    let missing = std::env::temp_dir().join("sdf-track-does-not-exist.strk");
    assert!(matches!(TrackBuilder::load(missing), Err(TrackError::Io(_))));
}
