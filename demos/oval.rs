use bevy::prelude::*;
use bevy_sdf_track::{
    Segment, TrackPlugin,
    march::MarchConfig,
    plugin::{ActiveTrack, TrackLayout},
    types::{Point, Ray, Vector},
};

const WIDTH: usize = 1080;
const HEIGHT: usize = 720;

fn main() {
    App::new()
        .add_plugins((DefaultPlugins, TrackPlugin::default()))
        .add_systems(Startup, setup)
        .add_systems(Update, draw_sensors)
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera2d);

    let p = |x: f64, y: f64| Point::new(x, y);
    let segments = vec![
        Segment::line(p(240., 120.), p(840., 120.)),
        Segment::bezier(p(840., 120.), p(1020., 120.), p(1020., 360.)),
        Segment::bezier(p(1020., 360.), p(1020., 600.), p(840., 600.)),
        Segment::line(p(840., 600.), p(240., 600.)),
        Segment::bezier(p(240., 600.), p(60., 600.), p(60., 360.)),
        Segment::bezier(p(60., 360.), p(60., 120.), p(240., 120.)),
    ];

    commands.spawn(TrackLayout::new(segments, WIDTH, HEIGHT, 30.));
}

/// Fans sensor rays out from the start point and draws them.
fn draw_sensors(mut gizmos: Gizmos, tracks: Query<&ActiveTrack>) {
    // Image pixel (x, y) sits at world (x - W/2, H/2 - y) for a centred sprite.
    let to_world = |p: Point| {
        Vec2::new(
            p.x as f32 - WIDTH as f32 / 2.,
            HEIGHT as f32 / 2. - p.y as f32,
        )
    };

    for ActiveTrack(track) in tracks.iter() {
        let origin = track.start();
        let rays: Vec<Ray> = (0..12)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::TAU / 12.;
                Ray::new(origin, Vector::new(angle.cos(), angle.sin()))
            })
            .collect();

        for hit in track.cast_rays(&rays, &MarchConfig::default().with_max_distance(400.)) {
            gizmos.line_2d(to_world(origin), to_world(hit.hit_point), Color::BLACK);
        }
    }
}
