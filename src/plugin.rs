use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use bevy::{
    asset::RenderAssetUsages,
    prelude::*,
    render::render_resource::{Extent3d, TextureDimension, TextureFormat},
    tasks::{AsyncComputeTaskPool, Task, block_on, futures_lite::future},
};
use tracing::{info, warn};

use crate::{
    error::Result,
    raster::{RasterPolicy, TrackImage},
    segment::Segment,
    track::{Track, TrackBuilder},
    types::Value,
};

/// System sets for the track pipeline.
///
/// Use these to order your own systems relative to track generation:
///
/// ```rust,ignore
/// // Read the finished track before its image is uploaded:
/// app.add_systems(Update, place_cars.after(TrackSet::Generate)
///                                   .before(TrackSet::Upload));
/// ```
///
/// ```text
/// TrackSet::Spawn  →  [async compute]  →  TrackSet::Generate  →  [your systems]  →  TrackSet::Upload
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackSet {
    /// Spawns an async rasterization task for each queued layout.
    Spawn,
    /// Polls async tasks and inserts [`GeneratedTrack`] on completion.
    Generate,
    /// Uploads the image into a [`Sprite`] and attaches [`ActiveTrack`].
    Upload,
}

/// The authored description of a track. Adding or changing this component
/// (re)generates the track on the entity.
#[derive(Component, Debug, Clone)]
pub struct TrackLayout {
    pub segments: Vec<Segment>,
    /// Image width in pixels (world units along X).
    pub width: usize,
    /// Image height in pixels (world units along Y).
    pub height: usize,
    pub half_width: Value,
    pub policy: RasterPolicy,
}

impl TrackLayout {
    pub fn new(segments: Vec<Segment>, width: usize, height: usize, half_width: Value) -> Self {
        Self {
            segments,
            width,
            height,
            half_width,
            policy: RasterPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RasterPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Marker component added to [`TrackLayout`] entities that are waiting to be processed.
///
/// Removed automatically once the track's image has been uploaded.
#[derive(Component)]
pub struct QueuedTrack;

/// Holds the in-flight rasterization task for a [`TrackLayout`].
///
/// Dropping it (entity despawned or layout changed) sets the cancel flag so the
/// rasterizer stops picking up new columns.
#[derive(Component)]
pub struct RasterTask {
    task: Task<Result<TrackBuilder>>,
    cancel: Arc<AtomicBool>,
}

impl Drop for RasterTask {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// A finished [`TrackBuilder`], waiting for [`TrackSet::Upload`].
#[derive(Component)]
pub struct GeneratedTrack(pub TrackBuilder);

/// The live track for ray and distance queries, attached after upload.
#[derive(Component, Debug, Clone)]
pub struct ActiveTrack(pub Track);

/// Runtime configuration for the track pipeline.
///
/// Inserted as a resource by [`TrackPlugin`]. Modify it at any time to change behaviour.
#[derive(Resource)]
pub struct TrackConfig {
    /// Maximum number of rasterization tasks spawned per frame. Default: `2`.
    pub max_tasks_per_frame: usize,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: 2,
        }
    }
}

/// Bevy plugin that rasterizes [`TrackLayout`]s off the main thread.
///
/// ```text
/// TrackLayout added / changed
///   → QueuedTrack inserted          (queue_changed_layouts)
///   → RasterTask spawned            (TrackSet::Spawn)
///   → [async compute runs]
///   → GeneratedTrack inserted       (TrackSet::Generate, once task completes)
///   → Sprite + ActiveTrack inserted (TrackSet::Upload)
///   → QueuedTrack + GeneratedTrack removed
/// ```
pub struct TrackPlugin {
    /// Initial value for [`TrackConfig::max_tasks_per_frame`].
    pub max_tasks_per_frame: usize,
}

impl Default for TrackPlugin {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: TrackConfig::default().max_tasks_per_frame,
        }
    }
}

impl Plugin for TrackPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(TrackConfig {
            max_tasks_per_frame: self.max_tasks_per_frame,
        });

        #[cfg(feature = "auto_queue")]
        app.configure_sets(
            Update,
            (TrackSet::Spawn, TrackSet::Generate, TrackSet::Upload).chain(),
        )
        .add_systems(
            Update,
            (
                queue_changed_layouts.before(TrackSet::Spawn),
                spawn_raster_tasks.in_set(TrackSet::Spawn),
                poll_raster_tasks.in_set(TrackSet::Generate),
                upload_track.in_set(TrackSet::Upload),
            ),
        );
    }
}

/// Queues every added or changed [`TrackLayout`], dropping any stale task or result.
pub fn queue_changed_layouts(
    mut commands: Commands,
    query: Query<Entity, Changed<TrackLayout>>,
) {
    for entity in query.iter() {
        commands
            .entity(entity)
            .remove::<(RasterTask, GeneratedTrack)>()
            .insert(QueuedTrack);
    }
}

/// Spawns async tasks for [`QueuedTrack`]s, up to [`TrackConfig::max_tasks_per_frame`] per frame.
pub fn spawn_raster_tasks(
    mut commands: Commands,
    config: Res<TrackConfig>,
    query: Query<
        (Entity, &TrackLayout),
        (With<QueuedTrack>, Without<RasterTask>, Without<GeneratedTrack>),
    >,
) {
    let task_pool = AsyncComputeTaskPool::get();

    for (entity, layout) in query.iter().take(config.max_tasks_per_frame) {
        let layout = layout.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let task = task_pool.spawn(async move {
            TrackBuilder::build(
                layout.segments,
                layout.width,
                layout.height,
                layout.half_width,
                layout.policy,
                &flag,
            )
        });

        commands.entity(entity).insert(RasterTask { task, cancel });
    }
}

/// Polls in-flight [`RasterTask`]s each frame and inserts [`GeneratedTrack`] on completion.
///
/// Non-blocking: tasks that haven't finished are skipped and retried next frame.
/// A failed build is logged and the entity is dequeued.
pub fn poll_raster_tasks(mut commands: Commands, mut query: Query<(Entity, &mut RasterTask)>) {
    for (entity, mut raster_task) in query.iter_mut() {
        let Some(result) = block_on(future::poll_once(&mut raster_task.task)) else {
            continue;
        };
        let mut entity_commands = commands.entity(entity);
        entity_commands.remove::<RasterTask>();
        match result {
            Ok(builder) => {
                entity_commands.insert(GeneratedTrack(builder));
            }
            Err(err) => {
                warn!(?entity, "track generation failed: {err}");
                entity_commands.remove::<QueuedTrack>();
            }
        }
    }
}

/// Uploads a [`GeneratedTrack`] into an [`Image`] shown by a [`Sprite`], attaches
/// [`ActiveTrack`], then removes [`GeneratedTrack`] and [`QueuedTrack`].
pub fn upload_track(
    mut commands: Commands,
    query: Query<(Entity, &GeneratedTrack), With<QueuedTrack>>,
    mut images: ResMut<Assets<Image>>,
) {
    for (entity, generated) in query.iter() {
        let builder = &generated.0;
        let handle = images.add(track_texture(builder.image()));

        info!(
            ?entity,
            width = builder.width(),
            height = builder.height(),
            "uploaded track image"
        );

        commands
            .entity(entity)
            .insert((Sprite::from_image(handle), ActiveTrack(builder.make_track())))
            .remove::<(GeneratedTrack, QueuedTrack)>();
    }
}

/// Converts a [`TrackImage`] into an sRGB texture, row 0 at the top.
pub fn track_texture(image: &TrackImage) -> Image {
    Image::new(
        Extent3d {
            width: image.width() as u32,
            height: image.height() as u32,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        image.to_rgba8(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}
