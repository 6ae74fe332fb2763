use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    prelude::*,
    tasks::{AsyncComputeTaskPool, Task, block_on, futures_lite::future},
};

use crate::{
    extract::extract,
    mesh::{GeneratedMesh, Topology},
    settings::{DEFAULT_MAX_RESOLUTION, PlotSettings},
};

/// System sets for the plotting pipeline.
///
/// Use these to order your own systems relative to mesh generation:
///
/// ```rust,ignore
/// // Inspect or post-process geometry before it reaches the renderer:
/// app.add_systems(Update, measure_plot.after(PlotSet::Generate).before(PlotSet::Upload));
/// ```
///
/// ```text
/// PlotSet::Queue  →  PlotSet::Spawn  →  [async compute]  →  PlotSet::Generate  →  [your systems]  →  PlotSet::Upload
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlotSet {
    /// Marks changed [`Plot`]s with [`QueuedPlot`] (feature `auto_queue`).
    Queue,
    /// Spawns an async extraction task for each queued plot.
    Spawn,
    /// Polls async tasks and inserts [`GeneratedMesh`] on completion.
    Generate,
    /// Uploads [`GeneratedMesh`] data into a Bevy [`Mesh3d`] and removes [`GeneratedMesh`].
    Upload,
}

/// An implicit formula to draw, with the settings to extract it with.
///
/// ```rust,ignore
/// commands.spawn((
///     Plot::new("x^2 + y^2 + z^2 = 25"),
///     MeshMaterial3d(materials.add(Color::WHITE)),
/// ));
/// ```
#[derive(Component, Debug, Clone, PartialEq)]
#[require(Transform)]
pub struct Plot {
    pub formula: String,
    pub settings: PlotSettings,
}

impl Plot {
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            settings: PlotSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PlotSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Marker for [`Plot`] entities waiting for an extraction task.
///
/// Inserted automatically whenever a [`Plot`] changes (feature `auto_queue`), or by hand.
#[derive(Component)]
pub struct QueuedPlot;

/// Number of extraction tasks started for a [`Plot`] entity.
///
/// Only a result from the latest started task is ever applied.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlotGeneration(pub u64);

/// The in-flight extraction task of a [`Plot`].
///
/// Replacing this component drops the previous task, which cancels it.
#[derive(Component)]
pub struct ComputeTask {
    generation: u64,
    task: Task<GeneratedMesh>,
}

/// Runtime configuration for the plotting pipeline.
///
/// Inserted as a resource by [`PlotPlugin`]. Modify it at any time to change behaviour:
///
/// ```rust,ignore
/// app.add_plugins(PlotPlugin { max_resolution: 200, ..default() });
///
/// // Or change it at runtime:
/// fn my_system(mut config: ResMut<PlotConfig>) {
///     config.max_tasks_per_frame = 1;
/// }
/// ```
#[derive(Resource, Debug, Clone)]
pub struct PlotConfig {
    /// Maximum number of extraction tasks spawned per frame. Default: `4`.
    pub max_tasks_per_frame: usize,
    /// Samples per axis above which requests are clamped. Default: `400`.
    pub max_resolution: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: 4,
            max_resolution: DEFAULT_MAX_RESOLUTION,
        }
    }
}

/// Bevy plugin that turns [`Plot`] components into meshes.
///
/// Extraction runs on Bevy's `AsyncComputeTaskPool` so the main thread is never blocked:
///
/// ```text
/// Plot added or changed
///   → QueuedPlot inserted           (PlotSet::Queue)
///   → ComputeTask spawned           (PlotSet::Spawn, replaces any task in flight)
///   → [async compute runs]
///   → GeneratedMesh inserted        (PlotSet::Generate, latest generation only)
///   → [your systems here]
///   → Mesh3d inserted or removed    (PlotSet::Upload)
///   → GeneratedMesh removed
/// ```
pub struct PlotPlugin {
    /// Initial value for [`PlotConfig::max_tasks_per_frame`].
    pub max_tasks_per_frame: usize,
    /// Initial value for [`PlotConfig::max_resolution`].
    pub max_resolution: usize,
}

impl Default for PlotPlugin {
    fn default() -> Self {
        let config = PlotConfig::default();
        Self {
            max_tasks_per_frame: config.max_tasks_per_frame,
            max_resolution: config.max_resolution,
        }
    }
}

impl Plugin for PlotPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(PlotConfig {
            max_tasks_per_frame: self.max_tasks_per_frame,
            max_resolution: self.max_resolution,
        })
        .configure_sets(
            Update,
            (
                PlotSet::Queue,
                PlotSet::Spawn,
                PlotSet::Generate,
                PlotSet::Upload,
            )
                .chain(),
        )
        .add_systems(
            Update,
            (
                spawn_plot_tasks.in_set(PlotSet::Spawn),
                poll_plot_tasks.in_set(PlotSet::Generate),
                upload_mesh.in_set(PlotSet::Upload),
            ),
        );

        #[cfg(feature = "auto_queue")]
        app.add_systems(Update, queue_changed_plots.in_set(PlotSet::Queue));
    }
}

/// Inserts [`QueuedPlot`] on every added or modified [`Plot`].
#[cfg(feature = "auto_queue")]
fn queue_changed_plots(mut commands: Commands, query: Query<Entity, Changed<Plot>>) {
    for entity in query.iter() {
        commands.entity(entity).insert(QueuedPlot);
    }
}

/// Spawns extraction tasks for [`QueuedPlot`]s, up to [`PlotConfig::max_tasks_per_frame`] per frame.
fn spawn_plot_tasks(
    mut commands: Commands,
    config: Res<PlotConfig>,
    query: Query<(Entity, &Plot, Option<&PlotGeneration>), With<QueuedPlot>>,
) {
    let task_pool = AsyncComputeTaskPool::get();

    for (entity, plot, generation) in query.iter().take(config.max_tasks_per_frame) {
        let generation = generation.map_or(0, |g| g.0) + 1;
        let formula = plot.formula.clone();
        let mut settings = plot.settings.clone();
        settings.max_resolution = settings.max_resolution.min(config.max_resolution);

        debug!("plot {entity}: starting extraction #{generation} of `{formula}`");
        // `meval` contexts aren't `Send`, so compilation happens inside the task.
        let task = task_pool.spawn(async move { extract(&formula, &settings) });

        commands
            .entity(entity)
            .insert((PlotGeneration(generation), ComputeTask { generation, task }))
            .remove::<QueuedPlot>();
    }
}

/// Polls in-flight [`ComputeTask`]s each frame and inserts [`GeneratedMesh`] on completion.
///
/// Non-blocking: tasks that haven't finished are skipped and retried next frame. Results
/// from a task older than the entity's [`PlotGeneration`] are dropped.
fn poll_plot_tasks(
    mut commands: Commands,
    mut query: Query<(Entity, &mut ComputeTask, Option<&PlotGeneration>)>,
) {
    for (entity, mut compute_task, current) in query.iter_mut() {
        let Some(generated_mesh) = block_on(future::poll_once(&mut compute_task.task)) else {
            continue;
        };

        let mut entity_commands = commands.entity(entity);
        entity_commands.remove::<ComputeTask>();
        if current.is_some_and(|g| g.0 == compute_task.generation) {
            entity_commands.insert(generated_mesh);
        } else {
            debug!(
                "plot {entity}: discarding stale extraction #{}",
                compute_task.generation
            );
        }
    }
}

fn primitive_topology(topology: Topology) -> PrimitiveTopology {
    match topology {
        Topology::Points => PrimitiveTopology::PointList,
        Topology::Lines => PrimitiveTopology::LineList,
        Topology::Triangles => PrimitiveTopology::TriangleList,
    }
}

/// Uploads a [`GeneratedMesh`] into a Bevy [`Mesh3d`], releasing the mesh it replaces, then
/// removes [`GeneratedMesh`]. An empty buffer leaves the entity without a [`Mesh3d`].
///
/// The vertex data Vecs are **moved** out of the [`GeneratedMesh`] with no copies.
fn upload_mesh(
    mut commands: Commands,
    mut query: Query<(Entity, &mut GeneratedMesh, Option<&Mesh3d>)>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    for (entity, mut generated, previous) in query.iter_mut() {
        if let Some(previous) = previous {
            meshes.remove(&previous.0);
        }

        let mut entity_commands = commands.entity(entity);
        entity_commands.remove::<GeneratedMesh>();
        if generated.is_empty() {
            entity_commands.remove::<Mesh3d>();
            continue;
        }

        let mut bevy_mesh = Mesh::new(
            primitive_topology(generated.topology),
            RenderAssetUsages::RENDER_WORLD,
        );
        bevy_mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            std::mem::take(&mut generated.vertices),
        );
        if !generated.normals.is_empty() {
            bevy_mesh.insert_attribute(
                Mesh::ATTRIBUTE_NORMAL,
                std::mem::take(&mut generated.normals),
            );
        }
        if generated.topology != Topology::Points {
            bevy_mesh.insert_indices(Indices::U32(std::mem::take(&mut generated.indices)));
        }

        entity_commands.insert(Mesh3d(meshes.add(bevy_mesh)));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::tasks::TaskPool;

    use super::*;
    use crate::settings::ShapeKind;

    fn setup_app() -> App {
        AsyncComputeTaskPool::get_or_init(TaskPool::new);

        let mut app = App::new();
        app.add_plugins(PlotPlugin::default());
        app.insert_resource(Assets::<Mesh>::default());
        app
    }

    /// Runs frames until `done` holds, panicking after a generous timeout.
    fn update_until(app: &mut App, mut done: impl FnMut(&World) -> bool) {
        for _ in 0..2000 {
            app.update();
            if done(app.world()) {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("plot pipeline did not settle");
    }

    fn idle(world: &World, entity: Entity) -> bool {
        let e = world.entity(entity);
        !e.contains::<QueuedPlot>()
            && !e.contains::<ComputeTask>()
            && !e.contains::<GeneratedMesh>()
    }

    fn sphere() -> Plot {
        Plot::new("x^2 + y^2 + z^2 = 4")
            .with_settings(PlotSettings::default().with_half_extent(3.0).with_resolution(16))
    }

    fn uploaded_topology(app: &App, entity: Entity) -> Option<PrimitiveTopology> {
        let handle = app.world().get::<Mesh3d>(entity)?;
        let meshes = app.world().resource::<Assets<Mesh>>();
        meshes.get(&handle.0).map(|mesh| mesh.primitive_topology())
    }

    #[test]
    fn plot_is_meshed_and_cleaned_up() {
        let mut app = setup_app();
        let entity = app.world_mut().spawn((sphere(), QueuedPlot)).id();

        update_until(&mut app, |world| world.get::<Mesh3d>(entity).is_some());
        assert_eq!(
            uploaded_topology(&app, entity),
            Some(PrimitiveTopology::TriangleList)
        );
        assert!(app.world().get::<Transform>(entity).is_some());
        assert!(app.world().get::<GeneratedMesh>(entity).is_none());
        assert_eq!(app.world().resource::<Assets<Mesh>>().len(), 1);
    }

    #[test]
    fn failed_extraction_removes_the_mesh() {
        let mut app = setup_app();
        let entity = app.world_mut().spawn((sphere(), QueuedPlot)).id();
        update_until(&mut app, |world| world.get::<Mesh3d>(entity).is_some());

        app.world_mut().get_mut::<Plot>(entity).unwrap().formula = "x^2 +".into();
        app.world_mut().entity_mut(entity).insert(QueuedPlot);

        update_until(&mut app, |world| {
            idle(world, entity) && world.get::<Mesh3d>(entity).is_none()
        });
        assert_eq!(app.world().resource::<Assets<Mesh>>().len(), 0);
        assert_eq!(app.world().get::<PlotGeneration>(entity), Some(&PlotGeneration(2)));
    }

    #[test]
    fn latest_request_wins() {
        let mut app = setup_app();
        let points = sphere().with_settings(
            sphere().settings.with_shape(ShapeKind::Points).with_tolerance(0.5),
        );
        let entity = app.world_mut().spawn((points, QueuedPlot)).id();
        app.update();

        // Re-request before the first result has necessarily been uploaded.
        app.world_mut().get_mut::<Plot>(entity).unwrap().settings.shape = ShapeKind::Mesh;
        app.world_mut().entity_mut(entity).insert(QueuedPlot);

        update_until(&mut app, |world| {
            idle(world, entity)
                && world.get::<PlotGeneration>(entity) == Some(&PlotGeneration(2))
                && world.get::<Mesh3d>(entity).is_some()
        });
        assert_eq!(
            uploaded_topology(&app, entity),
            Some(PrimitiveTopology::LineList)
        );
        assert_eq!(app.world().resource::<Assets<Mesh>>().len(), 1);
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut app = setup_app();
        let task = AsyncComputeTaskPool::get().spawn(async {
            GeneratedMesh::points(&[crate::types::Point::origin()])
        });
        let entity = app
            .world_mut()
            .spawn((PlotGeneration(2), ComputeTask { generation: 1, task }))
            .id();

        update_until(&mut app, |world| world.get::<ComputeTask>(entity).is_none());
        app.update();
        assert!(app.world().get::<GeneratedMesh>(entity).is_none());
        assert!(app.world().get::<Mesh3d>(entity).is_none());
    }

    #[test]
    fn resolution_is_clamped_by_config() {
        let mut app = setup_app();
        app.world_mut().resource_mut::<PlotConfig>().max_resolution = 8;
        let plot = Plot::new("x^2 + y^2 + z^2 = 4").with_settings(
            PlotSettings::default()
                .with_half_extent(3.0)
                .with_resolution(100_000)
                .with_shape(ShapeKind::Points)
                .with_tolerance(100.0),
        );
        let entity = app.world_mut().spawn((plot, QueuedPlot)).id();

        update_until(&mut app, |world| world.get::<Mesh3d>(entity).is_some());
        let handle = app.world().get::<Mesh3d>(entity).unwrap().0.clone();
        let meshes = app.world().resource::<Assets<Mesh>>();
        // Every sample passes the tolerance, so the vertex count is the clamped grid size.
        assert_eq!(meshes.get(&handle).unwrap().count_vertices(), 8 * 8 * 8);
    }
}
