use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use bevy_implicit_plot::{
    Plot, PlotPlugin,
    settings::{PlotSettings, Projection, ShapeKind, SurfaceMethod},
};
use bevy_infinite_grid::{InfiniteGridBundle, InfiniteGridPlugin};
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            PlotPlugin::default(),
            PanOrbitCameraPlugin,
            InfiniteGridPlugin,
        ))
        .add_systems(Startup, setup)
        .add_systems(Update, toggle_shape)
        .run();
}

fn setup(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    commands.spawn(InfiniteGridBundle::default());

    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera::default(),
        Transform::from_xyz(12., 10., 12.).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight::default(),
        Transform::default().with_rotation(Quat::from_rotation_x(-60.0_f32.to_radians())),
    ));

    // A height field is single-valued over XY, so the default projection suits it.
    commands.spawn((
        Plot::new("z = sin(x) * cos(y) * 2").with_settings(
            PlotSettings::default()
                .with_half_extent(7.0)
                .with_resolution(80)
                .with_tolerance(0.1)
                .with_surface_method(SurfaceMethod::PointCloud(Projection::Xy)),
        ),
        Transform::from_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.3, 0.9, 0.4),
            cull_mode: None,
            ..Default::default()
        })),
    ));
}

/// `Space` switches between the triangulated surface and the raw filtered points.
fn toggle_shape(keyboard: Res<ButtonInput<KeyCode>>, mut plots: Query<&mut Plot>) {
    if keyboard.just_pressed(KeyCode::Space) {
        for mut plot in plots.iter_mut() {
            plot.settings.shape = match plot.settings.shape {
                ShapeKind::Points => ShapeKind::Surface,
                _ => ShapeKind::Points,
            };
        }
    }
}
