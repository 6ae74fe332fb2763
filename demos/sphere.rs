use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use bevy_implicit_plot::{
    Plot, PlotPlugin,
    settings::{PlotSettings, ShapeKind, Slice},
};
use bevy_infinite_grid::{InfiniteGridBundle, InfiniteGridPlugin, InfiniteGridSettings};
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
        .add_systems(Update, controls)
        .run();
}

fn setup(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    commands.spawn(InfiniteGridBundle {
        settings: InfiniteGridSettings {
            fadeout_distance: 200.0,
            ..Default::default()
        },
        ..Default::default()
    });

    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera {
            button_orbit: MouseButton::Right,
            button_pan: MouseButton::Middle,
            ..default()
        },
        Transform::from_xyz(15., 12., 15.).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::FULL_DAYLIGHT,
            ..Default::default()
        },
        Transform::default().with_rotation(Quat::from_rotation_x(-45.0_f32.to_radians())),
    ));

    commands.spawn((
        Plot::new("x^2 + y^2 + z^2 = 25")
            .with_settings(PlotSettings::default().with_resolution(60)),
        // Formulas are z-up, Bevy is y-up.
        Transform::from_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.2, 0.5, 1.),
            double_sided: true,
            cull_mode: None,
            ..Default::default()
        })),
    ));
}

/// `S` cycles points / wireframe / surface, `Space` toggles a cutaway at `z = 0`,
/// `Up`/`Down` change the resolution.
fn controls(keyboard: Res<ButtonInput<KeyCode>>, mut plots: Query<&mut Plot>) {
    for mut plot in plots.iter_mut() {
        if keyboard.just_pressed(KeyCode::KeyS) {
            plot.settings.shape = match plot.settings.shape {
                ShapeKind::Points => ShapeKind::Mesh,
                ShapeKind::Mesh => ShapeKind::Surface,
                _ => ShapeKind::Points,
            };
        }
        if keyboard.just_pressed(KeyCode::Space) {
            plot.settings.slice = match plot.settings.slice {
                Some(_) => None,
                None => Some(Slice::below(0.0)),
            };
        }
        if keyboard.just_pressed(KeyCode::ArrowUp) {
            plot.settings.resolution += 10;
        }
        if keyboard.just_pressed(KeyCode::ArrowDown) && plot.settings.resolution > 12 {
            plot.settings.resolution -= 10;
        }
    }
}
