use bevy::prelude::*;
use bevy_implicit_plot::{
    Plot, PlotPlugin,
    settings::{PlotSettings, SaddleResolution, ShapeKind},
};
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};

const FORMULAS: [&str; 3] = ["sin(x) = cos(y)", "x^2 + y^2 = 25", "y = x^3 / 20 - x"];

fn main() {
    App::new()
        .add_plugins((DefaultPlugins, PlotPlugin::default(), PanOrbitCameraPlugin))
        .add_systems(Startup, setup)
        .add_systems(Update, cycle_formula)
        .run();
}

fn setup(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera {
            button_orbit: MouseButton::Right,
            button_pan: MouseButton::Middle,
            ..default()
        },
        Transform::from_xyz(0., 0., 25.).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight::default(),
        Transform::from_xyz(0., 0., 10.).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Plot::new(FORMULAS[0]).with_settings(
            PlotSettings::default()
                .with_shape(ShapeKind::Line)
                .with_resolution(200)
                .with_radius(0.05)
                .with_saddle(SaddleResolution::CenterAverage),
        ),
        MeshMaterial3d(materials.add(Color::srgb(1., 0.4, 0.1))),
    ));
}

/// `Space` switches to the next formula.
fn cycle_formula(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut index: Local<usize>,
    mut plots: Query<&mut Plot>,
) {
    if !keyboard.just_pressed(KeyCode::Space) {
        return;
    }
    *index = (*index + 1) % FORMULAS.len();
    for mut plot in plots.iter_mut() {
        plot.formula = FORMULAS[*index].to_string();
    }
}
