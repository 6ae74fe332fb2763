pub mod cloud;
pub mod cubes;
pub mod domain;
pub mod error;
pub mod extract;
pub mod formula;
pub mod interp;
pub mod mesh;
pub mod plugin;
pub mod sampler;
pub mod settings;
pub mod squares;
pub mod tables;
pub mod tube;
pub mod types;

pub use extract::{extract, try_extract};
pub use plugin::{Plot, PlotPlugin};
