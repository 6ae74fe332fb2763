use derive_more::{Display, From};

use crate::types::Value;

pub type Result<T> = core::result::Result<T, PlotError>;

/// Everything that can make an extraction pass come back empty.
///
/// None of these are fatal: the pipeline logs them and renders nothing until the
/// next valid request.
#[derive(Debug, Display, From)]
pub enum PlotError {
    /// The formula was blank (or only whitespace / `=`).
    #[display("formula is empty")]
    EmptyFormula,

    /// The expression could not be parsed or compiled.
    #[display("failed to compile formula: {_0}")]
    #[from]
    Parse(meval::Error),

    /// The evaluator failed on a sample; the whole grid pass is discarded.
    #[display("evaluation failed at {coords:?}: {reason}")]
    Evaluation { coords: Vec<Value>, reason: String },

    #[display("resolution {resolution} is below the minimum of 2 samples per axis")]
    InvalidResolution { resolution: usize },

    #[display("half extent {half_extent} must be finite and positive")]
    InvalidExtent { half_extent: Value },
}

impl std::error::Error for PlotError {}

impl PlotError {
    /// Builds an [`PlotError::Evaluation`] for the sample at `coords`.
    pub fn evaluation(coords: &[Value], reason: impl ToString) -> Self {
        Self::Evaluation {
            coords: coords.to_vec(),
            reason: reason.to_string(),
        }
    }
}
