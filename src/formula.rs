//! The expression-evaluator seam.
//!
//! The meshing pipeline only needs "something that maps a variable binding to a number or a
//! failure". [`Evaluator`] is that contract; [`Compiler`] turns a formula string into one.
//! [`MevalCompiler`] is the stock implementation backed by the `meval` crate, and any
//! `Fn(&[Value]) -> Result<Value>` closure is an evaluator too.
use meval::{Context, ContextProvider, Expr};

use crate::{
    error::{PlotError, Result},
    types::{Dimension, Value},
};

/// Variable names bound to the sample coordinates, in axis order.
pub const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// A compiled formula.
///
/// `coords` holds `[x, y]` for 2D sampling and `[x, y, z]` for 3D sampling.
pub trait Evaluator {
    fn evaluate(&self, coords: &[Value]) -> Result<Value>;
}

impl<F> Evaluator for F
where
    F: Fn(&[Value]) -> Result<Value>,
{
    #[inline]
    fn evaluate(&self, coords: &[Value]) -> Result<Value> {
        self(coords)
    }
}

/// Compiles a formula string into an [`Evaluator`].
pub trait Compiler {
    type Evaluator: Evaluator;

    fn compile(&self, formula: &str) -> Result<Self::Evaluator>;
}

/// Rewrites an implicit equation into an expression whose zero-set is the same shape.
///
/// `lhs=rhs` becomes `(lhs)-(rhs)`. A formula without `=` is returned trimmed.
///
/// ```
/// use bevy_implicit_plot::formula::normalize_formula;
///
/// assert_eq!(normalize_formula("x^2 + y^2 = 25").unwrap(), "(x^2 + y^2)-(25)");
/// assert_eq!(normalize_formula(" sin(x) - y ").unwrap(), "sin(x) - y");
/// ```
pub fn normalize_formula(formula: &str) -> Result<String> {
    let trimmed = formula.trim();
    if trimmed.is_empty() {
        return Err(PlotError::EmptyFormula);
    }
    if !trimmed.contains('=') {
        return Ok(trimmed.to_owned());
    }

    let sides: Vec<&str> = trimmed.split('=').map(str::trim).collect();
    if sides.iter().any(|side| side.is_empty()) {
        return Err(PlotError::EmptyFormula);
    }

    Ok(sides
        .iter()
        .map(|side| format!("({side})"))
        .collect::<Vec<_>>()
        .join("-"))
}

/// Picks 3D sampling when the formula mentions `z` as a variable, 2D otherwise.
///
/// Only whole identifiers count, so `sinz(x)` or `zeta` do not make a formula 3D.
pub fn detect_dimension(formula: &str) -> Dimension {
    let mut identifiers = formula
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty());

    if identifiers.any(|token| token == "z") {
        Dimension::Three
    } else {
        Dimension::Two
    }
}

/// Binds the sample coordinates to `x`, `y` and `z`.
struct AxisBindings<'a>(&'a [Value]);

impl ContextProvider for AxisBindings<'_> {
    fn get_var(&self, name: &str) -> Option<f64> {
        AXIS_NAMES
            .iter()
            .position(|axis| *axis == name)
            .and_then(|i| self.0.get(i).copied())
    }
}

/// A formula compiled by [`MevalCompiler`].
pub struct CompiledFormula {
    expr: Expr,
    context: Context<'static>,
}

impl Evaluator for CompiledFormula {
    fn evaluate(&self, coords: &[Value]) -> Result<Value> {
        self.expr
            .eval_with_context((AxisBindings(coords), &self.context))
            .map_err(|err| PlotError::evaluation(coords, err))
    }
}

/// [`Compiler`] backed by `meval`, with its builtin functions and constants
/// (`sin`, `sqrt`, `abs`, `pi`, `e`, ...).
#[derive(Debug, Default, Clone, Copy)]
pub struct MevalCompiler;

impl Compiler for MevalCompiler {
    type Evaluator = CompiledFormula;

    fn compile(&self, formula: &str) -> Result<CompiledFormula> {
        let normalized = normalize_formula(formula)?;
        tracing::debug!("compiling formula `{normalized}`");
        let expr: Expr = normalized.parse()?;
        Ok(CompiledFormula {
            expr,
            context: Context::new(),
        })
    }
}
