//! Shared traits and structures for the step methods, the adaptive controllers and the driver.

use nalgebra::{allocator::Allocator, DMatrix, DefaultAllocator, Dim, OVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Trait needed to be implemented by the user.
///
/// A model bundles the right-hand side of a first-order system `dy/dx = f(x, y)`
/// with its initial condition and the predicate that ends the integration.
/// Parameters of a model are fixed at construction and never change during a run,
/// so one model can be shared by reference between several concurrent runs.
pub trait DerivativeModel<V> {
    /// System of ordinary differential equations.
    fn system(&self, x: f64, y: &V, dy: &mut V);
    /// Initial value of the independent and the dependent variables.
    fn initial(&self) -> (f64, V);
    /// Termination predicate. The integration stops as soon as this returns true.
    fn is_final(&self, x: f64, y: &V) -> bool;
}

/// Models providing the Jacobian `∂f/∂y`, needed by the implicit step method.
pub trait JacobianModel<V>: DerivativeModel<V> {
    /// Writes the square Jacobian evaluated at `(x, y)` into `jac`.
    fn jacobian(&self, x: f64, y: &V, jac: &mut DMatrix<f64>);

    /// Evaluates the right-hand side and the Jacobian at the same point.
    fn system_with_jacobian(&self, x: f64, y: &V, dy: &mut V, jac: &mut DMatrix<f64>) {
        self.system(x, y, dy);
        self.jacobian(x, y, jac);
    }
}

/// One-step method bound to a derivative model.
///
/// `advance` is pure with respect to `(x, y, h)`: it never mutates the method, so a
/// rejected step can be retried from the same state with a different step size.
pub trait StepMethod<V> {
    type Model: DerivativeModel<V>;

    /// The model whose right-hand side is integrated.
    fn model(&self) -> &Self::Model;

    /// Advances `(x, y)` by one step of size `h`.
    fn advance(&self, x: f64, y: &V, h: f64) -> Result<(f64, V), IntegrationError>;

    /// Number of right-hand side evaluations per call to `advance`.
    fn evals_per_step(&self) -> u32;
}

/// Evaluates the right-hand side of `f` at `(x, y)` into a new vector.
pub(crate) fn evaluate<D, F>(f: &F, x: f64, y: &OVector<f64, D>) -> OVector<f64, D>
where
    D: Dim,
    F: DerivativeModel<OVector<f64, D>>,
    DefaultAllocator: Allocator<D>,
{
    let (rows, cols) = y.shape_generic();
    let mut dy = OVector::zeros_generic(rows, cols);
    f.system(x, y, &mut dy);
    dy
}

/// True if every component is a finite number.
pub(crate) fn is_finite<D: Dim>(y: &OVector<f64, D>) -> bool
where
    DefaultAllocator: Allocator<D>,
{
    y.iter().all(|v| v.is_finite())
}

impl<V, F: DerivativeModel<V> + ?Sized> DerivativeModel<V> for &F {
    fn system(&self, x: f64, y: &V, dy: &mut V) {
        (**self).system(x, y, dy)
    }

    fn initial(&self) -> (f64, V) {
        (**self).initial()
    }

    fn is_final(&self, x: f64, y: &V) -> bool {
        (**self).is_final(x, y)
    }
}

impl<V, F: JacobianModel<V> + ?Sized> JacobianModel<V> for &F {
    fn jacobian(&self, x: f64, y: &V, jac: &mut DMatrix<f64>) {
        (**self).jacobian(x, y, jac)
    }
}

/// Enumeration of the errors that may arise while building a model or during integration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntegrationError {
    #[error("Invalid model parameter {name} = {value}.")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("No exact Lane-Emden solution for polytropic index n = {n}.")]
    UnsupportedPolytropicIndex { n: f64 },
    #[error("Step size must be positive and finite, got h = {h}.")]
    InvalidStepSize { h: f64 },
    #[error("Stopped at x = {x}. The implicit system is singular.")]
    SingularJacobian { x: f64 },
    #[error("Stopped at x = {x}. The state is no longer finite.")]
    NonFiniteState { x: f64 },
    #[error("Stopped at x = {x}. Step size underflow.")]
    StepSizeUnderflow { x: f64 },
    #[error("Stopped at x = {x}. Step rejected {retries} times in a row.")]
    MaxRetriesReached { x: f64, retries: u32 },
    #[error("Stopped at x = {x}. Need more than {n_step} steps.")]
    MaxNumStepReached { x: f64, n_step: usize },
    #[error("Stopped at x = {x} before the density reached zero.")]
    SurfaceNotReached { x: f64 },
}

/// Contains some statistics of the integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub num_eval: u32,
    pub accepted_steps: u32,
    pub rejected_steps: u32,
}

impl Stats {
    pub(crate) fn new() -> Stats {
        Stats {
            num_eval: 0,
            accepted_steps: 0,
            rejected_steps: 0,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of function evaluations: {}", self.num_eval)?;
        writeln!(f, "Number of accepted steps: {}", self.accepted_steps)?;
        write!(f, "Number of rejected steps: {}", self.rejected_steps)
    }
}

/// Accepted points of one integration run.
///
/// Index 0 holds the initial condition. The point that made the termination
/// predicate fire is not part of the sequence; it is kept aside as the terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory<V> {
    x: Vec<f64>,
    y: Vec<V>,
    terminal: Option<(f64, V)>,
}

impl<V> Default for Trajectory<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trajectory<V> {
    /// Creates an empty trajectory.
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            terminal: None,
        }
    }

    pub(crate) fn push(&mut self, x: f64, y: V) {
        self.x.push(x);
        self.y.push(y);
    }

    pub(crate) fn set_terminal(&mut self, x: f64, y: V) {
        self.terminal = Some((x, y));
    }

    pub(crate) fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.terminal = None;
    }

    /// Returns the independent and the dependent variables.
    pub fn get(&self) -> (&Vec<f64>, &Vec<V>) {
        (&self.x, &self.y)
    }

    /// Getter for the independent variable's output.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Getter for the dependent variables' output.
    pub fn y(&self) -> &[V] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Last accepted point.
    pub fn last(&self) -> Option<(f64, &V)> {
        self.x.last().copied().zip(self.y.last())
    }

    /// State that ended the run, if the run reached its termination predicate.
    pub fn terminal(&self) -> Option<(f64, &V)> {
        self.terminal.as_ref().map(|(x, y)| (*x, y))
    }

    /// Iterates over the accepted `(x, y)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &V)> + '_ {
        self.x.iter().copied().zip(self.y.iter())
    }

    /// Consumes the trajectory and returns the independent and the dependent variables.
    pub fn into_parts(self) -> (Vec<f64>, Vec<V>) {
        (self.x, self.y)
    }
}
