//! Explicit Euler and improved Euler (Heun) methods with a caller supplied step size.

use crate::step_shared::{evaluate, DerivativeModel, IntegrationError, StepMethod};

use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, OVector};

/// Explicit Euler method: `y_new = y + h f(x, y)`. Local error O(h²).
#[derive(Debug, Clone)]
pub struct Euler<F> {
    f: F,
}

impl<F> Euler<F> {
    /// Binds the method to a model.
    pub fn new(f: F) -> Self {
        Euler { f }
    }
}

impl<D: Dim, F> StepMethod<OVector<f64, D>> for Euler<F>
where
    F: DerivativeModel<OVector<f64, D>>,
    DefaultAllocator: Allocator<D>,
{
    type Model = F;

    fn model(&self) -> &F {
        &self.f
    }

    fn advance(
        &self,
        x: f64,
        y: &OVector<f64, D>,
        h: f64,
    ) -> Result<(f64, OVector<f64, D>), IntegrationError> {
        let dy = evaluate(&self.f, x, y);
        Ok((x + h, y + dy * h))
    }

    fn evals_per_step(&self) -> u32 {
        1
    }
}

/// Improved Euler (Heun) method. Local error O(h³).
///
/// An Euler predictor `ȳ = y + h f(x, y)` is corrected with the mean slope
/// `y_new = y + h/2 (f(x, y) + f(x + h, ȳ))`.
#[derive(Debug, Clone)]
pub struct ImprovedEuler<F> {
    f: F,
}

impl<F> ImprovedEuler<F> {
    /// Binds the method to a model.
    pub fn new(f: F) -> Self {
        ImprovedEuler { f }
    }
}

impl<D: Dim, F> StepMethod<OVector<f64, D>> for ImprovedEuler<F>
where
    F: DerivativeModel<OVector<f64, D>>,
    DefaultAllocator: Allocator<D>,
{
    type Model = F;

    fn model(&self) -> &F {
        &self.f
    }

    fn advance(
        &self,
        x: f64,
        y: &OVector<f64, D>,
        h: f64,
    ) -> Result<(f64, OVector<f64, D>), IntegrationError> {
        let k1 = evaluate(&self.f, x, y);
        let y_bar = y + &k1 * h;
        let k2 = evaluate(&self.f, x + h, &y_bar);
        Ok((x + h, y + (k1 + k2) * (h / 2.0)))
    }

    fn evals_per_step(&self) -> u32 {
        2
    }
}
