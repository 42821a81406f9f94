//! Explicit Runge-Kutta method of order 4 with a caller supplied step size.

use crate::step_shared::{evaluate, DerivativeModel, IntegrationError, StepMethod};

use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, OVector};

/// Classical four-stage Runge-Kutta method with weights 1/6, 1/3, 1/3, 1/6. Local error O(h⁵).
#[derive(Debug, Clone)]
pub struct Rk4<F> {
    f: F,
}

impl<F> Rk4<F> {
    /// Binds the method to a model.
    pub fn new(f: F) -> Self {
        Rk4 { f }
    }
}

impl<D: Dim, F> StepMethod<OVector<f64, D>> for Rk4<F>
where
    F: DerivativeModel<OVector<f64, D>>,
    DefaultAllocator: Allocator<D>,
{
    type Model = F;

    fn model(&self) -> &F {
        &self.f
    }

    /// Performs one step of the Runge-Kutta 4 method.
    fn advance(
        &self,
        x: f64,
        y: &OVector<f64, D>,
        h: f64,
    ) -> Result<(f64, OVector<f64, D>), IntegrationError> {
        let half_step = h / 2.0;

        let k1 = evaluate(&self.f, x, y);
        let k2 = evaluate(&self.f, x + half_step, &(y + &k1 * half_step));
        let k3 = evaluate(&self.f, x + half_step, &(y + &k2 * half_step));
        let k4 = evaluate(&self.f, x + h, &(y + &k3 * h));

        let y_new = y + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0);
        Ok((x + h, y_new))
    }

    fn evals_per_step(&self) -> u32 {
        4
    }
}
