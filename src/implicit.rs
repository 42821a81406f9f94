//! Linearised implicit Euler method for stiff systems.
//!
//! Each step solves `(I/h - J) Δy = f(x, y)` once, with the Jacobian `J` evaluated at
//! the start of the step, and returns `y + Δy`. There is no Newton iteration.

use crate::step_shared::{IntegrationError, JacobianModel, StepMethod};

use nalgebra::{allocator::Allocator, DMatrix, DVector, DefaultAllocator, Dim, OVector};

/// Semi-implicit Euler method with a dense LU solve per step.
#[derive(Debug, Clone)]
pub struct SemiImplicitEuler<F> {
    f: F,
}

impl<F> SemiImplicitEuler<F> {
    /// Binds the method to a model.
    pub fn new(f: F) -> Self {
        SemiImplicitEuler { f }
    }
}

impl<F> SemiImplicitEuler<F> {
    /// Solves the linearised implicit system for the increment `Δy` of a step of size `h`.
    pub fn increment<D: Dim>(
        &self,
        x: f64,
        y: &OVector<f64, D>,
        h: f64,
    ) -> Result<OVector<f64, D>, IntegrationError>
    where
        F: JacobianModel<OVector<f64, D>>,
        DefaultAllocator: Allocator<D>,
    {
        let (rows, cols) = y.shape_generic();
        let dim = rows.value();

        let mut b = OVector::zeros_generic(rows, cols);
        let mut jac = DMatrix::zeros(dim, dim);
        self.f.system_with_jacobian(x, y, &mut b, &mut jac);

        let m = DMatrix::from_diagonal_element(dim, dim, 1.0 / h) - jac;
        let rhs = DVector::from_iterator(dim, b.iter().copied());
        let dy = solve_dense(m, &rhs).ok_or(IntegrationError::SingularJacobian { x })?;

        if dy.iter().any(|v| !v.is_finite()) {
            return Err(IntegrationError::SingularJacobian { x });
        }
        Ok(OVector::from_iterator_generic(rows, cols, dy.iter().copied()))
    }
}

/// LU solve of a dense system, `None` when the matrix is singular.
fn solve_dense(m: DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    m.lu().solve(rhs)
}

impl<D: Dim, F> StepMethod<OVector<f64, D>> for SemiImplicitEuler<F>
where
    F: JacobianModel<OVector<f64, D>>,
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
        let dy = self.increment(x, y, h)?;
        Ok((x + h, y + dy))
    }

    fn evals_per_step(&self) -> u32 {
        1
    }
}
