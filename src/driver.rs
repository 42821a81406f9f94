//! Run loop shared by all integrators.

use crate::constants::driver::MAX_STEPS;
use crate::controller::Integrator;
use crate::step_shared::{DerivativeModel, IntegrationError, Stats, Trajectory};

use log::{info, warn};
use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, OVector};

/// Structure containing the parameters for the numerical integration.
///
/// The driver owns the step size of the run: it hands the current value to the
/// integrator and keeps whatever the integrator proposes for the next step.
pub struct Driver<V, I>
where
    I: Integrator<V>,
{
    integrator: I,
    h: f64,
    max_steps: usize,
    trajectory: Trajectory<V>,
    stats: Stats,
}

impl<D: Dim, I> Driver<OVector<f64, D>, I>
where
    I: Integrator<OVector<f64, D>>,
    DefaultAllocator: Allocator<D>,
{
    /// Default initializer for the structure
    ///
    /// # Arguments
    ///
    /// * `integrator`  - Fixed or adaptive integrator, bound to its model
    /// * `h`           - Initial step size
    ///
    pub fn new(integrator: I, h: f64) -> Self {
        Driver {
            integrator,
            h,
            max_steps: MAX_STEPS,
            trajectory: Trajectory::new(),
            stats: Stats::new(),
        }
    }

    /// Caps the number of accepted steps of a run.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Core integration method.
    ///
    /// Starts from the model's initial condition and steps until the model's termination
    /// predicate holds. Every point reached before that is recorded; the point that ends
    /// the run is stored as the terminal state of the trajectory.
    pub fn integrate(&mut self) -> Result<Stats, IntegrationError> {
        if !(self.h > 0.0 && self.h.is_finite()) {
            return Err(IntegrationError::InvalidStepSize { h: self.h });
        }
        self.trajectory.clear();
        self.stats = Stats::new();

        let model = self.integrator.model();
        let (mut x, mut y) = model.initial();
        let mut h = self.h;
        info!("integration started at x = {x:e} with h = {h:e}");

        while !model.is_final(x, &y) {
            if self.trajectory.len() >= self.max_steps {
                warn!("integration stopped at x = {x:e} after {} steps", self.max_steps);
                return Err(IntegrationError::MaxNumStepReached {
                    x,
                    n_step: self.max_steps,
                });
            }
            self.trajectory.push(x, y.clone());

            let step = self.integrator.step(x, &y, h)?;
            self.stats.accepted_steps += 1;
            self.stats.rejected_steps += step.rejected;
            self.stats.num_eval += step.evals;

            x = step.x;
            y = step.y;
            h = step.h_next;
        }

        info!(
            "integration finished at x = {x:e}: {} accepted, {} rejected steps",
            self.stats.accepted_steps, self.stats.rejected_steps
        );
        self.trajectory.set_terminal(x, y);
        Ok(self.stats)
    }

    /// The integrator driving the run.
    pub fn integrator(&self) -> &I {
        &self.integrator
    }

    /// Statistics of the last run.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Getter for the results of the last run.
    pub fn results(&self) -> &Trajectory<OVector<f64, D>> {
        &self.trajectory
    }

    /// Getter for the independent variable's output.
    pub fn x_out(&self) -> &[f64] {
        self.trajectory.x()
    }

    /// Getter for the dependent variables' output.
    pub fn y_out(&self) -> &[OVector<f64, D>] {
        self.trajectory.y()
    }

    /// Consumes the driver and returns the trajectory of the last run.
    pub fn into_results(self) -> Trajectory<OVector<f64, D>> {
        self.trajectory
    }
}

/// Integrates from the model's initial condition until its termination predicate holds.
pub fn run<D: Dim, I>(integrator: I, h: f64) -> Result<Trajectory<OVector<f64, D>>, IntegrationError>
where
    I: Integrator<OVector<f64, D>>,
    DefaultAllocator: Allocator<D>,
{
    let mut driver = Driver::new(integrator, h);
    driver.integrate()?;
    Ok(driver.into_results())
}
