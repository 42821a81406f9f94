//! Adaptive step size control.
//!
//! The driver talks to every integrator through [`Integrator::step`], which takes the
//! current step size and hands back the one to use next. Fixed-step integration is the
//! trivial controller [`Fixed`]; [`Adaptive`] wraps any explicit [`StepMethod`] and
//! [`AdaptiveImplicit`] drives the semi-implicit method from its own increment.

use crate::constants::adaptive::{
    DIVISION_GUARD, EXPLICIT_RMAX, EXPLICIT_THRES, IMPLICIT_MIN_RATIO, IMPLICIT_RMAX,
    IMPLICIT_THRES, MAX_GROWTH, MAX_HALVINGS,
};
use crate::implicit::SemiImplicitEuler;
use crate::step_shared::{
    evaluate, is_finite, DerivativeModel, IntegrationError, JacobianModel, StepMethod,
};

use log::{debug, warn};
use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, OVector};
use serde::{Deserialize, Serialize};

/// An accepted step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<V> {
    /// New value of the independent variable.
    pub x: f64,
    /// New state.
    pub y: V,
    /// Step size to use for the following step.
    pub h_next: f64,
    /// Number of attempts rejected before this step was accepted.
    pub rejected: u32,
    /// Number of right-hand side evaluations spent on this step.
    pub evals: u32,
}

/// Advances a model by one accepted step, choosing the step size along the way.
pub trait Integrator<V> {
    type Model: DerivativeModel<V>;

    /// The model being integrated.
    fn model(&self) -> &Self::Model;

    /// Advances `(x, y)` starting from the step size `h`.
    fn step(&self, x: f64, y: &V, h: f64) -> Result<Step<V>, IntegrationError>;
}

/// Parameters of the adaptive controllers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveSettings {
    /// Largest fractional change of a component in one step.
    pub rmax: f64,
    /// Floor added to each component so species at zero abundance may still grow.
    pub thres: f64,
    /// Consecutive halvings of one step before giving up.
    pub max_halvings: u32,
    /// Smallest step size tried; the step fails below it.
    pub h_min: f64,
}

impl AdaptiveSettings {
    /// Defaults of the explicit controller.
    pub fn explicit() -> Self {
        AdaptiveSettings {
            rmax: EXPLICIT_RMAX,
            thres: EXPLICIT_THRES,
            max_halvings: MAX_HALVINGS,
            h_min: 0.0,
        }
    }

    /// Defaults of the implicit controller.
    pub fn implicit() -> Self {
        AdaptiveSettings {
            rmax: IMPLICIT_RMAX,
            thres: IMPLICIT_THRES,
            max_halvings: MAX_HALVINGS,
            h_min: 0.0,
        }
    }

    fn validate(&self) -> Result<(), IntegrationError> {
        if !(self.rmax > 0.0 && self.rmax.is_finite()) {
            return Err(IntegrationError::InvalidParameter {
                name: "rmax",
                value: self.rmax,
            });
        }
        if !(self.thres >= 0.0 && self.thres.is_finite()) {
            return Err(IntegrationError::InvalidParameter {
                name: "thres",
                value: self.thres,
            });
        }
        if !(self.h_min >= 0.0 && self.h_min.is_finite()) {
            return Err(IntegrationError::InvalidParameter {
                name: "h_min",
                value: self.h_min,
            });
        }
        Ok(())
    }

    /// Fails when `h` fell to or below the smallest allowed step.
    fn check_step(&self, x: f64, h: f64) -> Result<(), IntegrationError> {
        if h > self.h_min && h.is_finite() {
            Ok(())
        } else {
            warn!("step size underflow at x = {x:e} (h = {h:e})");
            Err(IntegrationError::StepSizeUnderflow { x })
        }
    }

    /// Fails once a step has been halved `max_halvings` times.
    fn check_retries(&self, x: f64, rejected: u32) -> Result<(), IntegrationError> {
        if rejected < self.max_halvings {
            Ok(())
        } else {
            warn!("step at x = {x:e} rejected {rejected} times, giving up");
            Err(IntegrationError::MaxRetriesReached {
                x,
                retries: rejected,
            })
        }
    }
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self::explicit()
    }
}

/// Smallest ratio `rmax (y_i + thres) / (|r_i| + ε)` over all components.
fn fractional_bound<D: Dim>(
    settings: &AdaptiveSettings,
    y: &OVector<f64, D>,
    rate: &OVector<f64, D>,
) -> f64
where
    DefaultAllocator: Allocator<D>,
{
    y.iter()
        .zip(rate.iter())
        .map(|(y_i, r_i)| (y_i + settings.thres) / (r_i.abs() + DIVISION_GUARD))
        .fold(f64::INFINITY, f64::min)
        * settings.rmax
}

/// Abundances and densities must not be negative; NaN is rejected as well.
fn is_admissible<D: Dim>(y: &OVector<f64, D>) -> bool
where
    DefaultAllocator: Allocator<D>,
{
    y.iter().all(|v| *v >= 0.0) && is_finite(y)
}

/// Integration with a constant step size.
#[derive(Debug, Clone)]
pub struct Fixed<S> {
    stepper: S,
}

impl<S> Fixed<S> {
    pub fn new(stepper: S) -> Self {
        Fixed { stepper }
    }

    /// The wrapped step method.
    pub fn stepper(&self) -> &S {
        &self.stepper
    }
}

impl<D: Dim, S> Integrator<OVector<f64, D>> for Fixed<S>
where
    S: StepMethod<OVector<f64, D>>,
    DefaultAllocator: Allocator<D>,
{
    type Model = S::Model;

    fn model(&self) -> &S::Model {
        self.stepper.model()
    }

    fn step(
        &self,
        x: f64,
        y: &OVector<f64, D>,
        h: f64,
    ) -> Result<Step<OVector<f64, D>>, IntegrationError> {
        let (x_new, y_new) = self.stepper.advance(x, y, h)?;
        if !is_finite(&y_new) {
            return Err(IntegrationError::NonFiniteState { x: x_new });
        }
        Ok(Step {
            x: x_new,
            y: y_new,
            h_next: h,
            rejected: 0,
            evals: self.stepper.evals_per_step(),
        })
    }
}

/// Adaptive control around an explicit step method, for states that must stay non-negative.
///
/// The step is chosen so no component changes by more than `rmax` of itself, and may at
/// most double from one step to the next. A step producing a negative component is
/// halved and retried.
#[derive(Debug, Clone)]
pub struct Adaptive<S> {
    stepper: S,
    settings: AdaptiveSettings,
}

impl<S> Adaptive<S> {
    /// Wraps `stepper` with the explicit defaults.
    pub fn new(stepper: S) -> Self {
        Adaptive {
            stepper,
            settings: AdaptiveSettings::explicit(),
        }
    }

    /// Wraps `stepper` with custom settings.
    pub fn from_param(stepper: S, settings: AdaptiveSettings) -> Result<Self, IntegrationError> {
        settings.validate()?;
        Ok(Adaptive { stepper, settings })
    }

    pub fn settings(&self) -> &AdaptiveSettings {
        &self.settings
    }
}

impl<D: Dim, S> Integrator<OVector<f64, D>> for Adaptive<S>
where
    S: StepMethod<OVector<f64, D>>,
    DefaultAllocator: Allocator<D>,
{
    type Model = S::Model;

    fn model(&self) -> &S::Model {
        self.stepper.model()
    }

    fn step(
        &self,
        x: f64,
        y: &OVector<f64, D>,
        h: f64,
    ) -> Result<Step<OVector<f64, D>>, IntegrationError> {
        let rate = evaluate(self.stepper.model(), x, y);
        let mut evals = 1;

        // Estimate the step, preventing it from growing too fast
        let mut h = fractional_bound(&self.settings, y, &rate).min(MAX_GROWTH * h);
        let mut rejected = 0;

        loop {
            self.settings.check_step(x, h)?;

            let (x_new, y_new) = self.stepper.advance(x, y, h)?;
            evals += self.stepper.evals_per_step();

            if is_admissible(&y_new) {
                return Ok(Step {
                    x: x_new,
                    y: y_new,
                    h_next: h,
                    rejected,
                    evals,
                });
            }

            self.settings.check_retries(x, rejected)?;
            debug!("negative state at x = {x:e} with h = {h:e}, halving");
            h *= 0.5;
            rejected += 1;
        }
    }
}

/// Adaptive control of the semi-implicit method.
///
/// The next step size follows from the increment of the implicit solve itself. A step is
/// halved and solved again when it yields a negative component or when the step it implies
/// next would be less than half the current one.
#[derive(Debug, Clone)]
pub struct AdaptiveImplicit<F> {
    stepper: SemiImplicitEuler<F>,
    settings: AdaptiveSettings,
}

impl<F> AdaptiveImplicit<F> {
    /// Creates the controller for model `f` with the implicit defaults.
    pub fn new(f: F) -> Self {
        AdaptiveImplicit {
            stepper: SemiImplicitEuler::new(f),
            settings: AdaptiveSettings::implicit(),
        }
    }

    /// Creates the controller for model `f` with custom settings.
    pub fn from_param(f: F, settings: AdaptiveSettings) -> Result<Self, IntegrationError> {
        settings.validate()?;
        Ok(AdaptiveImplicit {
            stepper: SemiImplicitEuler::new(f),
            settings,
        })
    }

    pub fn settings(&self) -> &AdaptiveSettings {
        &self.settings
    }
}

impl<D: Dim, F> Integrator<OVector<f64, D>> for AdaptiveImplicit<F>
where
    F: JacobianModel<OVector<f64, D>>,
    DefaultAllocator: Allocator<D>,
{
    type Model = F;

    fn model(&self) -> &F {
        self.stepper.model()
    }

    fn step(
        &self,
        x: f64,
        y: &OVector<f64, D>,
        h: f64,
    ) -> Result<Step<OVector<f64, D>>, IntegrationError> {
        let mut h = h;
        let mut rejected = 0;
        let mut evals = 0;

        loop {
            self.settings.check_step(x, h)?;

            let dy = self.stepper.increment(x, y, h)?;
            evals += 1;
            let y_new = y + &dy;
            let h_next = h * fractional_bound(&self.settings, &y_new, &dy);

            if is_admissible(&y_new) && h_next > IMPLICIT_MIN_RATIO * h {
                return Ok(Step {
                    x: x + h,
                    y: y_new,
                    h_next: h_next.min(MAX_GROWTH * h),
                    rejected,
                    evals,
                });
            }

            self.settings.check_retries(x, rejected)?;
            debug!("implicit step at x = {x:e} with h = {h:e} rejected, halving");
            h *= 0.5;
            rejected += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euler::Euler;
    use crate::rk4::Rk4;
    use crate::{DMatrix, Vector1, Vector2};
    use approx::assert_relative_eq;

    // Constant consumption: dy/dx = -1, J = 0
    struct Drain {
        y0: f64,
    }

    impl DerivativeModel<Vector1<f64>> for Drain {
        fn system(&self, _x: f64, _y: &Vector1<f64>, dy: &mut Vector1<f64>) {
            dy[0] = -1.0;
        }

        fn initial(&self) -> (f64, Vector1<f64>) {
            (0.0, Vector1::new(self.y0))
        }

        fn is_final(&self, _x: f64, y: &Vector1<f64>) -> bool {
            y[0] <= 0.0
        }
    }

    impl JacobianModel<Vector1<f64>> for Drain {
        fn jacobian(&self, _x: f64, _y: &Vector1<f64>, jac: &mut DMatrix<f64>) {
            jac.fill(0.0);
        }
    }

    // A -> B with rate k
    struct Conversion {
        k: f64,
    }

    impl DerivativeModel<Vector2<f64>> for Conversion {
        fn system(&self, _x: f64, y: &Vector2<f64>, dy: &mut Vector2<f64>) {
            dy[0] = -self.k * y[0];
            dy[1] = self.k * y[0];
        }

        fn initial(&self) -> (f64, Vector2<f64>) {
            (0.0, Vector2::new(1.0, 0.0))
        }

        fn is_final(&self, x: f64, _y: &Vector2<f64>) -> bool {
            x > 10.0
        }
    }

    impl JacobianModel<Vector2<f64>> for Conversion {
        fn jacobian(&self, _x: f64, _y: &Vector2<f64>, jac: &mut DMatrix<f64>) {
            jac[(0, 0)] = -self.k;
            jac[(0, 1)] = 0.0;
            jac[(1, 0)] = self.k;
            jac[(1, 1)] = 0.0;
        }
    }

    #[test]
    fn test_fixed_keeps_step_size() {
        let integrator = Fixed::new(Euler::new(Conversion { k: 1.0 }));
        let step = integrator.step(0.0, &Vector2::new(1.0, 0.0), 0.1).unwrap();
        assert_eq!(step.h_next, 0.1);
        assert_eq!(step.rejected, 0);
        assert_eq!(step.evals, 1);
        assert_relative_eq!(step.y[0], 0.9);
        assert_relative_eq!(step.y[1], 0.1);
    }

    #[test]
    fn test_fixed_reports_non_finite_state() {
        struct Blowup;
        impl DerivativeModel<Vector1<f64>> for Blowup {
            fn system(&self, _x: f64, _y: &Vector1<f64>, dy: &mut Vector1<f64>) {
                dy[0] = f64::NAN;
            }

            fn initial(&self) -> (f64, Vector1<f64>) {
                (0.0, Vector1::new(1.0))
            }

            fn is_final(&self, _x: f64, _y: &Vector1<f64>) -> bool {
                false
            }
        }

        let err = Fixed::new(Euler::new(Blowup))
            .step(0.0, &Vector1::new(1.0), 0.5)
            .unwrap_err();
        assert_eq!(err, IntegrationError::NonFiniteState { x: 0.5 });
    }

    #[test]
    fn test_adaptive_bounds_fractional_change() {
        let integrator = Adaptive::new(Rk4::new(Conversion { k: 1.0 }));
        let step = integrator.step(0.0, &Vector2::new(1.0, 0.0), 1.0).unwrap();
        // rmax * min((1 + thres) / 1, (0 + thres) / 1)
        assert_relative_eq!(step.h_next, 1.0e-3 * 1.0e-4, max_relative = 1e-12);
        assert_eq!(step.rejected, 0);
        assert_eq!(step.evals, 5);
    }

    #[test]
    fn test_adaptive_limits_growth() {
        let integrator = Adaptive::new(Rk4::new(Conversion { k: 1.0 }));
        let step = integrator.step(0.0, &Vector2::new(0.5, 0.5), 1.0e-6).unwrap();
        assert_relative_eq!(step.h_next, 2.0e-6);
        assert_relative_eq!(step.x, 2.0e-6);
    }

    #[test]
    fn test_adaptive_halves_until_non_negative() {
        let settings = AdaptiveSettings {
            rmax: 10.0,
            thres: 0.0,
            ..AdaptiveSettings::explicit()
        };
        let integrator = Adaptive::from_param(Euler::new(Drain { y0: 1.0 }), settings).unwrap();
        // the estimate is 10, capped at 2 h = 8, then halved to 1
        let step = integrator.step(0.0, &Vector1::new(1.0), 4.0).unwrap();
        assert_eq!(step.rejected, 3);
        assert_relative_eq!(step.h_next, 1.0);
        assert_relative_eq!(step.y[0], 0.0);
        assert_eq!(step.evals, 1 + 4);
    }

    #[test]
    fn test_adaptive_gives_up_after_max_halvings() {
        let settings = AdaptiveSettings {
            max_halvings: 20,
            ..AdaptiveSettings::explicit()
        };
        let integrator = Adaptive::from_param(Euler::new(Drain { y0: 0.0 }), settings).unwrap();
        let err = integrator.step(0.0, &Vector1::new(0.0), 1.0).unwrap_err();
        assert_eq!(
            err,
            IntegrationError::MaxRetriesReached {
                x: 0.0,
                retries: 20
            }
        );
    }

    #[test]
    fn test_adaptive_respects_minimum_step() {
        let settings = AdaptiveSettings {
            h_min: 1.0e-9,
            ..AdaptiveSettings::explicit()
        };
        let integrator = Adaptive::from_param(Euler::new(Drain { y0: 0.0 }), settings).unwrap();
        let err = integrator.step(0.0, &Vector1::new(0.0), 1.0).unwrap_err();
        assert_eq!(err, IntegrationError::StepSizeUnderflow { x: 0.0 });
    }

    #[test]
    fn test_adaptive_rejects_negative_step_estimate() {
        let integrator = Adaptive::new(Euler::new(Conversion { k: 1.0 }));
        let err = integrator
            .step(0.0, &Vector2::new(-1.0, 0.0), 1.0)
            .unwrap_err();
        assert_eq!(err, IntegrationError::StepSizeUnderflow { x: 0.0 });
    }

    #[test]
    fn test_invalid_settings() {
        let settings = AdaptiveSettings {
            rmax: 0.0,
            ..AdaptiveSettings::implicit()
        };
        assert!(matches!(
            AdaptiveImplicit::from_param(Conversion { k: 1.0 }, settings),
            Err(IntegrationError::InvalidParameter { name: "rmax", .. })
        ));
    }

    #[test]
    fn test_adaptive_implicit_grows_step() {
        let integrator = AdaptiveImplicit::new(Conversion { k: 1.0 });
        let y = Vector2::new(0.5, 0.5);
        let step = integrator.step(0.0, &y, 1.0e-3).unwrap();
        assert_eq!(step.rejected, 0);
        assert_eq!(step.evals, 1);
        assert_relative_eq!(step.x, 1.0e-3);
        assert_relative_eq!(step.y.sum(), 1.0, max_relative = 1e-14);
        assert_relative_eq!(step.h_next, 2.0e-3);
    }

    #[test]
    fn test_adaptive_implicit_halves_until_product_is_resolved() {
        // the empty product species only accepts a step once its growth is below thres / 49
        let integrator = AdaptiveImplicit::new(Conversion { k: 1.0 });
        let y = Vector2::new(1.0, 0.0);
        let step = integrator.step(0.0, &y, 1.0).unwrap();
        assert_eq!(step.rejected, 46);
        assert_eq!(step.x, 2.0_f64.powi(-46));
        assert!(step.y.iter().all(|v| *v >= 0.0));
        assert!(step.h_next < step.x);
    }

    #[test]
    fn test_adaptive_implicit_bounded_retries() {
        let settings = AdaptiveSettings {
            max_halvings: 10,
            ..AdaptiveSettings::implicit()
        };
        let integrator = AdaptiveImplicit::from_param(Drain { y0: 0.0 }, settings).unwrap();
        let err = integrator.step(0.0, &Vector1::new(0.0), 1.0).unwrap_err();
        assert_eq!(
            err,
            IntegrationError::MaxRetriesReached {
                x: 0.0,
                retries: 10
            }
        );
    }

    #[test]
    fn test_settings_serde() {
        let settings = AdaptiveSettings::implicit();
        let json = serde_json::to_string(&settings).unwrap();
        let back: AdaptiveSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
