//! Lane-Emden equation of a polytropic star.
//!
//! With `θ` the scaled density and `ξ` the scaled radius the equation reads
//! `θ'' + 2θ'/ξ + θⁿ = 0`, `θ(0) = 1`, `θ'(0) = 0`. It is integrated as the first-order
//! system `y = (θ, θ')` until the density reaches zero, i.e. the surface of the star.

use crate::constants::model::{DEFAULT_X_MAX, MAX_POLYTROPIC_INDEX, ZERO_RADIUS};
use crate::controller::Fixed;
use crate::driver::run;
use crate::euler::{Euler, ImprovedEuler};
use crate::rk4::Rk4;
use crate::step_shared::{DerivativeModel, IntegrationError, JacobianModel, Trajectory};
use crate::{DMatrix, Vector2};

use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// State of the Lane-Emden system: scaled density `θ` and its derivative `dθ/dξ`.
pub type LaneEmdenState = Vector2<f64>;

/// Parameters of a Lane-Emden model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneEmdenConfig {
    /// Polytropic index.
    pub n: f64,
    /// Scaled radius after which the integration stops even if the surface was not reached.
    pub x_max: Option<f64>,
}

impl Default for LaneEmdenConfig {
    fn default() -> Self {
        LaneEmdenConfig {
            n: 1.0,
            x_max: Some(DEFAULT_X_MAX),
        }
    }
}

/// Lane-Emden model for a given polytropic index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneEmden {
    n: f64,
    x_max: Option<f64>,
}

impl LaneEmden {
    /// Model of index `n`, cut off at the default maximum radius.
    pub fn new(n: f64) -> Result<Self, IntegrationError> {
        Self::from_config(LaneEmdenConfig {
            n,
            ..LaneEmdenConfig::default()
        })
    }

    /// Validates the configuration and builds the model.
    ///
    /// Without a cutoff radius the index must stay below 5, since for larger indices the
    /// density never reaches zero.
    pub fn from_config(config: LaneEmdenConfig) -> Result<Self, IntegrationError> {
        let LaneEmdenConfig { n, x_max } = config;
        if !(n >= 0.0 && n.is_finite()) {
            return Err(IntegrationError::InvalidParameter { name: "n", value: n });
        }
        match x_max {
            Some(x_max) if !(x_max > 0.0 && x_max.is_finite()) => {
                return Err(IntegrationError::InvalidParameter {
                    name: "x_max",
                    value: x_max,
                })
            }
            None if n >= MAX_POLYTROPIC_INDEX => {
                return Err(IntegrationError::InvalidParameter {
                    name: "x_max",
                    value: f64::INFINITY,
                })
            }
            _ => {}
        }
        Ok(LaneEmden { n, x_max })
    }

    pub fn n(&self) -> f64 {
        self.n
    }

    pub fn x_max(&self) -> Option<f64> {
        self.x_max
    }

    /// The index as an `i32` exponent, if it is a whole number that fits.
    fn integer_index(&self) -> Option<i32> {
        if self.n.fract() == 0.0 && self.n <= i32::MAX as f64 {
            Some(self.n as i32)
        } else {
            None
        }
    }

    /// `θⁿ`. Negative densities only show up in intermediate stages past the surface; for
    /// non-integer indices they contribute nothing.
    fn density_power(&self, theta: f64) -> f64 {
        if let Some(n) = self.integer_index() {
            theta.powi(n)
        } else if self.n.fract() == 0.0 || theta > 0.0 {
            theta.powf(self.n)
        } else {
            0.0
        }
    }

    /// `d(θⁿ)/dθ`.
    fn density_power_derivative(&self, theta: f64) -> f64 {
        if self.n == 0.0 {
            0.0
        } else if let Some(n) = self.integer_index() {
            self.n * theta.powi(n - 1)
        } else if self.n.fract() == 0.0 || theta > 0.0 {
            self.n * theta.powf(self.n - 1.0)
        } else {
            0.0
        }
    }

    /// Integrates the model with a fixed step.
    pub fn solve(&self, method: Method, h: f64) -> Result<Trajectory<LaneEmdenState>, IntegrationError> {
        match method {
            Method::Euler => run(Fixed::new(Euler::new(self)), h),
            Method::ImprovedEuler => run(Fixed::new(ImprovedEuler::new(self)), h),
            Method::RungeKutta4 => run(Fixed::new(Rk4::new(self)), h),
        }
    }
}

impl DerivativeModel<LaneEmdenState> for LaneEmden {
    fn system(&self, x: f64, y: &LaneEmdenState, dy: &mut LaneEmdenState) {
        // The limit of 2θ'/ξ at the centre is zero since θ'(0) = 0
        if x.abs() < ZERO_RADIUS {
            dy[0] = 0.0;
            dy[1] = 0.0;
            return;
        }
        dy[0] = y[1];
        dy[1] = -2.0 * y[1] / x - self.density_power(y[0]);
    }

    fn initial(&self) -> (f64, LaneEmdenState) {
        (0.0, Vector2::new(1.0, 0.0))
    }

    fn is_final(&self, x: f64, y: &LaneEmdenState) -> bool {
        y[0] <= 0.0 || self.x_max.map_or(false, |x_max| x > x_max)
    }
}

impl JacobianModel<LaneEmdenState> for LaneEmden {
    fn jacobian(&self, x: f64, y: &LaneEmdenState, jac: &mut DMatrix<f64>) {
        jac.fill(0.0);
        if x.abs() < ZERO_RADIUS {
            return;
        }
        jac[(0, 1)] = 1.0;
        jac[(1, 0)] = -self.density_power_derivative(y[0]);
        jac[(1, 1)] = -2.0 / x;
    }
}

/// Converts a literal; every `Float` type can represent the constants used here.
fn lit<T: Float>(v: f64) -> T {
    T::from(v).unwrap_or_else(T::nan)
}

/// Exact density `θ(ξ)` for the indices with a closed-form solution (0, 1 and 5).
pub fn exact<T: Float>(x: T, n: f64) -> Result<T, IntegrationError> {
    let one = T::one();
    if n == 0.0 {
        Ok(one - x * x / lit(6.0))
    } else if n == 1.0 {
        // sin(ξ)/ξ tends to 1 at the centre
        if x.is_zero() {
            Ok(one)
        } else {
            Ok(x.sin() / x)
        }
    } else if n == 5.0 {
        Ok((one + x * x / lit(3.0)).powf(lit(-0.5)))
    } else {
        Err(IntegrationError::UnsupportedPolytropicIndex { n })
    }
}

/// Exact density derivative `dθ/dξ` for the indices 0, 1 and 5.
pub fn exact_derivative<T: Float>(x: T, n: f64) -> Result<T, IntegrationError> {
    let one = T::one();
    if n == 0.0 {
        Ok(-x / lit(3.0))
    } else if n == 1.0 {
        if x.is_zero() {
            Ok(T::zero())
        } else {
            Ok((x * x.cos() - x.sin()) / (x * x))
        }
    } else if n == 5.0 {
        Ok(-x / lit(3.0) * (one + x * x / lit(3.0)).powf(lit(-1.5)))
    } else {
        Err(IntegrationError::UnsupportedPolytropicIndex { n })
    }
}

/// Radius of the surface and density derivative there, `(ξ₁, θ'(ξ₁))`.
///
/// Only the indices 0 and 1 have a closed-form surface; the star of index 5 has none.
pub fn exact_surface(n: f64) -> Result<(f64, f64), IntegrationError> {
    if n == 0.0 {
        let xi1 = 6.0_f64.sqrt();
        Ok((xi1, -xi1 / 3.0))
    } else if n == 1.0 {
        Ok((PI, -1.0 / PI))
    } else {
        Err(IntegrationError::UnsupportedPolytropicIndex { n })
    }
}

/// Fixed-step methods used to integrate the equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Euler,
    ImprovedEuler,
    RungeKutta4,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Euler, Method::ImprovedEuler, Method::RungeKutta4];

    pub fn name(&self) -> &'static str {
        match self {
            Method::Euler => "Euler",
            Method::ImprovedEuler => "Improved Euler",
            Method::RungeKutta4 => "Runge-Kutta",
        }
    }
}

/// Integrates the Lane-Emden equation of index `n` with step `h`.
pub fn solve(n: f64, h: f64, method: Method) -> Result<Trajectory<LaneEmdenState>, IntegrationError> {
    LaneEmden::new(n)?.solve(method, h)
}

/// Surface of the star as found by a method, or exactly when `method` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceValues {
    pub method: Option<Method>,
    pub h: f64,
    pub x_surface: f64,
    pub density_derivative_surface: f64,
}

impl SurfaceValues {
    /// Label of the row, "Exact" for the closed-form values.
    pub fn label(&self) -> &'static str {
        self.method.map_or("Exact", |m| m.name())
    }
}

/// Last point with positive density of a solution whose density crossed zero.
///
/// Fails with `SurfaceNotReached` when the run was stopped by the cutoff radius instead.
pub fn surface_point(
    trajectory: &Trajectory<LaneEmdenState>,
) -> Result<(f64, &LaneEmdenState), IntegrationError> {
    let (x_end, y_end) = trajectory
        .terminal()
        .ok_or(IntegrationError::SurfaceNotReached { x: 0.0 })?;
    if y_end[0] > 0.0 {
        return Err(IntegrationError::SurfaceNotReached { x: x_end });
    }
    trajectory
        .last()
        .ok_or(IntegrationError::SurfaceNotReached { x: x_end })
}

/// Last point with positive density reached by `method` with step `h`.
pub fn surface_values(method: Method, n: f64, h: f64) -> Result<SurfaceValues, IntegrationError> {
    let trajectory = solve(n, h, method)?;
    let (x, y) = surface_point(&trajectory)?;
    Ok(SurfaceValues {
        method: Some(method),
        h,
        x_surface: x,
        density_derivative_surface: y[1],
    })
}

/// Closed-form surface values, tagged with the step size they are compared against.
pub fn exact_surface_values(n: f64, h: f64) -> Result<SurfaceValues, IntegrationError> {
    let (x_surface, density_derivative_surface) = exact_surface(n)?;
    Ok(SurfaceValues {
        method: None,
        h,
        x_surface,
        density_derivative_surface,
    })
}

/// Surface values of every method for every step size, each group followed by the exact row.
pub fn surface_table(n: f64, steps: &[f64]) -> Result<Vec<SurfaceValues>, IntegrationError> {
    let mut rows = Vec::with_capacity(steps.len() * (Method::ALL.len() + 1));
    for &h in steps {
        for method in Method::ALL {
            rows.push(surface_values(method, n, h)?);
        }
        rows.push(exact_surface_values(n, h)?);
    }
    Ok(rows)
}
