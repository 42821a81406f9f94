//! Structure of a polytropic star built from a Lane-Emden solution.
//!
//! With `ρ = ρ_c θⁿ`, `P = K ρ^γ`, `γ = 1 + 1/n` and `r = α ξ`, the length scale `α` follows
//! from the stellar mass and the surface values of the Lane-Emden solution. Temperatures
//! come from the ideal gas law `P = ρ k_B T / (μ m_u)`.

use crate::constants::physics::{ATOMIC_MASS_UNIT, BOLTZMANN, G, SOLAR_MASS};
use crate::lane_emden::{surface_point, LaneEmden, Method};
use crate::step_shared::IntegrationError;

use log::info;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Parameters of the stellar model, in SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StarParameters {
    /// Polytropic index `n`.
    pub polytropic_index: f64,
    /// Step in scaled radius used to integrate the Lane-Emden equation.
    pub step_size: f64,
    /// Mass of the star [kg].
    pub stellar_mass: f64,
    /// Density at the centre of the star [kg/m³].
    pub central_density: f64,
    /// Mean molecular weight `μ`.
    pub mean_molecular_weight: f64,
}

impl Default for StarParameters {
    fn default() -> Self {
        StarParameters {
            polytropic_index: 3.0,
            step_size: 0.001,
            stellar_mass: 2.0 * SOLAR_MASS,
            central_density: 1.0e5,
            mean_molecular_weight: 1.4,
        }
    }
}

impl StarParameters {
    fn validate(&self) -> Result<(), IntegrationError> {
        let checks = [
            ("polytropic_index", self.polytropic_index),
            ("stellar_mass", self.stellar_mass),
            ("central_density", self.central_density),
            ("mean_molecular_weight", self.mean_molecular_weight),
        ];
        for (name, value) in checks {
            if !(value > 0.0 && value.is_finite()) {
                return Err(IntegrationError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Profile of the star from the centre to the surface.
///
/// All vectors have one entry per accepted point of the Lane-Emden solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StellarProfile {
    /// Length scale `α` [m].
    pub alpha: f64,
    /// Polytropic constant `K`.
    pub k: f64,
    /// Polytropic exponent `γ`.
    pub gamma: f64,
    /// Pressure at the centre [Pa].
    pub central_pressure: f64,
    /// Distance from the centre [m].
    pub radii: Vec<f64>,
    /// Temperature [K].
    pub temperatures: Vec<f64>,
    /// Pressure [Pa].
    pub pressures: Vec<f64>,
    /// Density [kg/m³].
    pub densities: Vec<f64>,
}

/// Length scale `α = (M / (4π ρ_c (-ξ₁² θ'(ξ₁))))^(1/3)`.
pub fn find_alpha(xi1: f64, dtheta_dxi_at_xi1: f64, stellar_mass: f64, central_density: f64) -> f64 {
    let a = -(xi1 * xi1) * dtheta_dxi_at_xi1;
    (stellar_mass / (4.0 * PI * central_density * a)).powf(1.0 / 3.0)
}

/// Polytropic constant `K = 4π G α² / ((n + 1) ρ_c^(1/n - 1))`.
pub fn find_k(alpha: f64, polytropic_index: f64, central_density: f64) -> f64 {
    let n = polytropic_index;
    alpha * alpha * 4.0 * PI * G / (n + 1.0) / central_density.powf(1.0 / n - 1.0)
}

/// `γ = 1 + 1/n`.
pub fn find_gamma(polytropic_index: f64) -> f64 {
    1.0 / polytropic_index + 1.0
}

/// `P_c = K ρ_c^γ`.
pub fn central_pressure(k: f64, central_density: f64, gamma: f64) -> f64 {
    k * central_density.powf(gamma)
}

/// Ideal gas temperature `T = P μ m_u / (ρ k_B)`.
pub fn find_temperature(mean_molecular_weight: f64, pressure: f64, density: f64) -> f64 {
    pressure * mean_molecular_weight * ATOMIC_MASS_UNIT / density / BOLTZMANN
}

/// Integrates the Lane-Emden equation with RK4 and scales it to the physical star.
pub fn calculate_stellar_parameters(params: &StarParameters) -> Result<StellarProfile, IntegrationError> {
    params.validate()?;
    let n = params.polytropic_index;

    let trajectory = LaneEmden::new(n)?.solve(Method::RungeKutta4, params.step_size)?;
    let (xi1, y1) = surface_point(&trajectory)?;

    let alpha = find_alpha(xi1, y1[1], params.stellar_mass, params.central_density);
    let k = find_k(alpha, n, params.central_density);
    let gamma = find_gamma(n);
    let central_pressure = central_pressure(k, params.central_density, gamma);
    info!("polytrope n = {n}: alpha = {alpha:e} m, central pressure = {central_pressure:e} Pa");

    let mut profile = StellarProfile {
        alpha,
        k,
        gamma,
        central_pressure,
        radii: Vec::with_capacity(trajectory.len()),
        temperatures: Vec::with_capacity(trajectory.len()),
        pressures: Vec::with_capacity(trajectory.len()),
        densities: Vec::with_capacity(trajectory.len()),
    };

    for (xi, y) in trajectory.iter() {
        let theta = y[0];
        let density = params.central_density * theta.powf(n);
        let pressure = central_pressure * theta.powf(n + 1.0);
        profile.radii.push(alpha * xi);
        profile.densities.push(density);
        profile.pressures.push(pressure);
        profile
            .temperatures
            .push(find_temperature(params.mean_molecular_weight, pressure, density));
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_find_alpha() {
        let alpha = find_alpha(6.896, -0.042440201016223186, 2.0 * SOLAR_MASS, 1.0e5);
        assert_relative_eq!(alpha, 116177708.60712494, max_relative = 1e-12);
    }

    #[test]
    fn test_find_k() {
        let k = find_k(116177708.60712494, 3.0, 1.0e5);
        assert_relative_eq!(k, 6097056608.050699, max_relative = 1e-12);
    }

    #[test]
    fn test_gamma_and_central_pressure() {
        assert_relative_eq!(find_gamma(3.0), 4.0 / 3.0);
        assert_relative_eq!(find_gamma(1.5), 5.0 / 3.0);
        let pc = central_pressure(6097056608.050699, 1.0e5, 4.0 / 3.0);
        assert_relative_eq!(pc, 2.8300029869833104e16, max_relative = 1e-12);
    }

    #[test]
    fn test_calculate_stellar_parameters() {
        let params = StarParameters::default();
        let profile = calculate_stellar_parameters(&params).unwrap();

        assert_relative_eq!(profile.alpha, 116177708.60712494, max_relative = 1e-10);
        assert_relative_eq!(profile.central_pressure, 2.8300029869833104e16, max_relative = 1e-10);
        assert_eq!(profile.radii.len(), 6897);
        assert_eq!(profile.temperatures.len(), profile.radii.len());

        assert_eq!(profile.radii[0], 0.0);
        assert_relative_eq!(profile.densities[0], 1.0e5);
        assert_relative_eq!(profile.pressures[0], profile.central_pressure);
        assert_relative_eq!(profile.temperatures[0], 47651973.15014945, max_relative = 1e-9);
        assert_relative_eq!(
            *profile.radii.last().unwrap(),
            116177708.60712494 * 6.896,
            max_relative = 1e-10
        );

        // the first RK4 step from the centre leaves θ at exactly 1
        assert!(profile.radii[1] > profile.radii[0]);
        assert_eq!(profile.densities[1], profile.densities[0]);
        assert_eq!(profile.pressures[1], profile.pressures[0]);

        // beyond it density, pressure and temperature fall off monotonically
        for i in 2..profile.radii.len() {
            assert!(profile.radii[i] > profile.radii[i - 1]);
            assert!(profile.densities[i] < profile.densities[i - 1]);
            assert!(profile.pressures[i] < profile.pressures[i - 1]);
            assert!(profile.temperatures[i] < profile.temperatures[i - 1]);
        }
    }

    #[test]
    fn test_temperature_follows_density_scale() {
        let params = StarParameters {
            polytropic_index: 1.5,
            step_size: 0.01,
            ..StarParameters::default()
        };
        let profile = calculate_stellar_parameters(&params).unwrap();
        let trajectory = LaneEmden::new(1.5)
            .unwrap()
            .solve(Method::RungeKutta4, 0.01)
            .unwrap();
        // T ∝ P/ρ ∝ θ
        for (i, (_, y)) in trajectory.iter().enumerate().step_by(50) {
            assert_relative_eq!(
                profile.temperatures[i] / profile.temperatures[0],
                y[0],
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn test_no_profile_without_surface() {
        let params = StarParameters {
            polytropic_index: 4.0,
            step_size: 0.01,
            ..StarParameters::default()
        };
        assert!(matches!(
            calculate_stellar_parameters(&params),
            Err(IntegrationError::SurfaceNotReached { x }) if x > 10.0
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let params = StarParameters {
            polytropic_index: 0.0,
            ..StarParameters::default()
        };
        assert!(matches!(
            calculate_stellar_parameters(&params),
            Err(IntegrationError::InvalidParameter {
                name: "polytropic_index",
                ..
            })
        ));

        let params = StarParameters {
            step_size: -0.1,
            ..StarParameters::default()
        };
        assert_eq!(
            calculate_stellar_parameters(&params),
            Err(IntegrationError::InvalidStepSize { h: -0.1 })
        );
    }
}
