//! # Stellar ODE
//! `stellar_ode` is a collection of one-step integrators (Euler, improved Euler, Runge-Kutta 4,
//! semi-implicit Euler) with adaptive step size control, together with the models they were
//! written for: the Lane-Emden equation of polytropic stars and a helium burning reaction network.

// Re-export from external crate
use nalgebra as na;
pub use crate::na::{DMatrix, DVector, OVector, Vector1, Vector2, Vector3};

// Declare modules
pub mod constants;
pub mod controller;
pub mod driver;
pub mod euler;
pub mod implicit;
pub mod lane_emden;
pub mod network;
pub mod rates;
pub mod rk4;
pub mod step_shared;
pub mod stellar_structure;

pub use controller::{Adaptive, AdaptiveImplicit, AdaptiveSettings, Fixed, Integrator, Step};
pub use driver::{run, Driver};
pub use euler::{Euler, ImprovedEuler};
pub use implicit::SemiImplicitEuler;
pub use lane_emden::{LaneEmden, LaneEmdenConfig, Method};
pub use network::{
    Abundances, ConstantConditions, FreeExpansion, Network, NetworkConfig, Species, Thermodynamics,
};
pub use rk4::Rk4;
pub use step_shared::{DerivativeModel, IntegrationError, JacobianModel, Stats, StepMethod, Trajectory};
pub use stellar_structure::{calculate_stellar_parameters, StarParameters, StellarProfile};
