//! Numerical thresholds, controller defaults and physical constants.

/// Thresholds used by the derivative models.
pub mod model {
    /// Below this radius the Lane-Emden right-hand side is replaced by its limit at the centre.
    pub const ZERO_RADIUS: f64 = 1.0e-50;

    /// Upper bound of the scaled radius used when none is configured.
    pub const DEFAULT_X_MAX: f64 = 10.0;

    /// Without a cutoff radius the polytropic index must stay below this value.
    pub const MAX_POLYTROPIC_INDEX: f64 = 5.0;

    /// Time after which the reaction network stops when none is configured [s].
    pub const DEFAULT_T_MAX: f64 = 1.0e12;

    /// Initial helium mole fraction of the reaction network (pure helium).
    pub const DEFAULT_HELIUM: f64 = 0.25;

    /// Free-fall time scale factor: the expansion time is `446 / sqrt(ρ)` seconds.
    pub const FREE_FALL_FACTOR: f64 = 446.0;
}

/// Adaptive step size control.
pub mod adaptive {
    /// Added to the magnitude of the rate of change so components at rest never divide by zero.
    pub const DIVISION_GUARD: f64 = 1.0e-99;

    /// Maximum factor between two successive steps.
    pub const MAX_GROWTH: f64 = 2.0;

    /// Fractional change allowed per step by the explicit controller.
    pub const EXPLICIT_RMAX: f64 = 1.0e-3;

    /// Abundance floor of the explicit controller.
    pub const EXPLICIT_THRES: f64 = 1.0e-4;

    /// Fractional change allowed per step by the implicit controller.
    pub const IMPLICIT_RMAX: f64 = 1.0e-2;

    /// Abundance floor of the implicit controller.
    pub const IMPLICIT_THRES: f64 = 1.0e-12;

    /// The implicit controller rejects a step whose follow-up step would shrink below this fraction.
    pub const IMPLICIT_MIN_RATIO: f64 = 0.5;

    /// Consecutive halvings before a step is given up.
    pub const MAX_HALVINGS: u32 = 200;
}

/// Integration driver.
pub mod driver {
    /// Maximum number of accepted steps in one run.
    pub const MAX_STEPS: usize = 10_000_000;
}

/// Physical constants in SI units (CODATA 2014, IAU 2015 nominal solar values).
pub mod physics {
    /// Newtonian constant of gravitation [m^3 kg^-1 s^-2]
    pub const G: f64 = 6.674_08e-11;

    /// Atomic mass unit [kg]
    pub const ATOMIC_MASS_UNIT: f64 = 1.660_539_04e-27;

    /// Boltzmann constant [J K^-1]
    pub const BOLTZMANN: f64 = 1.380_648_52e-23;

    /// Solar mass derived from the nominal solar mass parameter GM = 1.3271244e20 m^3 s^-2 [kg]
    pub const SOLAR_MASS: f64 = 1.327_124_4e20 / G;
}
