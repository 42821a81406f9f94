//! Helium burning network `3 ⁴He ↔ ¹²C`, `2 ¹²C ↔ ²⁴Mg`.
//!
//! The state holds the mole fractions `Y = (Y_He, Y_C, Y_Mg)`. The mass fractions
//! `X_i = A_i Y_i` sum to one and stay so along the whole integration, since both
//! reactions conserve baryon number.

use crate::constants::model::{DEFAULT_HELIUM, DEFAULT_T_MAX, FREE_FALL_FACTOR};
use crate::rates::{carbon_fusion, triple_alpha, ReactionRates};
use crate::step_shared::{DerivativeModel, IntegrationError, JacobianModel, Trajectory};
use crate::{DMatrix, Vector3};

use serde::{Deserialize, Serialize};

/// Species of the network, in state vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Helium,
    Carbon,
    Magnesium,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Helium, Species::Carbon, Species::Magnesium];

    /// Position in the state vector.
    pub fn index(self) -> usize {
        match self {
            Species::Helium => 0,
            Species::Carbon => 1,
            Species::Magnesium => 2,
        }
    }

    /// Mass number `A`.
    pub fn mass_number(self) -> f64 {
        match self {
            Species::Helium => 4.0,
            Species::Carbon => 12.0,
            Species::Magnesium => 24.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Species::Helium => "He4",
            Species::Carbon => "C12",
            Species::Magnesium => "Mg24",
        }
    }
}

/// Mole fractions of the three species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Abundances {
    pub helium: f64,
    pub carbon: f64,
    pub magnesium: f64,
}

impl Abundances {
    pub fn new(helium: f64, carbon: f64, magnesium: f64) -> Self {
        Abundances {
            helium,
            carbon,
            magnesium,
        }
    }

    pub fn get(&self, species: Species) -> f64 {
        match species {
            Species::Helium => self.helium,
            Species::Carbon => self.carbon,
            Species::Magnesium => self.magnesium,
        }
    }

    /// Mass fractions `A_i Y_i`, in the same layout.
    pub fn mass_fractions(&self) -> Abundances {
        Abundances::from(&mass_fractions(&Vector3::from(*self)))
    }

    /// Sum of the mass fractions, one for a complete composition.
    pub fn total_mass_fraction(&self) -> f64 {
        total_mass_fraction(&Vector3::from(*self))
    }
}

impl Default for Abundances {
    fn default() -> Self {
        Abundances::new(DEFAULT_HELIUM, 0.0, 0.0)
    }
}

impl From<Abundances> for Vector3<f64> {
    fn from(a: Abundances) -> Self {
        Vector3::new(a.helium, a.carbon, a.magnesium)
    }
}

impl From<&Vector3<f64>> for Abundances {
    fn from(y: &Vector3<f64>) -> Self {
        Abundances::new(
            y[Species::Helium.index()],
            y[Species::Carbon.index()],
            y[Species::Magnesium.index()],
        )
    }
}

/// Mass fractions of a state.
pub fn mass_fractions(y: &Vector3<f64>) -> Vector3<f64> {
    Vector3::from_fn(|i, _| y[i] * Species::ALL[i].mass_number())
}

/// Sum of the mass fractions of a state.
pub fn total_mass_fraction(y: &Vector3<f64>) -> f64 {
    mass_fractions(y).sum()
}

/// Mass fractions of every accepted point of a run.
pub fn mass_fraction_history(trajectory: &Trajectory<Vector3<f64>>) -> Vec<Vector3<f64>> {
    trajectory.y().iter().map(mass_fractions).collect()
}

/// Temperature and density history seen by the network.
pub trait Thermodynamics {
    /// Scaled temperature `T9` and density at time `t`.
    fn conditions(&self, t: f64) -> (f64, f64);
}

impl<H: Thermodynamics + ?Sized> Thermodynamics for &H {
    fn conditions(&self, t: f64) -> (f64, f64) {
        (**self).conditions(t)
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), IntegrationError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(IntegrationError::InvalidParameter { name, value })
    }
}

/// Burning at fixed temperature and density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantConditions {
    t9: f64,
    rho: f64,
}

impl ConstantConditions {
    pub fn new(t9: f64, rho: f64) -> Result<Self, IntegrationError> {
        check_positive("t9", t9)?;
        check_positive("rho", rho)?;
        Ok(ConstantConditions { t9, rho })
    }

    pub fn t9(&self) -> f64 {
        self.t9
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }
}

impl Thermodynamics for ConstantConditions {
    fn conditions(&self, _t: f64) -> (f64, f64) {
        (self.t9, self.rho)
    }
}

/// Adiabatic free expansion from peak conditions.
///
/// The matter expands on the free-fall time scale `τ = 446 / sqrt(ρ_p)` s, so
/// `T9 = T9_p exp(-t / 3τ)` and `ρ = ρ_p exp(-t / τ)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeExpansion {
    tp: f64,
    rhop: f64,
    tau3i: f64,
}

impl FreeExpansion {
    /// # Arguments
    ///
    /// * `tp`      - Peak scaled temperature `T9_p`
    /// * `rhop`    - Peak density [g/cm³]
    ///
    pub fn new(tp: f64, rhop: f64) -> Result<Self, IntegrationError> {
        check_positive("tp", tp)?;
        check_positive("rhop", rhop)?;
        Ok(FreeExpansion {
            tp,
            rhop,
            tau3i: -1.0 / (3.0 * FREE_FALL_FACTOR * rhop.powf(-0.5)),
        })
    }

    pub fn peak_t9(&self) -> f64 {
        self.tp
    }

    pub fn peak_rho(&self) -> f64 {
        self.rhop
    }
}

impl Thermodynamics for FreeExpansion {
    fn conditions(&self, t: f64) -> (f64, f64) {
        let f = (t * self.tau3i).exp();
        (self.tp * f, self.rhop * f.powi(3))
    }
}

/// Run parameters of the network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Time after which the integration stops [s].
    pub t_max: f64,
    /// Initial mole fractions.
    pub y0: Abundances,
    /// The integration also stops once the temperature falls below this value.
    pub t9_min: Option<f64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            t_max: DEFAULT_T_MAX,
            y0: Abundances::default(),
            t9_min: None,
        }
    }
}

/// Reaction network driven by a thermodynamic history.
#[derive(Debug, Clone)]
pub struct Network<H = ConstantConditions> {
    thermo: H,
    t_max: f64,
    y0: Vector3<f64>,
    t9_min: Option<f64>,
}

impl Network<ConstantConditions> {
    /// Network at constant `t9` and `rho`, starting from pure helium and running up to `t_max`.
    pub fn new(t9: f64, rho: f64, t_max: f64) -> Result<Self, IntegrationError> {
        Network::from_config(
            ConstantConditions::new(t9, rho)?,
            NetworkConfig {
                t_max,
                ..NetworkConfig::default()
            },
        )
    }
}

impl<H: Thermodynamics> Network<H> {
    pub fn from_config(thermo: H, config: NetworkConfig) -> Result<Self, IntegrationError> {
        check_positive("t_max", config.t_max)?;
        for species in Species::ALL {
            let y = config.y0.get(species);
            if !(y >= 0.0 && y.is_finite()) {
                return Err(IntegrationError::InvalidParameter {
                    name: "y0",
                    value: y,
                });
            }
        }
        if let Some(t9_min) = config.t9_min {
            check_positive("t9_min", t9_min)?;
        }
        Ok(Network {
            thermo,
            t_max: config.t_max,
            y0: config.y0.into(),
            t9_min: config.t9_min,
        })
    }

    pub fn thermo(&self) -> &H {
        &self.thermo
    }

    pub fn t_max(&self) -> f64 {
        self.t_max
    }

    /// Rates of the triple-alpha reaction and of carbon fusion at time `t`.
    pub fn rates(&self, t: f64) -> (ReactionRates, ReactionRates) {
        let (t9, rho) = self.thermo.conditions(t);
        (triple_alpha(t9, rho), carbon_fusion(t9, rho))
    }
}

impl<H: Thermodynamics> DerivativeModel<Vector3<f64>> for Network<H> {
    fn system(&self, t: f64, y: &Vector3<f64>, dy: &mut Vector3<f64>) {
        let (alpha, carbon) = self.rates(t);
        let (fa, ra) = (alpha.forward, alpha.reverse);
        let (fc, rc) = (carbon.forward, carbon.reverse);

        let y_a = y[Species::Helium.index()];
        let y_c = y[Species::Carbon.index()];
        let y_mg = y[Species::Magnesium.index()];
        let y_a3 = y_a.powi(3);

        dy[Species::Helium.index()] = -0.5 * fa * y_a3 + 3.0 * ra * y_c;
        dy[Species::Carbon.index()] =
            fa * y_a3 / 6.0 - fc * y_c * y_c - ra * y_c + 2.0 * rc * y_mg;
        dy[Species::Magnesium.index()] = 0.5 * fc * y_c * y_c - rc * y_mg;
    }

    fn initial(&self) -> (f64, Vector3<f64>) {
        (0.0, self.y0)
    }

    fn is_final(&self, t: f64, _y: &Vector3<f64>) -> bool {
        if t > self.t_max {
            return true;
        }
        match self.t9_min {
            Some(t9_min) => self.thermo.conditions(t).0 < t9_min,
            None => false,
        }
    }
}

impl<H: Thermodynamics> JacobianModel<Vector3<f64>> for Network<H> {
    fn jacobian(&self, t: f64, y: &Vector3<f64>, jac: &mut DMatrix<f64>) {
        let (alpha, carbon) = self.rates(t);
        let (fa, ra) = (alpha.forward, alpha.reverse);
        let (fc, rc) = (carbon.forward, carbon.reverse);

        let (he, c, mg) = (
            Species::Helium.index(),
            Species::Carbon.index(),
            Species::Magnesium.index(),
        );
        let y_a2 = y[he] * y[he];
        let y_c = y[c];

        jac[(he, he)] = -1.5 * fa * y_a2;
        jac[(he, c)] = 3.0 * ra;
        jac[(he, mg)] = 0.0;

        jac[(c, he)] = 0.5 * fa * y_a2;
        jac[(c, c)] = -2.0 * fc * y_c - ra;
        jac[(c, mg)] = 2.0 * rc;

        jac[(mg, he)] = 0.0;
        jac[(mg, c)] = fc * y_c;
        jac[(mg, mg)] = -rc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn derivative<H: Thermodynamics>(network: &Network<H>, t: f64, y: &Vector3<f64>) -> Vector3<f64> {
        let mut dy = Vector3::zeros();
        network.system(t, y, &mut dy);
        dy
    }

    #[test]
    fn test_species_layout() {
        for (i, species) in Species::ALL.iter().enumerate() {
            assert_eq!(species.index(), i);
        }
        let a = Abundances::from(&Vector3::new(0.1, 0.2, 0.3));
        assert_eq!(a.get(Species::Carbon), 0.2);
        assert_eq!(Vector3::from(a), Vector3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn test_mass_fractions() {
        let a = Abundances::default();
        assert_eq!(a.mass_fractions(), Abundances::new(1.0, 0.0, 0.0));
        assert_eq!(a.total_mass_fraction(), 1.0);

        let y = Vector3::new(0.1, 0.025, 0.0);
        assert_relative_eq!(mass_fractions(&y), Vector3::new(0.4, 0.3, 0.0));
        assert_relative_eq!(total_mass_fraction(&y), 0.7);
    }

    #[test]
    fn test_derivative_of_pure_helium() {
        let network = Network::new(1.0, 1.0, 1.0e12).unwrap();
        let dy = derivative(&network, 0.0, &Vector3::new(0.25, 0.0, 0.0));
        let fa = triple_alpha(1.0, 1.0).forward;
        assert_relative_eq!(dy[0], -0.5 * fa * 0.25_f64.powi(3), max_relative = 1e-14);
        assert_relative_eq!(dy[1], fa * 0.25_f64.powi(3) / 6.0, max_relative = 1e-14);
        assert_eq!(dy[2], 0.0);
    }

    #[test]
    fn test_derivative_conserves_mass() {
        let network = Network::new(2.3, 1.0e3, 1.0e12).unwrap();
        let y = Vector3::new(0.1, 0.03, 0.02);
        let dy = derivative(&network, 0.0, &y);
        let scale = dy.abs().max();
        assert!(total_mass_fraction(&dy).abs() < 1e-12 * scale * 24.0);
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let network = Network::new(2.0, 1.0e4, 1.0e12).unwrap();
        let y = Vector3::new(0.1, 0.03, 0.02);
        let mut jac = DMatrix::zeros(3, 3);
        network.jacobian(0.0, &y, &mut jac);

        for j in 0..3 {
            let eps = 1.0e-6 * y[j];
            let mut up = y;
            let mut down = y;
            up[j] += eps;
            down[j] -= eps;
            let column =
                (derivative(&network, 0.0, &up) - derivative(&network, 0.0, &down)) / (2.0 * eps);
            for i in 0..3 {
                // reverse rates are many orders below the forward ones; compare per row
                let row_scale = jac.row(i).amax();
                assert!(
                    (jac[(i, j)] - column[i]).abs() <= 1e-6 * row_scale,
                    "({i}, {j}): {} vs {}",
                    jac[(i, j)],
                    column[i]
                );
            }
        }
    }

    #[test]
    fn test_free_expansion() {
        let thermo = FreeExpansion::new(10.0, 1.0e6).unwrap();
        assert_eq!(thermo.conditions(0.0), (10.0, 1.0e6));

        // τ = 446 / sqrt(1e6) = 0.446 s
        let (t9, rho) = thermo.conditions(3.0 * 0.446);
        assert_relative_eq!(t9, 10.0 / std::f64::consts::E, max_relative = 1e-12);
        assert_relative_eq!(rho, 1.0e6 * (-3.0_f64).exp(), max_relative = 1e-12);

        let (t9, rho) = thermo.conditions(0.7);
        assert_relative_eq!(rho, 1.0e6 * (t9 / 10.0).powi(3), max_relative = 1e-12);
    }

    #[test]
    fn test_termination() {
        let network = Network::new(1.0, 1.0, 100.0).unwrap();
        let y = Vector3::new(0.25, 0.0, 0.0);
        assert!(!network.is_final(100.0, &y));
        assert!(network.is_final(100.5, &y));

        let config = NetworkConfig {
            t_max: 1.0e25,
            t9_min: Some(1.0e-2),
            ..NetworkConfig::default()
        };
        let network = Network::from_config(FreeExpansion::new(10.0, 1.0e6).unwrap(), config).unwrap();
        assert!(!network.is_final(1.0, &y));
        // T9 falls below 0.01 after 3 τ ln(1000) ≈ 9.24 s
        assert!(network.is_final(9.3, &y));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            Network::new(0.0, 1.0, 1.0),
            Err(IntegrationError::InvalidParameter { name: "t9", .. })
        ));
        assert!(Network::new(1.0, -1.0, 1.0).is_err());
        assert!(Network::new(1.0, 1.0, f64::NAN).is_err());
        assert!(FreeExpansion::new(10.0, 0.0).is_err());

        let config = NetworkConfig {
            y0: Abundances::new(-0.1, 0.0, 0.0),
            ..NetworkConfig::default()
        };
        assert!(matches!(
            Network::from_config(ConstantConditions::new(1.0, 1.0).unwrap(), config),
            Err(IntegrationError::InvalidParameter { name: "y0", .. })
        ));
    }

    #[test]
    fn test_config_serde() {
        let json = r#"{"t_max": 1e21, "y0": {"helium": 0.25, "carbon": 0.0, "magnesium": 0.0}, "t9_min": null}"#;
        let config: NetworkConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.t_max, 1.0e21);
        assert_eq!(config.y0, Abundances::default());
        assert_eq!(config.t9_min, None);
    }
}
