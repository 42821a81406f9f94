//! Reaction rates of the helium burning network.
//!
//! Rates are closed-form fits in the scaled temperature `T9` (temperature in 10⁹ K) and
//! the density `ρ` (g/cm³). Forward rates already carry the density factors and the
//! symmetry factors of identical reactants; reverse rates are photodisintegration rates
//! and do not depend on density.

/// Forward and reverse rate of one reaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionRates {
    pub forward: f64,
    pub reverse: f64,
}

/// Triple-alpha reaction `3 ⁴He ↔ ¹²C` (Q = 7.275 MeV).
pub fn triple_alpha(t9: f64, rho: f64) -> ReactionRates {
    let t9m1 = 1.0 / t9;
    let t9log = t9.ln();
    let t913 = (t9log / 3.0).exp();
    let t9m13 = 1.0 / t913;
    let t953 = t913.powi(5);
    let t93 = t9.powi(3);

    // resonant, non-resonant and high temperature contributions
    let ra3 = (-9.710520e-01 - 3.706000e+01 * t9m13 + 2.934930e+01 * t913
        - 1.155070e+02 * t9
        - 1.000000e+01 * t953
        - 1.333330e+00 * t9log)
        .exp()
        + (-2.435050e+01 - 4.126560e+00 * t9m1 - 1.349000e+01 * t9m13 + 2.142590e+01 * t913
            - 1.347690e+00 * t9
            + 8.798160e-02 * t953
            - 1.316530e+01 * t9log)
            .exp()
        + (-1.178840e+01 - 1.024460e+00 * t9m1 - 2.357000e+01 * t9m13 + 2.048860e+01 * t913
            - 1.298820e+01 * t9
            - 2.000000e+01 * t953
            - 2.166670e+00 * t9log)
            .exp();

    let reverse = 2.00e+20 * t93 * (-84.424 * t9m1).exp();
    ReactionRates {
        forward: ra3 * rho * rho / 6.0,
        reverse: reverse * ra3,
    }
}

/// Carbon fusion `2 ¹²C ↔ ²⁴Mg` (Q = 13.933 MeV).
pub fn carbon_fusion(t9: f64, rho: f64) -> ReactionRates {
    let t9a = t9 / (1.0 + 0.0396 * t9);
    let t9a13 = t9a.powf(1.0 / 3.0);
    let t9a56 = t9a.powf(5.0 / 6.0);
    let t932 = t9.powf(1.5);
    let t9m32 = 1.0 / t932;
    let t9m1 = 1.0 / t9;
    let t93 = t932 * t932;

    let r24 = 4.27e+26 * t9a56 * t9m32 * (-84.165 / t9a13 - 2.12e-03 * t93).exp();
    let reverse = 2.56e10 * t932 * (-161.6858 * t9m1).exp();
    ReactionRates {
        forward: 0.5 * rho * r24,
        reverse: reverse * r24,
    }
}
