// Helium burning 3 He4 <-> C12, 2 C12 <-> Mg24 at constant temperature and in a free expansion.
// The network is stiff, so it is integrated with the adaptive semi-implicit Euler method.

use simplelog::{Config, LevelFilter, SimpleLogger};
use stellar_ode::network::mass_fractions;
use stellar_ode::*;

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

type State = Vector3<f64>;
type Time = f64;

fn main() {
    let _ = SimpleLogger::init(LevelFilter::Info, Config::default());

    // Constant temperature T = 2.1e9 K and density 1 g/cm^3
    let network = Network::new(2.1, 1.0, 1.0e25).expect("valid network parameters");
    let mut driver: Driver<State, _> = Driver::new(AdaptiveImplicit::new(&network), 1.0);
    report(driver.integrate(), &driver, Path::new("./outputs/network_t9_2.1.dat"));

    // Free expansion from T9 = 10 and 1e6 g/cm^3 until the matter is cold
    let thermo = FreeExpansion::new(10.0, 1.0e6).expect("valid peak conditions");
    let config = NetworkConfig {
        t_max: 1.0e25,
        t9_min: Some(1.0e-2),
        ..NetworkConfig::default()
    };
    let network = Network::from_config(thermo, config).expect("valid network parameters");
    let mut driver: Driver<State, _> = Driver::new(AdaptiveImplicit::new(&network), 1.0e-10);
    report(driver.integrate(), &driver, Path::new("./outputs/network_expansion.dat"));
}

fn report<I: Integrator<State>>(res: Result<Stats, IntegrationError>, driver: &Driver<State, I>, path: &Path) {
    match res {
        Ok(stats) => {
            println!("{}", stats);
            if let Some((t, y)) = driver.results().terminal() {
                let x = mass_fractions(y);
                println!(
                    "t = {:e} s: X(He4) = {:.6}, X(C12) = {:.6e}, X(Mg24) = {:.6}",
                    t, x[0], x[1], x[2]
                );
            }
            save(driver.x_out(), driver.y_out(), path);
            println!("Results saved in: {:?}", path);
        }
        Err(e) => println!("An error occured: {}", e),
    }
}

pub fn save(times: &[Time], states: &[State], filename: &Path) {
    // Create or open file
    let mut buf = match File::create(filename) {
        Err(e) => {
            println!("Could not open file. Error: {:?}", e);
            return;
        }
        Ok(buf) => buf,
    };

    // Write time and mass fractions in a csv format
    for (t, state) in times.iter().zip(states) {
        let x = mass_fractions(state);
        if let Err(e) = writeln!(buf, "{}, {}, {}, {}", t, x[0], x[1], x[2]) {
            println!("Could not write to file. Error: {:?}", e);
            return;
        }
    }
}
