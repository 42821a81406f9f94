// Structure of a polytropic star of two solar masses with n = 3.

use simplelog::{Config, LevelFilter, SimpleLogger};
use stellar_ode::*;

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

fn main() {
    let _ = SimpleLogger::init(LevelFilter::Info, Config::default());

    let params = StarParameters::default();
    match calculate_stellar_parameters(&params) {
        Ok(profile) => {
            println!("alpha            = {:e} m", profile.alpha);
            println!("K                = {:e}", profile.k);
            println!("gamma            = {}", profile.gamma);
            println!("central pressure = {:e} Pa", profile.central_pressure);
            if let Some(t_c) = profile.temperatures.first() {
                println!("central temp.    = {:e} K", t_c);
            }
            let path = Path::new("./outputs/stellar_structure.dat");
            save(&profile, path);
            println!("Results saved in: {:?}", path);
        }
        Err(e) => println!("An error occured: {}", e),
    }
}

pub fn save(profile: &StellarProfile, filename: &Path) {
    // Create or open file
    let mut buf = match File::create(filename) {
        Err(e) => {
            println!("Could not open file. Error: {:?}", e);
            return;
        }
        Ok(buf) => buf,
    };

    // Write radius, density, pressure and temperature in a csv format
    for i in 0..profile.radii.len() {
        if let Err(e) = writeln!(
            buf,
            "{}, {}, {}, {}",
            profile.radii[i], profile.densities[i], profile.pressures[i], profile.temperatures[i]
        ) {
            println!("Could not write to file. Error: {:?}", e);
            return;
        }
    }
}
