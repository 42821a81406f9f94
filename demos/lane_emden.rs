// Lane-Emden equation of a polytropic star, solved with Euler, improved Euler and RK4.
// The surface values of each method are compared with the exact ones of n = 1.

use simplelog::{Config, LevelFilter, SimpleLogger};
use stellar_ode::lane_emden::{surface_table, LaneEmdenState};
use stellar_ode::*;

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

const POLYTROPIC_INDEX: f64 = 1.0;

fn main() {
    let _ = SimpleLogger::init(LevelFilter::Info, Config::default());

    let model = LaneEmden::new(POLYTROPIC_INDEX).expect("valid polytropic index");
    let mut driver: Driver<LaneEmdenState, _> = Driver::new(Fixed::new(Rk4::new(&model)), 0.01);
    let res = driver.integrate();

    // Handle result
    match res {
        Ok(stats) => {
            println!("{}", stats);
            let path = Path::new("./outputs/lane_emden_rk4.dat");
            save(driver.x_out(), driver.y_out(), path);
            println!("Results saved in: {:?}", path);
        }
        Err(e) => println!("An error occured: {}", e),
    }

    match surface_table(POLYTROPIC_INDEX, &[0.1, 0.01, 0.001]) {
        Ok(rows) => {
            println!("{:>8} {:>16} {:>12} {:>14}", "h", "method", "xi_1", "dtheta/dxi");
            for row in rows {
                println!(
                    "{:>8} {:>16} {:>12.6} {:>14.8}",
                    row.h,
                    row.label(),
                    row.x_surface,
                    row.density_derivative_surface
                );
            }
        }
        Err(e) => println!("An error occured: {}", e),
    }
}

pub fn save(radii: &[f64], states: &[LaneEmdenState], filename: &Path) {
    // Create or open file
    let mut buf = match File::create(filename) {
        Err(e) => {
            println!("Could not open file. Error: {:?}", e);
            return;
        }
        Ok(buf) => buf,
    };

    // Write radius and state vector in a csv format
    for (xi, state) in radii.iter().zip(states) {
        if let Err(e) = writeln!(buf, "{}, {}, {}", xi, state[0], state[1]) {
            println!("Could not write to file. Error: {:?}", e);
            return;
        }
    }
}
