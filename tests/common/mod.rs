#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::fs;
use std::io::Write;
use std::path::Path;

pub fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Write a seeded synthetic inventory CSV with occasional consumption spikes
pub fn write_inventory_csv(path: &Path, products: usize, days: i64, seed: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 2.0).unwrap();

    let mut file = fs::File::create(path).unwrap();
    writeln!(file, "date,product_id,stock,consumption").unwrap();
    for p in 0..products {
        let base = 20.0 + 5.0 * p as f64;
        let mut stock = 400.0;
        for d in 0..days {
            let weekly = 3.0 * (2.0 * std::f64::consts::PI * d as f64 / 7.0).sin();
            let mut consumption: f64 = (base + weekly + noise.sample(&mut rng)).max(0.0);
            if rng.gen_bool(0.03) {
                consumption *= 5.0;
            }
            stock = (stock - consumption + if d % 14 == 0 { 300.0 } else { 0.0 }).max(0.0);
            writeln!(
                file,
                "{},SKU-{:02},{:.2},{:.2}",
                start() + Duration::days(d),
                p + 1,
                stock,
                consumption
            )
            .unwrap();
        }
    }
}
