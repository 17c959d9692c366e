#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use inventory_data::{aggregate_daily_by_item, AggregatedFrame, RawObservation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

pub fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
}

/// Daily synthetic observations with a share of extreme consumption spikes
///
/// Returns the observations and the (product, date) keys of the spikes.
pub fn synthetic_observations(
    products: usize,
    days: i64,
    extreme_fraction: f64,
    seed: u64,
) -> (Vec<RawObservation>, Vec<(String, NaiveDate)>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let consumption = Normal::new(50.0, 5.0).unwrap();
    let stock = Normal::new(500.0, 30.0).unwrap();

    let mut observations = Vec::new();
    let mut extremes = Vec::new();
    for p in 0..products {
        let product = format!("PROD_{:03}", p + 1);
        for d in 0..days {
            let date = start() + Duration::days(d);
            let mut c: f64 = consumption.sample(&mut rng);
            let mut s: f64 = stock.sample(&mut rng);
            if rng.gen_bool(extreme_fraction) {
                c *= rng.gen_range(4.0..6.0);
                s *= rng.gen_range(0.05..0.15);
                extremes.push((product.clone(), date));
            }
            observations.push(RawObservation::new(date, product.clone(), s, c));
        }
    }
    (observations, extremes)
}

pub fn synthetic_frame(products: usize, days: i64, seed: u64) -> AggregatedFrame {
    let (observations, _) = synthetic_observations(products, days, 0.02, seed);
    aggregate_daily_by_item(&observations, None, false).unwrap()
}
