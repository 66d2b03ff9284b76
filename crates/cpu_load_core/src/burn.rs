//! Local rendition of the payload: busy-loop for a calibrated share of the
//! window, then sleep out the remainder.

use std::hint::black_box;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::payload::LoadProfile;

/// Size of one unit of busy work.
const WORK_UNIT_SPAN: u64 = 10_000;
pub const DEFAULT_CALIBRATION_SAMPLE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadReport {
    pub iteration_budget: u64,
    pub iterations: u64,
    pub busy_ms: u128,
    pub elapsed_ms: u128,
    pub reached_deadline: bool,
}

fn work_unit(seed: u64) -> u64 {
    (0..WORK_UNIT_SPAN).fold(seed, |acc, x| acc.wrapping_mul(31).wrapping_add(x))
}

/// Measures how many work units this host completes per second.
pub fn calibrate(sample: Duration) -> u64 {
    let started = Instant::now();
    let mut units = 0u64;
    let mut acc = 0u64;
    while started.elapsed() < sample {
        acc = black_box(work_unit(acc));
        units += 1;
    }
    let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
    ((units as f64 / elapsed) as u64).max(1)
}

/// Work units needed to keep one core busy for `cpu_percent` of the window.
pub fn iteration_budget(units_per_sec: u64, profile: &LoadProfile) -> u64 {
    let per_window = units_per_sec.saturating_mul(profile.duration_secs());
    per_window.saturating_mul(u64::from(profile.cpu_percent())) / 100
}

pub fn run_load(profile: &LoadProfile) -> LoadReport {
    let units_per_sec = calibrate(DEFAULT_CALIBRATION_SAMPLE);
    run_load_with_budget(profile, iteration_budget(units_per_sec, profile))
}

/// Busy-loops up to `budget` work units without overrunning the window, then
/// sleeps until the window closes.
pub fn run_load_with_budget(profile: &LoadProfile, budget: u64) -> LoadReport {
    let window = profile.duration();
    let started = Instant::now();
    let mut iterations = 0u64;
    let mut acc = 0u64;
    let mut reached_deadline = false;

    while iterations < budget {
        acc = black_box(work_unit(acc));
        iterations += 1;
        if started.elapsed() >= window {
            reached_deadline = true;
            break;
        }
    }

    let busy = started.elapsed();
    if let Some(remaining) = window.checked_sub(busy) {
        thread::sleep(remaining);
    }

    LoadReport {
        iteration_budget: budget,
        iterations,
        busy_ms: busy.as_millis(),
        elapsed_ms: started.elapsed().as_millis(),
        reached_deadline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_monotonic_in_cpu_percent() {
        let rate = 12_345;
        let mut previous = 0;
        for percent in 1..=100 {
            let profile = LoadProfile::new(30, percent).expect("profile should pass");
            let budget = iteration_budget(rate, &profile);
            assert!(budget >= previous, "budget dropped at {percent}%");
            previous = budget;
        }

        let high = LoadProfile::new(30, 80).expect("profile should pass");
        let low = LoadProfile::new(30, 10).expect("profile should pass");
        assert!(iteration_budget(rate, &high) > iteration_budget(rate, &low));
    }

    #[test]
    fn full_load_budget_covers_whole_window() {
        let profile = LoadProfile::new(2, 100).expect("profile should pass");
        assert_eq!(iteration_budget(1_000, &profile), 2_000);
    }

    #[test]
    fn calibration_reports_positive_rate() {
        assert!(calibrate(Duration::from_millis(5)) >= 1);
    }

    #[test]
    fn run_sleeps_out_the_window() {
        let profile = LoadProfile::new(1, 10).expect("profile should pass");
        let report = run_load_with_budget(&profile, 1);

        assert_eq!(report.iterations, 1);
        assert!(!report.reached_deadline);
        assert!(report.elapsed_ms >= 1_000);
        assert!(report.elapsed_ms < 2_000, "took {}ms", report.elapsed_ms);
    }

    #[test]
    fn oversized_budget_stops_at_deadline() {
        let profile = LoadProfile::new(1, 100).expect("profile should pass");
        let report = run_load_with_budget(&profile, u64::MAX);

        assert!(report.reached_deadline);
        assert!(report.iterations < u64::MAX);
        assert!(report.elapsed_ms < 2_000, "took {}ms", report.elapsed_ms);
    }
}
