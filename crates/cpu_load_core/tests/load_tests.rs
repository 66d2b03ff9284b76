//! Timing tests for the payload: the rendered bash script and the local burn
//! must both finish close to their window.

use std::process::Command;
use std::time::Instant;

use cpu_load_core::burn::run_load;
use cpu_load_core::payload::{payload_commands_at, render_script, LoadProfile};

fn bash_available() -> bool {
    Command::new("bash")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn run_rendered_script(profile: &LoadProfile) -> Option<(f64, String)> {
    if !bash_available() {
        eprintln!("bash not available; skipping payload script run");
        return None;
    }

    let start = Instant::now();
    let output = Command::new("bash")
        .arg("-c")
        .arg(render_script(profile))
        .output()
        .expect("bash should start");
    let elapsed = start.elapsed().as_secs_f64();

    assert!(output.status.success(), "payload exited with {}", output.status);
    Some((elapsed, String::from_utf8_lossy(&output.stdout).into_owned()))
}

#[test]
fn short_payload_script_finishes_near_its_window() {
    let profile = LoadProfile::new(2, 50).expect("profile should pass");
    let Some((elapsed, stdout)) = run_rendered_script(&profile) else {
        return;
    };

    assert!(elapsed >= 1.0, "finished too early: {elapsed:.2}s");
    assert!(elapsed < 4.5, "overran window: {elapsed:.2}s");
    assert!(stdout.contains("Simulating 50% CPU load for 2s"));
    assert!(stdout.contains("CPU load simulation complete"));
}

#[test]
fn full_load_script_is_cut_off_at_its_window() {
    let profile = LoadProfile::new(1, 100).expect("profile should pass");
    let Some((elapsed, stdout)) = run_rendered_script(&profile) else {
        return;
    };

    assert!(elapsed < 3.5, "overran window: {elapsed:.2}s");
    assert!(stdout.contains("CPU load simulation complete"));
}

#[cfg(unix)]
#[test]
fn ssm_commands_write_an_executable_script_and_run_it() {
    use std::os::unix::fs::PermissionsExt;

    if !bash_available() {
        eprintln!("bash not available; skipping payload command run");
        return;
    }

    let dir = tempfile::tempdir().expect("temp dir should be created");
    let script_path = dir.path().join("cpu_load.sh");
    let script_path = script_path.to_str().expect("temp path should be UTF-8");
    let profile = LoadProfile::new(1, 10).expect("profile should pass");
    let commands = payload_commands_at(&profile, script_path);

    let output = Command::new("bash")
        .arg("-c")
        .arg(commands.join("\n"))
        .output()
        .expect("bash should start");

    assert!(
        output.status.success(),
        "commands exited with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let written = std::fs::read_to_string(script_path).expect("script should be written");
    assert_eq!(written, render_script(&profile));
    let mode = std::fs::metadata(script_path)
        .expect("script metadata")
        .permissions()
        .mode();
    assert_ne!(mode & 0o111, 0, "script should be executable");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Simulating 10% CPU load for 1s"));
    assert!(stdout.contains("CPU load simulation complete"));
}

#[test]
#[ignore] // Only run explicitly: cargo test -p cpu_load_core --test load_tests -- --ignored
fn default_payload_script_runs_for_thirty_seconds() {
    let profile = LoadProfile::default();
    let Some((elapsed, stdout)) = run_rendered_script(&profile) else {
        return;
    };

    println!("payload script: {elapsed:.2}s");
    assert!(elapsed >= 29.0, "finished too early: {elapsed:.2}s");
    assert!(elapsed < 33.0, "overran window: {elapsed:.2}s");
    assert!(stdout.contains("CPU load simulation complete"));
}

#[test]
#[ignore]
fn default_local_burn_runs_for_thirty_seconds() {
    let profile = LoadProfile::default();
    let report = run_load(&profile);

    println!(
        "local burn: {} of {} units, busy {}ms, total {}ms",
        report.iterations, report.iteration_budget, report.busy_ms, report.elapsed_ms
    );
    assert!(report.elapsed_ms >= 30_000);
    assert!(report.elapsed_ms < 31_500, "overran window: {}ms", report.elapsed_ms);
    assert!(report.busy_ms <= report.elapsed_ms);
}
