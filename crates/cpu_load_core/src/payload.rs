use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::targets::ValidationError;

pub const DEFAULT_DURATION_SECS: u64 = 30;
pub const DEFAULT_CPU_PERCENT: u8 = 80;
pub const PAYLOAD_PATH: &str = "/tmp/cpu_load.sh";
/// Bash `for` iterations granted per second of window per percent of load.
/// The resulting budget is a nominal upper bound, not a calibrated rate: a
/// fast host finishes it well before `cpu_percent` of the window and idles
/// for the rest, a slow host is cut off at the window deadline.
pub const SHELL_ITERATIONS_PER_PERCENT_SECOND: u64 = 5_000;
/// Inner-loop size between deadline checks in the shell payload.
pub const SHELL_CHUNK_ITERATIONS: u64 = 10_000;

const HEREDOC_MARKER: &str = "CPU_LOAD_EOF";

/// The payload's two parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProfile {
    duration_secs: u64,
    cpu_percent: u8,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            cpu_percent: DEFAULT_CPU_PERCENT,
        }
    }
}

impl LoadProfile {
    pub fn new(duration_secs: u64, cpu_percent: u8) -> Result<Self, ValidationError> {
        if duration_secs == 0 {
            return Err(ValidationError::ZeroDuration);
        }
        if cpu_percent == 0 || cpu_percent > 100 {
            return Err(ValidationError::CpuPercentOutOfRange(cpu_percent));
        }
        Ok(Self {
            duration_secs,
            cpu_percent,
        })
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn cpu_percent(&self) -> u8 {
        self.cpu_percent
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn shell_iteration_budget(&self) -> u64 {
        self.duration_secs
            .saturating_mul(u64::from(self.cpu_percent))
            .saturating_mul(SHELL_ITERATIONS_PER_PERCENT_SECOND)
    }
}

/// Renders the bash payload. The busy loop stops at the iteration budget or
/// when the window elapses, whichever comes first, then sleeps out the rest.
pub fn render_script(profile: &LoadProfile) -> String {
    format!(
        r#"#!/bin/bash
DURATION={duration}
CPU_PERCENT={percent}
ITERATIONS=$((DURATION * CPU_PERCENT * {per_percent_second}))
CHUNK={chunk}

echo "Simulating ${{CPU_PERCENT}}% CPU load for ${{DURATION}}s (${{ITERATIONS}} iterations)"
START=$SECONDS
i=0
while [ "$i" -lt "$ITERATIONS" ] && [ $((SECONDS - START)) -lt "$DURATION" ]; do
  for ((j = 0; j < CHUNK; j++)); do :; done
  i=$((i + CHUNK))
done

REMAINING=$((DURATION - (SECONDS - START)))
if [ "$REMAINING" -gt 0 ]; then
  sleep "$REMAINING"
fi
echo "CPU load simulation complete after $((SECONDS - START))s"
"#,
        duration = profile.duration_secs,
        percent = profile.cpu_percent,
        per_percent_second = SHELL_ITERATIONS_PER_PERCENT_SECOND,
        chunk = SHELL_CHUNK_ITERATIONS,
    )
}

/// Ordered `commands` for `AWS-RunShellScript`: write the script to
/// [`PAYLOAD_PATH`], then run it.
pub fn payload_commands(profile: &LoadProfile) -> Vec<String> {
    payload_commands_at(profile, PAYLOAD_PATH)
}

/// Same as [`payload_commands`] with the script written to `path`.
pub fn payload_commands_at(profile: &LoadProfile, path: &str) -> Vec<String> {
    let script = render_script(profile);
    vec![
        format!("cat <<'{HEREDOC_MARKER}' > {path} && chmod +x {path}\n{script}{HEREDOC_MARKER}"),
        path.to_string(),
    ]
}
