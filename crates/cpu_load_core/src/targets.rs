use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a target set, region, or load profile is refused before any
/// request leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target set cannot be empty")]
    EmptyTargetSet,
    #[error("target identifier at position {position} is blank")]
    BlankTarget { position: usize },
    #[error("region cannot be empty")]
    EmptyRegion,
    #[error("region '{0}' may only contain lowercase letters, digits and '-'")]
    InvalidRegion(String),
    #[error("duration_secs must be a positive integer")]
    ZeroDuration,
    #[error("cpu_percent must be within 1..=100, got {0}")]
    CpuPercentOutOfRange(u8),
    #[error("start date {start} must be before end date {end}")]
    EmptyDateRange { start: String, end: String },
}

/// Non-empty, de-duplicated list of instance identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetSet(Vec<String>);

impl TargetSet {
    pub fn new<I, S>(ids: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets: Vec<String> = Vec::new();
        for (position, id) in ids.into_iter().enumerate() {
            let id = id.as_ref().trim();
            if id.is_empty() {
                return Err(ValidationError::BlankTarget { position });
            }
            if !targets.iter().any(|existing| existing == id) {
                targets.push(id.to_string());
            }
        }

        if targets.is_empty() {
            return Err(ValidationError::EmptyTargetSet);
        }
        Ok(Self(targets))
    }

    /// Parses a comma or whitespace separated list, e.g. the value of
    /// `CPU_LOAD_INSTANCE_IDS`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let ids: Vec<&str> = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect();
        Self::new(ids)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let region = raw.trim();
        if region.is_empty() {
            return Err(ValidationError::EmptyRegion);
        }
        let well_formed = region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !region.starts_with('-')
            && !region.ends_with('-');
        if !well_formed {
            return Err(ValidationError::InvalidRegion(region.to_string()));
        }
        Ok(Self(region.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
