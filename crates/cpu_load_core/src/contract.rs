use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::payload::{payload_commands, LoadProfile};
use crate::targets::{Region, TargetSet, ValidationError};

pub const RUN_SHELL_SCRIPT_DOCUMENT: &str = "AWS-RunShellScript";
pub const COMMANDS_PARAMETER: &str = "commands";

/// One `SendCommand` call, fully resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteCommandRequest {
    pub region: Region,
    pub document_name: String,
    pub comment: String,
    pub targets: TargetSet,
    pub parameters: BTreeMap<String, Vec<String>>,
}

impl RemoteCommandRequest {
    pub fn commands(&self) -> &[String] {
        self.parameters
            .get(COMMANDS_PARAMETER)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// What the service handed back for an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandReceipt {
    pub command_id: String,
    pub document_name: String,
    pub region: Region,
    pub targets: TargetSet,
    pub request_fingerprint: String,
}

pub fn build_remote_command(
    targets: TargetSet,
    region: Region,
    profile: &LoadProfile,
) -> RemoteCommandRequest {
    let comment = format!(
        "Simulate {}% CPU load for {}s",
        profile.cpu_percent(),
        profile.duration_secs()
    );
    RemoteCommandRequest {
        region,
        document_name: RUN_SHELL_SCRIPT_DOCUMENT.to_string(),
        comment,
        targets,
        parameters: BTreeMap::from([(
            COMMANDS_PARAMETER.to_string(),
            payload_commands(profile),
        )]),
    }
}

/// Validates raw inputs and builds the request; nothing is sent.
/// `instance_ids` is a comma or whitespace separated list.
pub fn prepare_send(
    instance_ids: &str,
    region: &str,
    profile: &LoadProfile,
) -> Result<RemoteCommandRequest, ValidationError> {
    let targets = TargetSet::parse(instance_ids)?;
    let region = Region::new(region)?;
    Ok(build_remote_command(targets, region, profile))
}

pub fn request_fingerprint(request: &RemoteCommandRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stable_contract_json(request));
    format!("{:x}", hasher.finalize())
}

pub fn stable_contract_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of contract value should not fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(ids: &[&str], region: &str) -> RemoteCommandRequest {
        prepare_send(&ids.join(","), region, &LoadProfile::default())
            .expect("request should build")
    }

    #[test]
    fn request_names_exactly_the_given_targets_and_region() {
        for (ids, region) in [
            (vec!["i-0123456789abcdef0"], "us-east-1"),
            (vec!["i-0a", "i-0b", "i-0c"], "eu-west-2"),
            (vec!["mi-0123", "i-0b"], "ap-southeast-2"),
        ] {
            let request = request(&ids, region);
            assert_eq!(request.targets.as_slice(), ids.as_slice());
            assert_eq!(request.region.as_str(), region);
        }
    }

    #[test]
    fn request_uses_run_shell_script_with_payload_commands() {
        let request = request(&["i-0a"], "us-east-1");
        assert_eq!(request.document_name, "AWS-RunShellScript");
        assert_eq!(request.comment, "Simulate 80% CPU load for 30s");
        assert_eq!(request.commands(), payload_commands(&LoadProfile::default()));
        assert_eq!(request.parameters.len(), 1);
    }

    #[test]
    fn empty_target_list_is_rejected_before_building() {
        for raw in ["", "  ", ",,"] {
            let error = prepare_send(raw, "us-east-1", &LoadProfile::default())
                .expect_err("empty target list should fail");
            assert_eq!(error, ValidationError::EmptyTargetSet);
        }

        let error = prepare_send("i-0a", "", &LoadProfile::default())
            .expect_err("empty region should fail");
        assert_eq!(error, ValidationError::EmptyRegion);
    }

    #[test]
    fn fingerprint_is_stable_and_input_sensitive() {
        let first = request(&["i-0a"], "us-east-1");
        let again = request(&["i-0a"], "us-east-1");
        let other = request(&["i-0a"], "us-west-2");

        assert_eq!(request_fingerprint(&first), request_fingerprint(&again));
        assert_ne!(request_fingerprint(&first), request_fingerprint(&other));
        assert_eq!(request_fingerprint(&first).len(), 64);
    }
}
