use cpu_load_core::contract::{request_fingerprint, CommandReceipt, RemoteCommandRequest};
use tracing::{error, info};

use crate::adapters::command::CommandSender;
use crate::error::InvokeError;

/// Submits an already validated request exactly once. Build the request with
/// `cpu_load_core::contract::prepare_send` so dry-run output and the real
/// submission come from the same value.
pub fn handle_send(
    request: &RemoteCommandRequest,
    sender: &dyn CommandSender,
) -> Result<CommandReceipt, InvokeError> {
    let fingerprint = request_fingerprint(request);

    info!(
        component = "invoker",
        event = "command_submitting",
        region = %request.region,
        targets = request.targets.as_slice().len(),
        document = %request.document_name,
        fingerprint = %fingerprint,
    );

    let command_id = sender.send_command(request).map_err(|message| {
        error!(
            component = "invoker",
            event = "command_failed",
            fingerprint = %fingerprint,
            %message,
        );
        InvokeError::Dispatch(message)
    })?;

    info!(
        component = "invoker",
        event = "command_submitted",
        command_id = %command_id,
        fingerprint = %fingerprint,
    );

    Ok(CommandReceipt {
        command_id,
        document_name: request.document_name.clone(),
        region: request.region.clone(),
        targets: request.targets.clone(),
        request_fingerprint: fingerprint,
    })
}
