use cpu_load_core::contract::RemoteCommandRequest;

/// Submits one remote-execution request and returns the service's command id.
pub trait CommandSender {
    fn send_command(&self, request: &RemoteCommandRequest) -> Result<String, String>;
}
