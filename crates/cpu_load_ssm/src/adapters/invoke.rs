pub trait AnalysisInvoker {
    /// Synchronously invokes `function_name` and returns its response payload.
    fn invoke_analysis(&self, function_name: &str) -> Result<Vec<u8>, String>;
}
