use anyhow::Error;

/// True when the error chain bottoms out in a connection-level failure, as
/// opposed to an HTTP status or parse problem. Drives the informational
/// online/offline flag only; it never blocks a refresh.
pub fn is_connectivity_error(error: &Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_connect() || e.is_timeout())
    })
}
