use crate::types::OwnerHandle;

/// Derive the remote repository's serving endpoint from an owner handle.
///
/// Takes the last two dot-separated labels of the handle as a hostname
/// (`alice.pds.example` serves from `https://pds.example`); handles with
/// fewer than two labels fall back to `default_endpoint`. This is a
/// heuristic, not a protocol guarantee: a handle may be served by a PDS
/// whose hostname is unrelated to the handle's suffix.
#[must_use]
pub fn pds_endpoint_for(handle: &OwnerHandle, default_endpoint: &str) -> String {
    let labels: Vec<&str> = handle.as_str().split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return default_endpoint.to_owned();
    }
    let host = &labels[labels.len() - 2..];
    format!("https://{}", host.join("."))
}
