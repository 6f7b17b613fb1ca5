//! CAPI ⇄ Rancher cluster name conversion.
//!
//! A Rancher cluster created for a CAPI cluster lives in the same namespace
//! and carries the CAPI name plus a fixed suffix.

/// Suffix appended to a CAPI cluster name to form its Rancher cluster name.
pub const RANCHER_CAPI_SUFFIX: &str = "-capi";

/// Converts a CAPI cluster name to the Rancher cluster name.
///
/// The suffix is appended unconditionally, so applying this twice yields a
/// doubled suffix. Only `to_capi_name(to_rancher_name(n)) == n` holds.
pub fn to_rancher_name(capi_name: &str) -> String {
    format!("{}{}", capi_name, RANCHER_CAPI_SUFFIX)
}

/// Converts a Rancher cluster name to the CAPI cluster name.
///
/// Names without the suffix are returned unchanged.
pub fn to_capi_name(rancher_name: &str) -> &str {
    rancher_name
        .strip_suffix(RANCHER_CAPI_SUFFIX)
        .unwrap_or(rancher_name)
}
