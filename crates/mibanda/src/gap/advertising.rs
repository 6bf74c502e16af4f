//! Advertising data helpers
//!
//! Advertising payloads are a sequence of `[length, type, data...]` structures.

use crate::gap::constants::*;

/// Parse advertisement data from a LE Advertising Report
///
/// Returns a vector of (type, data) tuples. Parsing stops at the first zero
/// length or at a structure that runs past the end of the buffer.
pub fn parse_advertising_data(data: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut result = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let length = data[i] as usize;
        if length == 0 || i + length >= data.len() {
            break;
        }

        let ad_type = data[i + 1];
        let ad_data = data[i + 2..i + 1 + length].to_vec();

        result.push((ad_type, ad_data));

        i += 1 + length;
    }

    result
}

/// Extract the local name (shortened or complete) from advertisement data.
///
/// Returns `None` when no name structure is present or the name is empty.
pub fn local_name(data: &[u8]) -> Option<String> {
    parse_advertising_data(data)
        .into_iter()
        .find(|(ad_type, _)| {
            *ad_type == ADV_TYPE_SHORT_LOCAL_NAME || *ad_type == ADV_TYPE_COMPLETE_LOCAL_NAME
        })
        .map(|(_, name)| String::from_utf8_lossy(&name).into_owned())
        .filter(|name| !name.is_empty())
}
