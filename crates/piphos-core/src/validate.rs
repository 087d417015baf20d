//! Input validation
//!
//! IP literals are checked with the standard library parser, which follows
//! the same rules as `inet_pton`: dotted-quad IPv4 with octets 0-255 (no
//! leading zeros) and RFC 4291 IPv6 text forms, including `::` compression
//! and embedded IPv4. Nothing here resolves names.

use std::net::IpAddr;

use crate::{Error, Result};

/// Validate that `candidate` is a bare IPv4 or IPv6 literal
///
/// Surrounding whitespace is rejected; callers that read from the network
/// trim first.
pub fn ip(candidate: &str) -> Result<IpAddr> {
    candidate
        .parse::<IpAddr>()
        .map_err(|_| Error::invalid_ip(candidate))
}

/// Validate that an authentication token is present
pub fn token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::missing_credential("token is empty"));
    }
    Ok(())
}

/// Validate that a hostname key is usable in the host map
pub fn hostname(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::config("hostname cannot be empty"));
    }
    Ok(())
}
