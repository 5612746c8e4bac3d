//! Private-network host detection for caller-supplied image URLs.
//!
//! The upstream cannot reach loopback or RFC 1918 addresses, so images hosted
//! there have to be fetched locally and inlined before submission.

use url::{Host, Url};

/// Whether `url` points at a loopback or private-network host.
///
/// The host is taken from the parsed URL, so shorthand IPv4 spellings such as
/// `127.1` or `0x7f.0.0.1` classify like their dotted form. Hostnames other
/// than `localhost` are not resolved.
pub fn is_private_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    match parsed.host() {
        Some(Host::Domain(domain)) => domain
            .trim_end_matches('.')
            .eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(v4)) => v4.is_loopback() || v4.is_private(),
        Some(Host::Ipv6(v6)) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.is_loopback() || v4.is_private(),
            None => v6.is_loopback(),
        },
        None => false,
    }
}
