//! Session cookie utilities.

use crate::api::types::SiteCookie;

/// Domain the session cookies are scoped to.
pub const COOKIE_DOMAIN: &str = ".geekbang.org";

/// Cookie carrying the client id.
pub const GCID: &str = "GCID";

/// Cookie carrying the session secret.
pub const GCESS: &str = "GCESS";

/// Build the credential set from a pre-supplied cookie pair.
pub fn cookie_pair(gcid: &str, gcess: &str) -> Vec<SiteCookie> {
    vec![
        SiteCookie {
            name: GCID.to_string(),
            value: gcid.to_string(),
            domain: COOKIE_DOMAIN.to_string(),
        },
        SiteCookie {
            name: GCESS.to_string(),
            value: gcess.to_string(),
            domain: COOKIE_DOMAIN.to_string(),
        },
    ]
}

/// Parse a `Cookie` header value ("a=1; b=2") into site cookies.
pub fn parse_cookie_header(header: &str, domain: &str) -> Vec<SiteCookie> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            if name.is_empty() {
                return None;
            }
            Some(SiteCookie {
                name: name.to_string(),
                value: value.to_string(),
                domain: domain.to_string(),
            })
        })
        .collect()
}

/// Whether the set contains a session secret worth trying.
pub fn has_session(cookies: &[SiteCookie]) -> bool {
    cookies
        .iter()
        .any(|c| c.name == GCESS && !c.value.is_empty())
}
