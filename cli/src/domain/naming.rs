//! Machine identity naming rules.
//!
//! Identities look like `vagrant-<sanitized-name>-<suffix>` and must fit in a
//! DNS label so the backend can use them as hostnames.

/// Fixed prefix of every generated identity.
pub const IDENTITY_PREFIX: &str = "vagrant";

/// Number of hex characters in the random suffix.
pub const SUFFIX_LEN: usize = 6;

/// Maximum hostname label length accepted by the backend.
pub const MAX_HOSTNAME_LEN: usize = 63;

/// Room left for the sanitized name once prefix, suffix and separators are placed.
pub const MAX_SANITIZED_LEN: usize = MAX_HOSTNAME_LEN - IDENTITY_PREFIX.len() - SUFFIX_LEN - 2;

/// Name used when sanitization leaves nothing behind.
pub const FALLBACK_NAME: &str = "default";

/// Reduce a human-supplied name to `[a-z0-9-]`, hyphen-separated, within budget.
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c == '_' || c.is_whitespace() {
            '-'
        } else {
            c.to_ascii_lowercase()
        };
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            continue;
        }
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    let mut name = out.trim_matches('-').to_string();
    if name.len() > MAX_SANITIZED_LEN {
        name.truncate(MAX_SANITIZED_LEN);
        name = name.trim_end_matches('-').to_string();
    }
    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

/// Assemble a candidate identity from an already-sanitized name and a suffix.
#[must_use]
pub fn candidate_identity(sanitized: &str, suffix: &str) -> String {
    format!("{IDENTITY_PREFIX}-{sanitized}-{suffix}")
}

/// Whether a stored identity is safe to pass to the backend.
#[must_use]
pub fn is_valid_identity(identity: &str) -> bool {
    !identity.is_empty()
        && identity.len() <= MAX_HOSTNAME_LEN
        && identity.starts_with(&format!("{IDENTITY_PREFIX}-"))
        && !identity.ends_with('-')
        && identity
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
