//! Username derivation for accounts created through Google sign-in.

use std::collections::HashSet;

const MAX_BASE_LEN: usize = 20;
const FALLBACK_BASE: &str = "user";

/// Derives a username base from the local part of an email address.
///
/// Only `[A-Za-z0-9._-]` survive, the result is cut to 20 characters and
/// falls back to `user` when nothing is left.
pub fn base_from_email(email: &str) -> String {
    let local = email.split_once('@').map_or(email, |(local, _)| local);

    let base: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(MAX_BASE_LEN)
        .collect();

    if base.is_empty() {
        FALLBACK_BASE.to_owned()
    } else {
        base
    }
}

/// Returns `base` if it is free, otherwise `base` with the smallest
/// numeric suffix (starting at 1) that is not taken.
pub fn pick_available<'a, I>(base: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken = taken.into_iter().collect::<HashSet<_>>();
    if !taken.contains(base) {
        return base.to_owned();
    }

    let mut suffix = 1u64;
    loop {
        let candidate = format!("{base}{suffix}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        suffix += 1;
    }
}
