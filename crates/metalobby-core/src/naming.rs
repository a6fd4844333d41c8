//! Guest name collision resolution.

/// Pick the display name for a guest login.
///
/// Returns `base` if it is free, otherwise the first of `base1`, `base2`, …
/// for which `is_taken` is false. `is_taken` should report names held by
/// registered accounts as well as names of logged-in sessions.
///
/// Terminates as long as `is_taken` rejects finitely many names.
pub fn resolve_guest_name(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}{suffix}");
        if !is_taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
