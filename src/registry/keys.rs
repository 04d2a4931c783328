//! Level id and space key conventions: levels are `SUB<N>`, generated
//! spaces are `<levelId>-<NNN>`.

pub fn format_space_key(level_id: &str, n: u32) -> String {
    format!("{level_id}-{n:03}")
}

/// Numeric suffix of a space key (`SUB1-007` -> 7). Renamed keys without a
/// numeric second segment yield `None`.
pub fn space_number(key: &str) -> Option<u32> {
    key.split('-').nth(1)?.parse().ok()
}

/// Number of a generated level id (`SUB3` -> 3).
pub fn level_number(id: &str) -> Option<u32> {
    let digits = id.strip_prefix("SUB")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn default_display_name(n: u32) -> String {
    format!("Nombre {n}")
}
