//! Canonical terminal id and its alias vocabulary

/// The single canonical terminal id every graph ends in.
pub const CANON_TERMINAL: &str = "END_COMPLETE";

/// Terminal ids the extraction oracle is known to emit instead of the
/// canonical one. Repair rewrites edges to the canonical id and drops the
/// alias nodes.
pub const TERMINAL_ALIASES: [&str; 6] =
    ["END", "SUBMIT", "FINISH", "END_SURVEY", "COMPLETE", "ENDCOMPLETE"];

/// Whether an id is a non-canonical terminal alias.
pub fn is_terminal_alias(id: &str) -> bool {
    TERMINAL_ALIASES.contains(&id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_exclude_canonical() {
        assert!(!is_terminal_alias(CANON_TERMINAL));
        assert!(is_terminal_alias("END"));
        assert!(is_terminal_alias("SUBMIT"));
        assert!(!is_terminal_alias("Q1"));
    }
}
