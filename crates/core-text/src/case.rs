//! Single-codepoint case mapping.
//!
//! Only 1:1 mappings are applied (toggling `ß` or other expanding mappings
//! leaves the codepoint unchanged), which keeps `change_case` a byte-local
//! replace on the row.

/// Lowercase mapping when it is a single codepoint, else identity.
pub fn lower(ch: char) -> char {
    let mut it = ch.to_lowercase();
    match (it.next(), it.next()) {
        (Some(c), None) => c,
        _ => ch,
    }
}

/// Uppercase mapping when it is a single codepoint, else identity.
pub fn upper(ch: char) -> char {
    let mut it = ch.to_uppercase();
    match (it.next(), it.next()) {
        (Some(c), None) => c,
        _ => ch,
    }
}

/// Swap the case of one codepoint.
pub fn toggle(ch: char) -> char {
    if ch.is_lowercase() {
        upper(ch)
    } else if ch.is_uppercase() {
        lower(ch)
    } else {
        ch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin() {
        assert_eq!(toggle('a'), 'A');
        assert_eq!(toggle('Z'), 'z');
        assert_eq!(toggle('5'), '5');
    }

    #[test]
    fn greek_and_cyrillic() {
        assert_eq!(toggle('α'), 'Α');
        assert_eq!(toggle('Ω'), 'ω');
        assert_eq!(toggle('д'), 'Д');
        assert_eq!(toggle('Я'), 'я');
    }

    #[test]
    fn expanding_mapping_is_identity() {
        assert_eq!(toggle('ß'), 'ß');
    }
}
