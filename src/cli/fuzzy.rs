//! Abbreviated command matching.

/// Match `input` against a multi-word command `pattern`.
///
/// Each input word must be a case-insensitive prefix of the pattern word in
/// the same position. The input may stop early ("s p" matches "set port",
/// "set" matches every `set` command). Returns whatever follows the last
/// pattern word, i.e. the command arguments.
pub fn fuzzy_match<'a>(pattern: &str, input: &'a str) -> Option<&'a str> {
    let mut rest = input.trim_start();
    for word in pattern.split_whitespace() {
        if rest.is_empty() {
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if !is_prefix_ignore_case(&rest[..end], word) {
            return None;
        }
        rest = rest[end..].trim_start();
    }
    Some(rest)
}

/// `abbrev` is a non-empty, case-insensitive prefix of `word`.
pub fn is_prefix_ignore_case(abbrev: &str, word: &str) -> bool {
    !abbrev.is_empty()
        && word
            .get(..abbrev.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(abbrev))
}

/// `on` / `off`, abbreviated to at least two characters.
pub fn parse_switch(args: &str) -> Option<bool> {
    let word = args.split_whitespace().next()?;
    if word.len() < 2 {
        return None;
    }
    if is_prefix_ignore_case(word, "on") {
        Some(true)
    } else if is_prefix_ignore_case(word, "off") {
        Some(false)
    } else {
        None
    }
}
