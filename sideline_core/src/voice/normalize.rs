//! Transcript normalization shared by command matching and response scoring.

fn is_edge_punct(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | '!' | '?' | ';' | ':' | '"' | '\u{2026}' | '(' | ')' | '-'
    )
}

/// Case-fold, trim, strip trailing punctuation and collapse internal whitespace.
///
/// `"  Start. "` and `"start"` normalize to the same string.
pub fn normalize(text: &str) -> String {
    let folded = text.trim().to_lowercase();
    let stripped = folded.trim_end_matches(|c: char| is_edge_punct(c) || c.is_whitespace());
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a response into lowercase word tokens.
///
/// Commas, semicolons and whitespace separate tokens; punctuation hugging a
/// token is removed while inner apostrophes are kept (`"i'm"`).
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '/'))
        .map(|raw| raw.trim_matches(|c: char| is_edge_punct(c) || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_case_space_and_trailing_punctuation() {
        assert_eq!(normalize("  Start. "), "start");
        assert_eq!(normalize("ADD   error!"), "add error");
        assert_eq!(normalize("Skip test?!"), "skip test");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn tokens_split_on_commas_and_spaces() {
        assert_eq!(
            tokens("Apple, ball.  CAT; i'm done"),
            vec!["apple", "ball", "cat", "i'm", "done"]
        );
        assert!(tokens(" ,, ").is_empty());
    }
}
