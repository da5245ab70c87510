//! Alignment markup
//!
//! Mapped tokens are rendered as `{{<index>|<sentence word>}}`, unmapped
//! tokens verbatim. The output is what `AlignedToken::parse` reads back.

/// Render one phrase with its alignment against the sentence
pub fn format_alignment(
    phrase: &[String],
    sentence: &[String],
    alignment: &[Option<usize>],
) -> String {
    phrase
        .iter()
        .enumerate()
        .map(|(i, word)| match alignment.get(i).copied().flatten() {
            Some(pos) if pos < sentence.len() => format!("{{{{{}|{}}}}}", pos, sentence[pos]),
            _ => word.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
