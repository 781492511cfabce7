//! Canonical token form of completion output.
//!
//! Captured terminal output and expected suggestions are compared as
//! sorted, single-spaced token strings, so column layout and suggestion
//! order do not matter.

/// Reduce text to its sorted whitespace-delimited tokens joined by single spaces.
#[must_use]
pub fn canonicalize(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Normalize raw captured output.
///
/// Lines starting with `prompt_marker` are the shell re-echoing its prompt
/// and the typed command; they are dropped before trimming. Lines that are
/// one character or less after trimming (the bell from the first TAB, a
/// stray `\r`) are dropped too. Everything left is canonicalized.
///
/// Normalizing an already normalized string returns it unchanged, except
/// when its first token starts with `prompt_marker`: the result is one
/// line, so a second pass takes it for a prompt line and returns `""`.
#[must_use]
pub fn normalize_output(raw: &[u8], prompt_marker: char) -> String {
    let text = String::from_utf8_lossy(raw);
    let kept: Vec<&str> = text
        .split('\n')
        .filter(|line| !line.starts_with(prompt_marker))
        .map(str::trim)
        .filter(|line| line.chars().count() > 1)
        .collect();
    canonicalize(&kept.join("\n"))
}
