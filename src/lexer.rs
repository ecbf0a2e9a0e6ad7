//! Lexical analysis: turning a raw input line into an argument vector.
//!
//! Words are separated by runs of spaces, tabs or newlines. There is no quoting
//! and no escaping, so `echo "a b"` yields the three words `echo`, `"a` and `b"`.

/// Characters that separate words.
const SEPARATORS: [char; 3] = [' ', '\t', '\n'];

fn is_separator(c: char) -> bool {
    SEPARATORS.contains(&c)
}

/// Splits `line` into whitespace-delimited words.
///
/// At most `max_args - 1` words are returned (one slot is reserved for the end
/// marker of the argument vector handed to `execvp`); extra words are dropped
/// without any diagnostic. The returned slices borrow from `line`, which is left
/// untouched, so the same line can be split again.
pub fn split_into_tokens(line: &str, max_args: usize) -> Vec<&str> {
    line.split(is_separator)
        .filter(|word| !word.is_empty())
        .take(max_args.saturating_sub(1))
        .collect()
}

/// Bounds an input line to `max_line - 1` bytes.
///
/// The cut lands on the nearest character boundary at or below the limit.
/// Everything past it is discarded.
pub fn truncate_line(line: &str, max_line: usize) -> &str {
    let limit = max_line.saturating_sub(1);
    if line.len() <= limit {
        return line;
    }
    let mut end = limit;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Returns true when the line holds nothing but separators.
pub fn is_blank(line: &str) -> bool {
    line.chars().all(is_separator)
}
