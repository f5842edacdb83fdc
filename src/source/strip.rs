//! Comment stripper
//!
//! A single left-to-right scan with three states: code, inside a
//! single-quoted literal, inside a double-quoted literal. Escape tracking
//! guarantees a comment-like sequence inside a string is never stripped and
//! an escaped quote never ends the literal. Implemented as a tagged-state
//! loop over the character stream, not layered regular expressions.

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    SingleQuoted,
    DoubleQuoted,
}

/// Remove `//` and `/* … */` comments (doc variants included), preserving
/// string-literal content verbatim. Line comments keep their terminating
/// newline; unterminated block comments are discarded to end of input.
pub fn strip_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut state = State::Code;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match state {
            State::Code => {
                if c == '/' && chars.get(i + 1) == Some(&'*') {
                    i += 2;
                    // discard through the first closing marker
                    while i < chars.len() {
                        if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                            i += 2;
                            break;
                        }
                        i += 1;
                    }
                } else if c == '/' && chars.get(i + 1) == Some(&'/') {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                    // the newline itself is copied on the next iteration
                } else {
                    if c == '\'' {
                        state = State::SingleQuoted;
                    } else if c == '"' {
                        state = State::DoubleQuoted;
                    }
                    out.push(c);
                    i += 1;
                }
            }
            State::SingleQuoted | State::DoubleQuoted => {
                out.push(c);
                if c == '\\' {
                    // escaped character: copy it and stay in the literal
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 2;
                        continue;
                    }
                } else if (c == '\'' && state == State::SingleQuoted)
                    || (c == '"' && state == State::DoubleQuoted)
                {
                    state = State::Code;
                }
                i += 1;
            }
        }
    }

    out
}

/// Whitespace normalization applied after stripping: trailing whitespace
/// removed per line, runs of blank lines collapsed to one, the whole file
/// trimmed, exactly one trailing newline.
pub fn normalize(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0usize;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    let joined = lines.join("\n");
    let mut result = joined.trim().to_string();
    result.push('\n');
    result
}

/// Strip and normalize Solidity files; every other extension passes through
/// unmodified.
pub fn strip_file(path: &str, text: &str) -> String {
    if path.ends_with(".sol") {
        normalize(&strip_comments(text))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_comment_removed_newline_kept() {
        assert_eq!(strip_comments("a; // gone\nb;"), "a; \nb;");
    }

    #[test]
    fn test_block_comment_removed() {
        assert_eq!(strip_comments("a /* gone */ b"), "a  b");
    }

    #[test]
    fn test_doc_comments_removed() {
        let src = "/// doc line\ncode();\n/** doc block */ more();";
        assert_eq!(strip_comments(src), "\ncode();\n more();");
    }

    #[test]
    fn test_string_literal_preserved_verbatim() {
        let src = r#"string s = "a // b";"#;
        assert_eq!(strip_comments(src), src);
        let src2 = r#"string s = "a /* b */ c";"#;
        assert_eq!(strip_comments(src2), src2);
    }

    #[test]
    fn test_escaped_quote_does_not_end_literal() {
        let src = r#"string s = "he said \"hi\" // still a string";"#;
        assert_eq!(strip_comments(src), src);
    }

    #[test]
    fn test_single_quoted_literal() {
        let src = r#"bytes1 c = '/'; x();"#;
        assert_eq!(strip_comments(src), src);
    }

    #[test]
    fn test_block_comment_ends_at_first_closer() {
        assert_eq!(strip_comments("/* a */ code /* b */"), " code ");
    }

    #[test]
    fn test_unterminated_block_discarded_to_eof() {
        assert_eq!(strip_comments("code(); /* runaway"), "code(); ");
    }

    #[test]
    fn test_normalize_collapses_blank_runs() {
        assert_eq!(normalize("a\n\n\n\n\nb"), "a\n\nb\n");
    }

    #[test]
    fn test_normalize_strips_trailing_whitespace() {
        assert_eq!(normalize("a;   \nb;\t"), "a;\nb;\n");
    }

    #[test]
    fn test_normalize_exactly_one_trailing_newline() {
        assert_eq!(normalize("a\n\n\n"), "a\n");
        assert_eq!(normalize("a"), "a\n");
    }

    #[test]
    fn test_strip_file_only_touches_solidity() {
        let json = "{\n  \"key\": \"value\" // not a comment in json\n}\n";
        assert_eq!(strip_file("package.json", json), json);
        assert_eq!(
            strip_file("A.sol", "contract A {} // trailing\n"),
            "contract A {}\n"
        );
    }

    #[test]
    fn test_stripped_comment_markers_inside_strings_survive_end_to_end() {
        let src = "contract A {\n    string u = \"https://example.com/path\"; // keep the url\n}\n";
        let stripped = strip_file("A.sol", src);
        assert!(stripped.contains("https://example.com/path"));
        assert!(!stripped.contains("keep the url"));
    }
}
