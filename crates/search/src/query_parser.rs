//! Shell-style term tokenizer and the `vector_query|text_filter` pipeline
//! splitter all query strings pass through before scoring.

/// Parse `text` into `(include_terms, exclude_terms)`.
///
/// - Whitespace separates tokens outside double quotes.
/// - A token prefixed by `-` (outside quotes) is an exclude term; the `-` is
///   consumed.
/// - Double quotes group a token (spaces inside are literal); quotes are
///   consumed, not kept.
/// - Backslash escapes the next character literally.
/// - Empty tokens are dropped.
pub fn parse_search_terms(text: &str) -> (Vec<String>, Vec<String>) {
    let mut include_terms = Vec::new();
    let mut exclude_terms = Vec::new();

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let mut is_exclude = false;
        if chars[i] == '-' {
            is_exclude = true;
            i += 1;
        }

        let mut term = String::new();
        let mut quoted = false;

        while i < chars.len() {
            let c = chars[i];
            if c == '\\' && i + 1 < chars.len() {
                i += 1;
                term.push(chars[i]);
                i += 1;
            } else if c == '"' && !quoted {
                quoted = true;
                i += 1;
            } else if c == '"' && quoted {
                quoted = false;
                i += 1;
                break;
            } else if c.is_whitespace() && !quoted {
                break;
            } else {
                term.push(c);
                i += 1;
            }
        }

        if !term.is_empty() {
            if is_exclude {
                exclude_terms.push(term);
            } else {
                include_terms.push(term);
            }
        }
    }

    (include_terms, exclude_terms)
}

/// Whether `content` satisfies the include/exclude term sets (case-insensitive
/// substring matching on both sides).
pub fn is_text_match(content: &str, include_terms: &[String], exclude_terms: &[String]) -> bool {
    let content_lower = content.to_lowercase();

    if !include_terms.is_empty()
        && !include_terms
            .iter()
            .all(|term| content_lower.contains(&term.to_lowercase()))
    {
        return false;
    }

    if exclude_terms
        .iter()
        .any(|term| content_lower.contains(&term.to_lowercase()))
    {
        return false;
    }

    true
}

/// Split a query on the first unquoted, unescaped `|` into
/// `(vector_query, text_filter)`. Either side may be empty after trimming.
pub fn parse_pipeline_query(query: &str) -> (String, String) {
    let chars: Vec<char> = query.chars().collect();
    let mut quoted = false;
    let mut i = 0;
    let mut split_at = None;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            i += 2;
            continue;
        }
        if c == '"' {
            quoted = !quoted;
        } else if c == '|' && !quoted {
            split_at = Some(i);
            break;
        }
        i += 1;
    }

    match split_at {
        Some(idx) => {
            let left: String = chars[..idx].iter().collect();
            let right: String = chars[idx + 1..].iter().collect();
            (left.trim().to_string(), right.trim().to_string())
        }
        None => (query.trim().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_space_separated() {
        assert_eq!(
            parse_search_terms("hello world"),
            (vec!["hello".to_string(), "world".to_string()], vec![])
        );
    }

    #[test]
    fn double_quote_grouping() {
        assert_eq!(
            parse_search_terms("\"hello world\" test"),
            (vec!["hello world".to_string(), "test".to_string()], vec![])
        );
    }

    #[test]
    fn exclude_terms() {
        assert_eq!(
            parse_search_terms("hello -world"),
            (vec!["hello".to_string()], vec!["world".to_string()])
        );
        assert_eq!(parse_search_terms("-"), (vec![], vec![]));
    }

    #[test]
    fn escape_processing() {
        assert_eq!(
            parse_search_terms(r#"hello \-world"#),
            (vec!["hello".to_string(), "-world".to_string()], vec![])
        );
        assert_eq!(
            parse_search_terms(r#"test \"escaped\" normal"#),
            (
                vec!["test".to_string(), "\"escaped\"".to_string(), "normal".to_string()],
                vec![]
            )
        );
        assert_eq!(parse_search_terms(r"\-"), (vec!["-".to_string()], vec![]));
    }

    #[test]
    fn complex_combination() {
        let (inc, exc) = parse_search_terms(r#"apple "banana cake" -orange -"grape juice" \\backslash"#);
        assert_eq!(
            inc,
            vec!["apple".to_string(), "banana cake".to_string(), "\\backslash".to_string()]
        );
        assert_eq!(exc, vec!["orange".to_string(), "grape juice".to_string()]);
    }

    #[test]
    fn empty_and_whitespace_only() {
        assert_eq!(parse_search_terms(""), (vec![], vec![]));
        assert_eq!(parse_search_terms("   "), (vec![], vec![]));
    }

    #[test]
    fn leading_trailing_whitespace() {
        assert_eq!(
            parse_search_terms("  hello world  "),
            (vec!["hello".to_string(), "world".to_string()], vec![])
        );
    }

    #[test]
    fn pipeline_splits_on_first_unquoted_pipe() {
        assert_eq!(
            parse_pipeline_query("ml learning | rust"),
            ("ml learning".to_string(), "rust".to_string())
        );
        assert_eq!(parse_pipeline_query("just vector"), ("just vector".to_string(), String::new()));
        assert_eq!(parse_pipeline_query("| just text"), (String::new(), "just text".to_string()));
    }

    #[test]
    fn pipeline_ignores_quoted_and_escaped_pipes() {
        assert_eq!(
            parse_pipeline_query(r#""a|b" | text"#),
            ("\"a|b\"".to_string(), "text".to_string())
        );
        assert_eq!(parse_pipeline_query(r"a\|b"), ("a\\|b".to_string(), String::new()));
    }

    #[test]
    fn text_match_is_case_insensitive() {
        assert!(is_text_match("Hello World", &["hello".to_string()], &[]));
        assert!(!is_text_match("Hello World", &[], &["WORLD".to_string()]));
    }
}
