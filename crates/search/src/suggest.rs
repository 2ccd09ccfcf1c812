//! `suggest_users`: for unknown author names, propose the closest known
//! authors by Levenshtein ratio.

use std::collections::HashMap;

/// For each name in `requested` not present in `known_authors`, return the 5
/// known authors with the highest Levenshtein similarity ratio. Names that
/// are already known are omitted from the result (the map covers only
/// misses).
pub fn suggest_users(requested: &[String], known_authors: &[String]) -> HashMap<String, Vec<String>> {
    let known_set: std::collections::HashSet<&str> = known_authors.iter().map(String::as_str).collect();

    let mut missing = HashMap::new();
    for name in requested {
        if known_set.contains(name.as_str()) {
            continue;
        }

        let mut scored: Vec<(f64, &String)> = known_authors
            .iter()
            .map(|author| (levenshtein_ratio(name, author), author))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let top5 = scored.into_iter().take(5).map(|(_, author)| author.clone()).collect();
        missing.insert(name.clone(), top5);
    }

    missing
}

/// Similarity in `[0.0, 1.0]`, matching `python-Levenshtein`'s `ratio()`:
/// a weighted edit distance (substitution cost 2, insertion/deletion cost 1)
/// normalised by the summed length, `(len_a + len_b - distance) / (len_a + len_b)`.
/// This is not the same function as a plain normalized edit distance divided
/// by the max length — it weighs substitutions as two single-character edits.
fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let len_a = a.len();
    let len_b = b.len();
    if len_a == 0 && len_b == 0 {
        return 1.0;
    }

    let mut prev: Vec<usize> = (0..=len_b).collect();
    let mut curr = vec![0usize; len_b + 1];
    for i in 1..=len_a {
        curr[0] = i;
        for j in 1..=len_b {
            curr[j] = if a[i - 1] == b[j - 1] {
                prev[j - 1]
            } else {
                (prev[j - 1] + 2).min(prev[j] + 1).min(curr[j - 1] + 1)
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let distance = prev[len_b];

    (len_a + len_b - distance) as f64 / (len_a + len_b) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_authors_are_skipped() {
        let known = vec!["alice".to_string(), "bob".to_string()];
        let result = suggest_users(&["alice".to_string()], &known);
        assert!(result.is_empty());
    }

    #[test]
    fn unknown_author_gets_closest_matches() {
        let known = vec!["alice".to_string(), "alicia".to_string(), "bob".to_string()];
        let result = suggest_users(&["alicce".to_string()], &known);
        let suggestions = result.get("alicce").unwrap();
        assert!(suggestions.len() <= 5);
        assert_eq!(suggestions[0], "alice");
    }

    #[test]
    fn caps_at_five_suggestions() {
        let known: Vec<String> = (0..10).map(|i| format!("user{i}")).collect();
        let result = suggest_users(&["user99".to_string()], &known);
        assert_eq!(result.get("user99").unwrap().len(), 5);
    }

    #[test]
    fn ratio_matches_python_levenshtein_weighting() {
        let ratio = levenshtein_ratio("kitten", "sitting");
        assert!((ratio - 0.6153846153846154).abs() < 1e-9);
    }
}
