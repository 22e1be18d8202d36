//! Edit-distance text similarity

/// Levenshtein edit distance over chars
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Single rolling row
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, ca) in a_chars.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[b_chars.len()]
}

/// Case-insensitive similarity in `[0, 1]`; 1.0 means identical
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(&a, &b) as f64 / max_len as f64
}

/// Best scoring candidate for `hint`; ties keep the earlier candidate
pub fn best_match<'a>(hint: &str, candidates: &'a [String]) -> Option<(&'a str, f64)> {
    candidates
        .iter()
        .map(|c| (c.as_str(), similarity(hint, c)))
        .fold(None, |best, (text, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((text, score)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("flaw", "lawn"), 2);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_similarity_ignores_case() {
        assert_eq!(similarity("Sign In", "sign in"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert!((similarity("login", "logon") - 0.8).abs() < 1e-9);
        assert!(similarity("login", "Sign In") < 0.6);
    }

    #[test]
    fn test_best_match_keeps_first_on_tie() {
        let pool = vec!["Save".to_string(), "Cancel".to_string(), "save".to_string()];
        let (text, score) = best_match("save", &pool).unwrap();
        assert_eq!(text, "Save");
        assert_eq!(score, 1.0);
        assert!(best_match("save", &[]).is_none());
    }
}
