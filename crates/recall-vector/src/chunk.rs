/// Splits `text` into at-most-`max_chars` pieces, each addressed by a
/// stable derived id (`{id}#{index}`) so re-upserting the same observation
/// replaces the same set of vectors rather than appending new ones.
pub fn split_into_chunks(id: i64, text: &str, max_chars: usize) -> Vec<(String, String)> {
    if text.len() <= max_chars {
        return vec![(format!("{id}#0"), text.to_string())];
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .enumerate()
        .map(|(idx, chunk)| (format!("{id}#{idx}"), chunk.iter().collect()))
        .collect()
}

/// Recovers the original row id from a derived chunk id (`"42#3"` -> `42`).
pub fn base_id(chunk_id: &str) -> Option<i64> {
    chunk_id.split('#').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_becomes_one_chunk() {
        let chunks = split_into_chunks(1, "hello", 100);
        assert_eq!(chunks, vec![("1#0".to_string(), "hello".to_string())]);
    }

    #[test]
    fn long_text_splits_with_stable_ids() {
        let text = "a".repeat(250);
        let chunks = split_into_chunks(7, &text, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].0, "7#0");
        assert_eq!(chunks[2].0, "7#2");
    }

    #[test]
    fn base_id_recovers_row_id() {
        assert_eq!(base_id("42#3"), Some(42));
        assert_eq!(base_id("42"), Some(42));
    }
}
