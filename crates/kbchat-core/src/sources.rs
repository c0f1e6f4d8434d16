use fxhash::FxHashSet;

use crate::message::Source;

/// Reduce `sources` to the first entry per distinct citation key (`source` field), keeping order.
///
/// The retrieval backend can cite several chunks of one document; a reader only needs the
/// document once.
pub fn dedup_sources(sources: &[Source]) -> Vec<Source> {
    let mut seen = FxHashSet::default();
    sources
        .iter()
        .filter(|s| seen.insert(s.source.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(key: &str, text: &str, idx: i64) -> Source {
        Source {
            source: key.to_string(),
            chunk_text: text.to_string(),
            chunk_index: idx,
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let input = vec![src("a", "first", 0), src("a", "second", 7), src("b", "only", 2)];
        let out = dedup_sources(&input);
        assert_eq!(out, vec![src("a", "first", 0), src("b", "only", 2)]);
    }

    #[test]
    fn order_follows_first_appearance() {
        let input = vec![src("c", "", 0), src("a", "", 1), src("c", "", 2), src("b", "", 3)];
        let keys: Vec<_> = dedup_sources(&input).into_iter().map(|s| s.source).collect();
        assert_eq!(keys, ["c", "a", "b"]);
    }

    #[test]
    fn empty_input() {
        assert!(dedup_sources(&[]).is_empty());
    }
}
