//! Dominant weather condition of a day

use std::collections::HashMap;

/// Returns the most frequent label in `labels`.
///
/// Ties go to the label whose first occurrence comes earliest in the
/// sequence. Returns `None` for an empty sequence.
#[must_use]
pub fn resolve<S: AsRef<str>>(labels: &[S]) -> Option<&str> {
    // label -> (occurrences, index of first occurrence)
    let mut tally: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, label) in labels.iter().enumerate() {
        tally
            .entry(label.as_ref())
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, index));
    }

    tally
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::majority(&["Clouds", "Clouds", "Rain"], "Clouds")]
    #[case::single(&["Haze"], "Haze")]
    #[case::late_majority(&["Clear", "Rain", "Rain"], "Rain")]
    #[case::tie_first_seen_wins(&["Rain", "Clouds", "Clouds", "Rain"], "Rain")]
    #[case::tie_not_last_completed(&["Mist", "Clear", "Clear", "Mist", "Smoke"], "Mist")]
    #[case::three_way_tie(&["Smoke", "Haze", "Dust"], "Smoke")]
    fn test_resolve(#[case] labels: &[&str], #[case] expected: &str) {
        assert_eq!(resolve(labels), Some(expected));
    }

    #[test]
    fn test_resolve_empty() {
        let labels: Vec<String> = Vec::new();
        assert_eq!(resolve(&labels), None);
    }

    #[test]
    fn test_resolve_owned_labels() {
        let labels = vec!["Clouds".to_string(), "Rain".to_string(), "Rain".to_string()];
        assert_eq!(resolve(&labels), Some("Rain"));
    }
}
