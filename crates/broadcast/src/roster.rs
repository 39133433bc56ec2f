//! Aggregation of per-bridge name lists into the global roster string.

use std::collections::HashMap;

use crate::envelope::sanitize_name;

/// Merge per-bridge name lists into one global roster string.
///
/// Each bridge becomes a `"<id>: name, name"` segment with its names
/// sanitized, blank-filtered, and sorted; segments are themselves sorted by
/// their full rendered text and joined with `" - "`. Bridges with an empty
/// identifier (handshake not finished) are skipped. The result is
/// deterministic for any iteration order of the input map, since aggregation is
/// triggered concurrently from every adapter and must not race the displayed
/// order.
pub fn aggregate(lists: &HashMap<String, Vec<String>>) -> String {
    let mut segments: Vec<String> = lists
        .iter()
        .filter(|(id, _)| !id.is_empty())
        .map(|(id, names)| segment(id, names))
        .collect();

    segments.sort();
    segments.join(" - ")
}

/// Render one bridge's roster segment. A bridge with no surviving names
/// still gets a `"<id>: "` segment.
fn segment(bridge_id: &str, names: &[String]) -> String {
    let mut cleaned: Vec<String> = names
        .iter()
        .map(|name| sanitize_name(name))
        .filter(|name| !name.is_empty())
        .collect();

    cleaned.sort();
    format!("{bridge_id}: {}", cleaned.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lists(entries: Vec<(&str, Vec<&str>)>) -> HashMap<String, Vec<String>> {
        entries
            .into_iter()
            .map(|(id, names)| {
                (
                    id.to_string(),
                    names.into_iter().map(String::from).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn worked_example() {
        let input = lists(vec![("irc", vec!["bob", "alice!"]), ("tox", vec!["Carl"])]);
        assert_eq!(aggregate(&input), "irc: alice, bob - tox: Carl");
    }

    #[test]
    fn independent_of_insertion_order() {
        let forward = lists(vec![
            ("irc", vec!["bob", "alice"]),
            ("tox", vec!["Carl"]),
            ("xmpp", vec![]),
        ]);
        let reverse = lists(vec![
            ("xmpp", vec![]),
            ("tox", vec!["Carl"]),
            ("irc", vec!["alice", "bob"]),
        ]);
        assert_eq!(aggregate(&forward), aggregate(&reverse));
    }

    #[test]
    fn idempotent() {
        let input = lists(vec![("a", vec!["x", "y"]), ("b", vec!["z"])]);
        assert_eq!(aggregate(&input), aggregate(&input));
    }

    #[test]
    fn skips_empty_bridge_id() {
        let input = lists(vec![("", vec!["ghost"]), ("irc", vec!["bob"])]);
        assert_eq!(aggregate(&input), "irc: bob");
    }

    #[test]
    fn empty_segment_still_emitted() {
        let input = lists(vec![("irc", vec![]), ("tox", vec!["Carl"])]);
        assert_eq!(aggregate(&input), "irc:  - tox: Carl");
    }

    #[test]
    fn names_that_sanitize_to_nothing_are_dropped() {
        let input = lists(vec![("irc", vec!["!!!", "bob", ""])]);
        assert_eq!(aggregate(&input), "irc: bob");
    }

    #[test]
    fn no_bridges() {
        assert_eq!(aggregate(&HashMap::new()), "");
    }
}
