//! Subject wildcard matching and the per-subject index.

use std::collections::{BTreeSet, HashMap};

/// Returns true if `subject` is matched by `pattern` under the broker's
/// subject wildcard grammar: tokens separated by `.`; `*` matches exactly
/// one token; `>` matches one or more trailing tokens and must be the last
/// token in the pattern. An empty pattern matches everything.
pub fn matches(pattern: &str, subject: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }

    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return pattern_tokens.next().is_none(),
            (Some(">"), None) => return false,
            (Some("*"), Some(_)) => continue,
            (Some("*"), None) => return false,
            (Some(p), Some(s)) if p == s => continue,
            (Some(_), Some(_)) => return false,
            (Some(_), None) => return false,
            (None, Some(_)) => return false,
            (None, None) => return true,
        }
    }
}

/// Summary of the messages carrying a given subject, as returned by
/// `SubjectsState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectState {
    pub msgs: u64,
    pub first_seq: u64,
    pub last_seq: u64,
}

/// Tracks, per subject, the ordered set of sequences currently stored under
/// it. Layering a `BTreeSet<u64>` under the summary view gives O(log n)
/// oldest-seq lookup (needed by `MaxMsgsPer` enforcement) and O(log n)
/// insert/remove.
#[derive(Debug, Default, Clone)]
pub struct SubjectIndex {
    seqs_by_subject: HashMap<String, BTreeSet<u64>>,
}

impl SubjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.seqs_by_subject.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.seqs_by_subject.is_empty()
    }

    pub fn num_subjects(&self) -> u64 {
        self.seqs_by_subject.len() as u64
    }

    /// Total message count across all subjects. Used to check the
    /// `Σ subjectIndex[s].Msgs == State.Msgs` invariant in tests.
    pub fn total_msgs(&self) -> u64 {
        self.seqs_by_subject.values().map(|s| s.len() as u64).sum()
    }

    pub fn record_store(&mut self, subject: &str, seq: u64) {
        self.seqs_by_subject
            .entry(subject.to_string())
            .or_default()
            .insert(seq);
    }

    pub fn record_remove(&mut self, subject: &str, seq: u64) {
        if let Some(seqs) = self.seqs_by_subject.get_mut(subject) {
            seqs.remove(&seq);
            if seqs.is_empty() {
                self.seqs_by_subject.remove(subject);
            }
        }
    }

    /// Number of messages currently stored under `subject`.
    pub fn count(&self, subject: &str) -> u64 {
        self.seqs_by_subject
            .get(subject)
            .map(|s| s.len() as u64)
            .unwrap_or(0)
    }

    /// The oldest (smallest) sequence stored under `subject`, if any.
    pub fn oldest_seq(&self, subject: &str) -> Option<u64> {
        self.seqs_by_subject.get(subject).and_then(|s| s.iter().next().copied())
    }

    /// All sequences stored under `subject`, oldest first.
    pub fn seqs(&self, subject: &str) -> Vec<u64> {
        self.seqs_by_subject
            .get(subject)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every subject currently tracked. Used by retention when enforcing a
    /// newly tightened `MaxMsgsPer` across the whole index.
    pub fn subjects(&self) -> Vec<String> {
        self.seqs_by_subject.keys().cloned().collect()
    }

    /// Per-subject summaries, filtered by a (possibly empty/wildcard) pattern.
    pub fn subjects_state(&self, pattern: &str) -> HashMap<String, SubjectState> {
        self.seqs_by_subject
            .iter()
            .filter(|(subject, _)| matches(pattern, subject))
            .filter_map(|(subject, seqs)| {
                let first_seq = *seqs.iter().next()?;
                let last_seq = *seqs.iter().next_back()?;
                Some((
                    subject.clone(),
                    SubjectState {
                        msgs: seqs.len() as u64,
                        first_seq,
                        last_seq,
                    },
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pattern_matches_everything() {
        assert!(matches("", "foo.bar"));
        assert!(matches("", ""));
    }

    #[test]
    fn exact_match() {
        assert!(matches("foo.bar", "foo.bar"));
        assert!(!matches("foo.bar", "foo.baz"));
        assert!(!matches("foo.bar", "foo.bar.baz"));
    }

    #[test]
    fn single_token_wildcard() {
        assert!(matches("foo.*", "foo.bar"));
        assert!(matches("foo.*", "foo.baz"));
        assert!(!matches("foo.*", "foo.bar.baz"));
        assert!(!matches("foo.*", "foo"));
        assert!(matches("*.*", "foo.bar"));
    }

    #[test]
    fn trailing_wildcard_matches_one_or_more() {
        assert!(matches("foo.>", "foo.bar"));
        assert!(matches("foo.>", "foo.bar.baz"));
        assert!(!matches("foo.>", "foo"));
        assert!(!matches("foo.bar.>", "foo"));
    }

    #[test]
    fn subject_index_tracks_counts_and_bounds() {
        let mut idx = SubjectIndex::new();
        idx.record_store("foo", 1);
        idx.record_store("foo", 3);
        idx.record_store("bar", 2);

        assert_eq!(idx.count("foo"), 2);
        assert_eq!(idx.oldest_seq("foo"), Some(1));
        assert_eq!(idx.num_subjects(), 2);
        assert_eq!(idx.total_msgs(), 3);

        idx.record_remove("foo", 1);
        assert_eq!(idx.oldest_seq("foo"), Some(3));

        idx.record_remove("foo", 3);
        assert_eq!(idx.count("foo"), 0);
        assert_eq!(idx.num_subjects(), 1);
    }

    #[test]
    fn subjects_state_filters_by_pattern() {
        let mut idx = SubjectIndex::new();
        idx.record_store("foo.a", 1);
        idx.record_store("foo.b", 2);
        idx.record_store("bar", 3);

        let all = idx.subjects_state("");
        assert_eq!(all.len(), 3);

        let foo_only = idx.subjects_state("foo.*");
        assert_eq!(foo_only.len(), 2);
        assert!(foo_only.contains_key("foo.a"));
    }
}
