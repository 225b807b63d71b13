//! Change-detection sampling for extracted field values.

/// Suppresses re-emission of an unchanged field value.
///
/// Per-worker, per-field state: the worker feeds every extracted value
/// through `observe` and only delivers when it returns true. The first
/// observation always emits; equal repeats are suppressed; a changed
/// value emits again and becomes the new baseline.
#[derive(Debug)]
pub struct ChangeFilter<T> {
    last: Option<T>,
}

// Manual impl: the derive would demand `T: Default`, but an empty
// `Option<T>` needs no such bound.
impl<T> Default for ChangeFilter<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T: PartialEq> ChangeFilter<T> {
    /// A filter with no prior observation.
    #[must_use]
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Record an observation. Returns true when the value should be
    /// emitted (first observation, or different from the last emitted).
    pub fn observe(&mut self, value: T) -> bool {
        if self.last.as_ref() == Some(&value) {
            return false;
        }
        self.last = Some(value);
        true
    }

    /// Drop the baseline; the next observation emits again.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// The last emitted value, if any.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    #[test]
    fn test_first_observation_emits() {
        let mut filter = ChangeFilter::new();
        assert!(filter.observe(json!({"R": 10})));
    }

    #[test]
    fn test_emit_suppress_sequence() {
        // [{"R":10},{"R":10},{"R":12}] must yield exactly two emissions
        let mut filter = ChangeFilter::new();
        let observations = [json!({"R": 10}), json!({"R": 10}), json!({"R": 12})];

        let emitted = observations
            .into_iter()
            .filter(|v| filter.observe(v.clone()))
            .count();
        assert_eq!(emitted, 2);
    }

    #[test]
    fn test_repeat_of_new_value_suppressed() {
        let mut filter = ChangeFilter::new();
        assert!(filter.observe(1));
        assert!(filter.observe(2));
        assert!(!filter.observe(2));
        assert!(filter.observe(1));
    }

    #[test]
    fn test_set_comparison_is_order_insensitive() {
        let mut filter = ChangeFilter::new();
        let first: BTreeSet<String> = ["4", "W", "1"].iter().map(ToString::to_string).collect();
        let same_reordered: BTreeSet<String> =
            ["W", "1", "4"].iter().map(ToString::to_string).collect();

        assert!(filter.observe(first));
        assert!(!filter.observe(same_reordered));
    }

    #[test]
    fn test_default_needs_no_default_bound() {
        // Tracked values (score and odds shapes) deliberately have no
        // Default impl; the filter must still default-construct
        #[derive(PartialEq)]
        struct Opaque(u8);

        let mut filter = ChangeFilter::<Opaque>::default();
        assert!(filter.last().is_none());
        assert!(filter.observe(Opaque(1)));
    }

    #[test]
    fn test_reset_re_emits_same_value() {
        let mut filter = ChangeFilter::new();
        assert!(filter.observe(7));
        assert!(!filter.observe(7));
        filter.reset();
        assert!(filter.observe(7));
    }

    #[test]
    fn test_last_tracks_baseline() {
        let mut filter = ChangeFilter::new();
        assert!(filter.last().is_none());
        filter.observe("a");
        assert_eq!(filter.last(), Some(&"a"));
        filter.observe("a");
        assert_eq!(filter.last(), Some(&"a"));
        filter.observe("b");
        assert_eq!(filter.last(), Some(&"b"));
    }
}
