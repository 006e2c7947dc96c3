//------------ VersionedSet --------------------------------------------------

//! A set of values with a bounded history of the changes that led to it.
//!
//! Every update that actually changes the set bumps the version by one and
//! records a [StepDelta]: the values added and removed by that update. The
//! changes between any retained historical version and the current one
//! can then be computed by composing consecutive step deltas into a
//! [CumulativeDelta], without keeping all the historical sets around.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use log::trace;

use crate::cache::config::HistoryRetention;

//------------ StepDelta -----------------------------------------------------

/// The difference between version `version - 1` and `version`.
#[derive(Clone, Debug)]
pub struct StepDelta<T> {
    version: u64,
    created: Instant,
    announced: BTreeSet<T>,
    withdrawn: BTreeSet<T>,
}

impl<T> StepDelta<T> {
    /// The version this step produced.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    pub fn announced(&self) -> &BTreeSet<T> {
        &self.announced
    }

    pub fn withdrawn(&self) -> &BTreeSet<T> {
        &self.withdrawn
    }
}

//------------ CumulativeDelta -----------------------------------------------

/// The changes that transform the set at version `from` into the set at
/// version `to`. The announced and withdrawn values are always disjoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CumulativeDelta<T: Ord> {
    from: u64,
    to: u64,
    announced: BTreeSet<T>,
    withdrawn: BTreeSet<T>,
}

impl<T: Ord + Clone> CumulativeDelta<T> {
    fn empty(version: u64) -> Self {
        Self {
            from: version,
            to: version,
            announced: BTreeSet::new(),
            withdrawn: BTreeSet::new(),
        }
    }

    pub fn from_version(&self) -> u64 {
        self.from
    }

    pub fn to_version(&self) -> u64 {
        self.to
    }

    pub fn announced(&self) -> &BTreeSet<T> {
        &self.announced
    }

    pub fn withdrawn(&self) -> &BTreeSet<T> {
        &self.withdrawn
    }

    pub fn is_empty(&self) -> bool {
        self.announced.is_empty() && self.withdrawn.is_empty()
    }

    /// Returns `(announced, withdrawn)`.
    pub fn into_parts(self) -> (BTreeSet<T>, BTreeSet<T>) {
        (self.announced, self.withdrawn)
    }

    /// Apply this delta to the set as it was at version `from`.
    pub fn apply_to(&self, base: &BTreeSet<T>) -> BTreeSet<T> {
        base.difference(&self.withdrawn)
            .chain(self.announced.iter())
            .cloned()
            .collect()
    }

    // Fold the next step into the running delta. A value announced after
    // it was withdrawn in this window was there at `from`, and a value
    // withdrawn after it was announced in this window was not, so both
    // cancel out.
    fn compose(&mut self, step: &StepDelta<T>) {
        debug_assert_eq!(step.version, self.to + 1);

        for value in &step.announced {
            if !self.withdrawn.remove(value) {
                self.announced.insert(value.clone());
            }
        }
        for value in &step.withdrawn {
            if !self.announced.remove(value) {
                self.withdrawn.insert(value.clone());
            }
        }
        self.to = step.version;

        debug_assert!(self.announced.is_disjoint(&self.withdrawn));
    }
}

//------------ VersionedSet --------------------------------------------------

#[derive(Debug)]
pub struct VersionedSet<T> {
    version: u64,
    values: Arc<BTreeSet<T>>,
    // Contiguous, oldest first. The last entry, if any, produced `version`.
    history: VecDeque<StepDelta<T>>,
    retention: HistoryRetention,
}

impl<T: Ord + Clone> VersionedSet<T> {
    /// Create an empty set at `initial_version`.
    pub fn new(initial_version: u64, retention: HistoryRetention) -> Self {
        Self {
            version: initial_version,
            values: Arc::new(BTreeSet::new()),
            history: VecDeque::new(),
            retention,
        }
    }

    pub fn current_version(&self) -> u64 {
        self.version
    }

    /// The current set. This is a shared handle: later updates replace the
    /// set in the `VersionedSet`, they never modify it.
    pub fn snapshot(&self) -> Arc<BTreeSet<T>> {
        Arc::clone(&self.values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn retention(&self) -> &HistoryRetention {
        &self.retention
    }

    /// The number of step deltas currently retained.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The oldest version a cumulative delta can be computed from.
    pub fn oldest_version(&self) -> u64 {
        self.history
            .front()
            .map(|step| step.version - 1)
            .unwrap_or(self.version)
    }

    /// The step delta that produced `version`, if it is still retained.
    pub fn step_delta(&self, version: u64) -> Option<&StepDelta<T>> {
        let oldest = self.history.front()?.version;
        let idx = usize::try_from(version.checked_sub(oldest)?).ok()?;
        self.history.get(idx)
    }

    /// Replace the current set with `values`. Returns whether the set
    /// changed; if it didn't, the version stays the same and no step delta
    /// is recorded.
    pub fn update(&mut self, values: impl IntoIterator<Item = T>) -> bool {
        self.update_at(values, Instant::now())
    }

    /// Like [update](Self::update), with `now` as the creation time of the
    /// step delta and the reference time for age based retention.
    pub fn update_at(
        &mut self,
        values: impl IntoIterator<Item = T>,
        now: Instant,
    ) -> bool {
        let values: BTreeSet<T> = values.into_iter().collect();

        let announced: BTreeSet<T> =
            values.difference(&self.values).cloned().collect();
        let withdrawn: BTreeSet<T> =
            self.values.difference(&values).cloned().collect();

        if announced.is_empty() && withdrawn.is_empty() {
            return false;
        }

        self.version += 1;
        self.history.push_back(StepDelta {
            version: self.version,
            created: now,
            announced,
            withdrawn,
        });
        self.values = Arc::new(values);
        self.evict(now);

        true
    }

    fn evict(&mut self, now: Instant) {
        // The newest step is never evicted.
        let max_deltas = self.retention.max_deltas().max(1);
        while self.history.len() > max_deltas {
            if let Some(step) = self.history.pop_front() {
                trace!("evict step delta {} (count)", step.version);
            }
        }

        let Some(max_age) = self.retention.max_age() else {
            return;
        };
        while self.history.len() > 1 {
            let expired = self.history.front().is_some_and(|step| {
                now.saturating_duration_since(step.created) > max_age
            });
            if !expired {
                break;
            }
            if let Some(step) = self.history.pop_front() {
                trace!("evict step delta {} (age)", step.version);
            }
        }
    }

    /// The changes from version `from` to the current version, composed
    /// from the retained step deltas.
    ///
    /// Returns `None` if `from` is ahead of the current version, or if the
    /// step deltas needed have already been dropped. An empty delta is
    /// returned if `from` is the current version.
    pub fn cumulative_delta(&self, from: u64) -> Option<CumulativeDelta<T>> {
        if from > self.version || from < self.oldest_version() {
            return None;
        }
        let mut delta = CumulativeDelta::empty(from);
        if from == self.version {
            return Some(delta);
        }

        let oldest = self.history.front()?.version;
        let skip = usize::try_from(from + 1 - oldest).ok()?;
        for step in self.history.iter().skip(skip) {
            delta.compose(step);
        }
        debug_assert_eq!(delta.to, self.version);

        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;

    fn set(values: &[char]) -> BTreeSet<char> {
        values.iter().copied().collect()
    }

    fn versioned(max_deltas: usize) -> VersionedSet<char> {
        VersionedSet::new(0, HistoryRetention::new(max_deltas, None))
    }

    #[test]
    fn test_update_diff() {
        let mut vs = versioned(10);
        assert!(vs.update(set(&['A', 'B'])));
        assert!(vs.update(set(&['A', 'C'])));

        let step = vs.step_delta(2);
        assert_eq!(step.map(|s| s.announced().clone()), Some(set(&['C'])));
        assert_eq!(step.map(|s| s.withdrawn().clone()), Some(set(&['B'])));
        assert_eq!(*vs.snapshot(), set(&['A', 'C']));
    }

    #[test]
    fn test_noop_update() {
        let mut vs = versioned(10);
        assert!(vs.update(set(&['A', 'B'])));
        assert!(!vs.update(set(&['B', 'A'])));

        assert_eq!(vs.current_version(), 1);
        assert_eq!(vs.history_len(), 1);
        assert!(vs.step_delta(2).is_none());
    }

    #[test]
    fn test_compose_removal_of_original_value() {
        let mut vs = versioned(10);
        vs.update(set(&['A', 'B']));
        let base = vs.snapshot();
        let from = vs.current_version();

        vs.update(set(&['A', 'C']));
        vs.update(set(&['C']));

        let delta = vs.cumulative_delta(from);
        assert_eq!(
            delta.map(|d| d.into_parts()),
            Some((set(&['C']), set(&['A', 'B'])))
        );
        assert_eq!(
            vs.cumulative_delta(from).map(|d| d.apply_to(&base)),
            Some(set(&['C']))
        );
    }

    #[test]
    fn test_cancellation() {
        let mut vs = versioned(10);
        vs.update(set(&['A']));
        // A withdrawn then announced again, B announced then withdrawn.
        vs.update(set(&['B']));
        vs.update(set(&['A']));

        let delta = vs.cumulative_delta(1);
        assert_eq!(delta.as_ref().map(|d| d.is_empty()), Some(true));
        assert_eq!(delta.map(|d| (d.from_version(), d.to_version())), Some((1, 3)));
    }

    #[test]
    fn test_delta_from_current_and_future() {
        let mut vs = versioned(10);
        vs.update(set(&['A']));

        assert_eq!(vs.cumulative_delta(1).map(|d| d.is_empty()), Some(true));
        assert!(vs.cumulative_delta(2).is_none());
    }

    #[test]
    fn test_retention_by_count() {
        let mut vs = versioned(2);
        for values in [&['A'][..], &['B'], &['C'], &['D']] {
            vs.update(set(values));
        }

        assert_eq!(vs.current_version(), 4);
        assert_eq!(vs.history_len(), 2);
        assert_eq!(vs.oldest_version(), 2);
        assert!(vs.cumulative_delta(1).is_none());
        assert_eq!(
            vs.cumulative_delta(2).map(|d| d.into_parts()),
            Some((set(&['D']), set(&['B'])))
        );
    }

    #[test]
    fn test_newest_step_is_retained() {
        let mut vs = versioned(0);
        vs.update(set(&['A']));
        vs.update(set(&['B']));

        assert_eq!(vs.history_len(), 1);
        assert_eq!(vs.oldest_version(), 1);
        assert!(vs.cumulative_delta(0).is_none());
        assert_eq!(
            vs.cumulative_delta(1).map(|d| d.into_parts()),
            Some((set(&['B']), set(&['A'])))
        );
    }

    #[test]
    fn test_retention_by_age() {
        let start = Instant::now();
        let mut vs = VersionedSet::new(
            0,
            HistoryRetention::new(10, Some(Duration::from_secs(60))),
        );
        vs.update_at(set(&['A']), start);
        vs.update_at(set(&['B']), start + Duration::from_secs(30));
        vs.update_at(set(&['C']), start + Duration::from_secs(70));

        // The first step is 70 seconds old by now.
        assert_eq!(vs.history_len(), 2);
        assert_eq!(vs.oldest_version(), 1);

        // Everything but the newest step is too old.
        vs.update_at(set(&['D']), start + Duration::from_secs(500));
        assert_eq!(vs.history_len(), 1);
        assert_eq!(vs.oldest_version(), 3);
        assert!(vs.cumulative_delta(3).is_some());
        assert!(vs.cumulative_delta(2).is_none());
    }

    #[test]
    fn test_initial_version() {
        let mut vs: VersionedSet<char> =
            VersionedSet::new(1000, HistoryRetention::default());
        assert_eq!(vs.current_version(), 1000);
        assert_eq!(vs.oldest_version(), 1000);

        vs.update(set(&['A']));
        assert_eq!(vs.current_version(), 1001);
        assert_eq!(
            vs.cumulative_delta(1000).map(|d| d.into_parts()),
            Some((set(&['A']), set(&[])))
        );
    }

    proptest! {
        #[test]
        fn step_diff_reproduces_new_set(
            old in proptest::collection::btree_set(0_u8..32, 0..20),
            new in proptest::collection::btree_set(0_u8..32, 0..20),
        ) {
            let mut vs = VersionedSet::new(0, HistoryRetention::default());
            vs.update(old.clone());
            let changed = vs.update(new.clone());
            prop_assert_eq!(changed, old != new);

            if changed {
                let step = vs.step_delta(vs.current_version());
                prop_assert!(step.is_some());
                let Some(step) = step else { return Ok(()) };
                prop_assert!(step.announced().is_disjoint(step.withdrawn()));
                let applied: BTreeSet<u8> = old
                    .difference(step.withdrawn())
                    .chain(step.announced().iter())
                    .copied()
                    .collect();
                prop_assert_eq!(applied, new);
            }
        }

        #[test]
        fn composition_equals_direct_difference(
            chain in proptest::collection::vec(
                proptest::collection::btree_set(0_u8..16, 0..12),
                1..12,
            )
        ) {
            let mut vs = VersionedSet::new(0, HistoryRetention::new(64, None));
            let mut snapshots = vec![(0_u64, BTreeSet::new())];
            for values in chain {
                if vs.update(values.clone()) {
                    snapshots.push((vs.current_version(), values));
                }
            }
            let current = vs.snapshot();

            for (version, old) in &snapshots {
                let delta = vs.cumulative_delta(*version);
                prop_assert!(delta.is_some());
                let delta = delta.unwrap_or_else(|| CumulativeDelta::empty(0));

                let announced: BTreeSet<u8> =
                    current.difference(old).copied().collect();
                let withdrawn: BTreeSet<u8> =
                    old.difference(&current).copied().collect();

                prop_assert!(delta.announced().is_disjoint(delta.withdrawn()));
                prop_assert_eq!(delta.announced(), &announced);
                prop_assert_eq!(delta.withdrawn(), &withdrawn);
                prop_assert_eq!(&delta.apply_to(old), &*current);
            }
        }
    }
}
