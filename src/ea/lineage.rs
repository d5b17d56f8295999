//! Lineage bookkeeping: full ancestry history and the hall of fame.
//!
//! Both structures are updated once per generation from the whole
//! population and outlive any single generation.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::multi_objective::{crowding_distance, Dominance};
use super::types::{FitnessComparator, Genome, Individual, IndividualId};

/// One recorded individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "G: Genome")]
pub struct HistoryEntry<G> {
    /// Snapshot of the individual at the time it was recorded.
    pub individual: Individual<G>,
    /// Generation in which it was first recorded.
    pub generation: usize,
}

/// Append-only ancestry ledger.
///
/// Every individual that enters the ledger is assigned the next id; its
/// `parents` field links it to earlier entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "G: Genome")]
pub struct History<G> {
    next_id: IndividualId,
    entries: BTreeMap<IndividualId, HistoryEntry<G>>,
}

impl<G> Default for History<G> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }
}

impl<G: Genome> History<G> {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every individual that does not carry an id yet.
    ///
    /// Assigns ids in population order and returns how many individuals
    /// were recorded. Individuals already in the ledger are left untouched.
    pub fn update(&mut self, population: &mut [Individual<G>], generation: usize) -> usize {
        let mut recorded = 0;
        for ind in population.iter_mut().filter(|ind| ind.id.is_none()) {
            let id = self.next_id;
            self.next_id += 1;
            ind.id = Some(id);
            self.entries.insert(
                id,
                HistoryEntry {
                    individual: ind.clone(),
                    generation,
                },
            );
            recorded += 1;
        }
        recorded
    }

    /// Looks up a recorded individual.
    pub fn get(&self, id: IndividualId) -> Option<&HistoryEntry<G>> {
        self.entries.get(&id)
    }

    /// Direct parents of a recorded individual.
    pub fn parents_of(&self, id: IndividualId) -> Option<&[IndividualId]> {
        self.entries
            .get(&id)
            .map(|entry| entry.individual.parents.as_slice())
    }

    /// All transitive ancestors of `id`, breadth first, without duplicates.
    ///
    /// Unknown ids yield an empty list.
    pub fn ancestors_of(&self, id: IndividualId) -> Vec<IndividualId> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<IndividualId> =
            self.parents_of(id).unwrap_or_default().iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            if let Some(parents) = self.parents_of(current) {
                queue.extend(parents.iter().copied());
            }
        }
        order
    }

    /// Number of recorded individuals.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (IndividualId, &HistoryEntry<G>)> {
        self.entries.iter().map(|(&id, entry)| (id, entry))
    }
}

/// Bounded hall of fame of mutually non-dominated individuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "G: Genome")]
pub struct Archive<G> {
    capacity: usize,
    members: Vec<Individual<G>>,
}

impl<G> Default for Archive<G> {
    fn default() -> Self {
        Self {
            capacity: usize::MAX,
            members: Vec::new(),
        }
    }
}

impl<G: Genome> Archive<G> {
    /// Creates an empty archive holding at most `capacity` members.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            members: Vec::new(),
        }
    }

    /// Absorbs the valid individuals of `population`.
    ///
    /// An individual is skipped if a member dominates it, or if a member
    /// with the same id or the same objective vector is already present.
    /// Members dominated by a newcomer are evicted. Over capacity, the most
    /// crowded members are dropped. Members end sorted best first.
    ///
    /// Returns the number of individuals admitted.
    pub fn update(&mut self, population: &[Individual<G>], comparator: &dyn FitnessComparator) -> usize {
        let mut admitted = 0;
        for ind in population {
            let Some(values) = ind.values() else {
                continue;
            };

            let rejected = self.members.iter().any(|member| {
                let member_values = member.values().unwrap_or_default();
                (ind.id.is_some() && member.id == ind.id)
                    || member_values == values
                    || comparator.dominates(member_values, values)
            });
            if rejected {
                continue;
            }

            self.members.retain(|member| {
                comparator.dominance(values, member.values().unwrap_or_default())
                    != Dominance::Left
            });
            self.members.push(ind.clone());
            admitted += 1;
        }

        self.truncate(comparator);
        self.sort(comparator);
        admitted
    }

    /// Current members, best first.
    pub fn members(&self) -> &[Individual<G>] {
        &self.members
    }

    /// Maximum number of members.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the archive holds nothing.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn truncate(&mut self, comparator: &dyn FitnessComparator) {
        while self.members.len() > self.capacity {
            let objectives: Vec<Vec<f64>> = self
                .members
                .iter()
                .map(|m| comparator.to_minimization(m.values().unwrap_or_default()))
                .collect();
            let distances = crowding_distance(&objectives);
            let most_crowded = distances
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i)
                .unwrap_or(self.members.len() - 1);
            self.members.remove(most_crowded);
        }
    }

    fn sort(&mut self, comparator: &dyn FitnessComparator) {
        self.members.sort_by(|a, b| {
            let ka = comparator.to_minimization(a.values().unwrap_or_default());
            let kb = comparator.to_minimization(b.values().unwrap_or_default());
            ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

/// Owns the history and the hall of fame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "G: Genome")]
pub struct LineageTracker<G> {
    pub history: History<G>,
    pub archive: Archive<G>,
}

impl<G: Genome> LineageTracker<G> {
    /// Creates a tracker with an empty history and an archive of the given size.
    pub fn new(archive_size: usize) -> Self {
        Self {
            history: History::new(),
            archive: Archive::new(archive_size),
        }
    }

    /// Rebuilds a tracker from checkpointed parts.
    pub fn from_parts(history: History<G>, archive: Archive<G>) -> Self {
        Self { history, archive }
    }

    /// Records a generation's population.
    ///
    /// History first, so archive members carry their ids.
    pub fn update(
        &mut self,
        population: &mut [Individual<G>],
        generation: usize,
        comparator: &dyn FitnessComparator,
    ) {
        let recorded = self.history.update(population, generation);
        let admitted = self.archive.update(population, comparator);
        log::debug!(
            "generation {generation}: {recorded} recorded in history, {admitted} admitted to archive ({} members)",
            self.archive.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ea::types::{Fitness, Objectives};
    use proptest::prelude::*;

    fn scored(genome: u32, values: &[f64]) -> Individual<u32> {
        let mut ind = Individual::new(genome);
        ind.fitness = Fitness::Valid(values.to_vec());
        ind
    }

    #[test]
    fn test_history_assigns_sequential_ids() {
        let mut history = History::new();
        let mut pop = vec![scored(1, &[1.0]), scored(2, &[2.0])];

        assert_eq!(history.update(&mut pop, 1), 2);
        assert_eq!(pop[0].id, Some(1));
        assert_eq!(pop[1].id, Some(2));

        // Re-submitting the same individuals records nothing.
        assert_eq!(history.update(&mut pop, 2), 0);
        assert_eq!(history.len(), 2);
        assert_eq!(history.get(2).map(|e| e.generation), Some(1));
    }

    #[test]
    fn test_ancestors_of() {
        let mut history = History::new();
        let mut founders = vec![scored(1, &[1.0]), scored(2, &[2.0])];
        history.update(&mut founders, 1);

        let mut child = scored(3, &[3.0]);
        child.parents = vec![1, 2];
        let mut grandchild = scored(4, &[4.0]);
        let mut generation = vec![child];
        history.update(&mut generation, 2);

        grandchild.parents = vec![generation[0].id.unwrap(), 1];
        let mut last = vec![grandchild];
        history.update(&mut last, 3);

        assert_eq!(history.ancestors_of(4), vec![3, 1, 2]);
        assert_eq!(history.parents_of(3), Some(&[1, 2][..]));
        assert!(history.ancestors_of(99).is_empty());
    }

    #[test]
    fn test_archive_keeps_only_front() {
        let mut archive = Archive::new(10);
        let cmp = Objectives::Minimize;
        let pop = vec![
            scored(1, &[1.0, 5.0]),
            scored(2, &[3.0, 3.0]),
            scored(3, &[4.0, 4.0]), // dominated by (3, 3)
            scored(4, &[5.0, 1.0]),
        ];
        archive.update(&pop, &cmp);

        let genomes: Vec<u32> = archive.members().iter().map(|m| m.genome).collect();
        assert_eq!(genomes, vec![1, 2, 4]);
    }

    #[test]
    fn test_archive_evicts_dominated_members() {
        let mut archive = Archive::new(10);
        let cmp = Objectives::Maximize;
        archive.update(&[scored(1, &[2.0]), scored(2, &[1.0])], &cmp);
        assert_eq!(archive.len(), 1);

        archive.update(&[scored(3, &[5.0])], &cmp);
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.members()[0].genome, 3);
    }

    #[test]
    fn test_archive_update_is_idempotent() {
        let mut archive = Archive::new(10);
        let cmp = Objectives::Minimize;
        let pop = vec![scored(1, &[1.0, 2.0]), scored(2, &[2.0, 1.0])];

        assert_eq!(archive.update(&pop, &cmp), 2);
        let before = archive.clone();
        assert_eq!(archive.update(&pop, &cmp), 0);
        assert_eq!(archive, before);
    }

    #[test]
    fn test_archive_skips_invalid() {
        let mut archive = Archive::new(3);
        archive.update(&[Individual::new(1u32)], &Objectives::Minimize);
        assert!(archive.is_empty());
    }

    #[test]
    fn test_archive_capacity_keeps_extremes() {
        let mut archive = Archive::new(3);
        let cmp = Objectives::Minimize;
        let pop: Vec<_> = (0..6)
            .map(|i| scored(i, &[i as f64, 5.0 - i as f64]))
            .collect();
        archive.update(&pop, &cmp);

        assert_eq!(archive.len(), 3);
        let genomes: Vec<u32> = archive.members().iter().map(|m| m.genome).collect();
        assert_eq!(genomes.first(), Some(&0));
        assert_eq!(genomes.last(), Some(&5));
    }

    #[test]
    fn test_tracker_records_then_archives() {
        let mut tracker = LineageTracker::new(5);
        let mut pop = vec![scored(1, &[1.0]), scored(2, &[0.5])];
        tracker.update(&mut pop, 1, &Objectives::Minimize);

        assert_eq!(tracker.history.len(), 2);
        assert_eq!(tracker.archive.members()[0].id, Some(2));
    }

    proptest! {
        #[test]
        fn prop_archive_is_mutually_non_dominated(
            points in prop::collection::vec((0u8..20, 0u8..20), 1..40),
            capacity in 1usize..8,
        ) {
            let cmp = Objectives::Minimize;
            let mut archive = Archive::new(capacity);
            for chunk in points.chunks(5) {
                let pop: Vec<_> = chunk
                    .iter()
                    .map(|&(a, b)| scored(0, &[a as f64, b as f64]))
                    .collect();
                archive.update(&pop, &cmp);
            }

            prop_assert!(archive.len() <= capacity);
            let members = archive.members();
            for a in members {
                for b in members {
                    prop_assert!(!cmp.dominates(a.values().unwrap(), b.values().unwrap()));
                }
            }
        }
    }
}
