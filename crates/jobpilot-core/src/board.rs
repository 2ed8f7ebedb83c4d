//! The current result set and its per-vacancy client state.
//!
//! ## Design
//!
//! The board is the single owner of [`Vacancy`] values. Background work
//! never holds a vacancy; it holds an id plus the board generation it read,
//! and writes back through a method that touches only the fields that work
//! owns. Replacing the result set bumps the generation so that detail
//! results for the old set are dropped instead of landing on the new one.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::model::{Vacancy, VacancyDetail, VacancySummary};
use crate::{Error, Result};

/// Outcome of trying to claim a vacancy for a detail fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Marked loading; the caller must fetch and then merge or fail it.
    Claimed,
    /// Already described, already loading, or no longer on the board.
    Skipped,
    /// The board was replaced since the caller read its generation.
    Superseded,
}

/// Ordered set of vacancies keyed by id.
#[derive(Debug, Default)]
pub struct VacancyBoard {
    generation: u64,
    vacancies: Vec<Vacancy>,
}

impl VacancyBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter bumped on every [`VacancyBoard::replace`].
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces the result set. Every vacancy starts selected with empty
    /// enrichment; repeated ids keep their first occurrence.
    pub fn replace(&mut self, summaries: Vec<VacancySummary>) -> u64 {
        let mut seen = HashSet::new();
        self.vacancies = summaries
            .into_iter()
            .filter(|s| seen.insert(s.id.clone()))
            .map(Vacancy::new)
            .collect();
        self.generation += 1;
        debug!(
            generation = self.generation,
            count = self.vacancies.len(),
            "Board replaced"
        );
        self.generation
    }

    /// Vacancies in result order.
    #[must_use]
    pub fn vacancies(&self) -> &[Vacancy] {
        &self.vacancies
    }

    /// Number of vacancies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vacancies.len()
    }

    /// Returns true if there are no vacancies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vacancies.is_empty()
    }

    /// Looks a vacancy up by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Vacancy> {
        self.vacancies.iter().find(|v| v.id() == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Vacancy> {
        self.vacancies
            .iter_mut()
            .find(|v| v.id() == id)
            .ok_or_else(|| Error::VacancyNotFound(id.to_string()))
    }

    /// Ids that have no description and no fetch in flight, in board order.
    #[must_use]
    pub fn pending_detail_ids(&self) -> Vec<String> {
        self.ids_where(Vacancy::needs_detail)
    }

    /// Ids without an AI score and no analysis in flight.
    #[must_use]
    pub fn unscored_ids(&self) -> Vec<String> {
        self.ids_where(Vacancy::needs_score)
    }

    /// Ids without an AI letter and no generation in flight.
    #[must_use]
    pub fn letterless_ids(&self) -> Vec<String> {
        self.ids_where(Vacancy::needs_letter)
    }

    fn ids_where(&self, predicate: impl Fn(&Vacancy) -> bool) -> Vec<String> {
        self.vacancies
            .iter()
            .filter(|v| predicate(v))
            .map(|v| v.id().to_string())
            .collect()
    }

    /// Marks `id` as loading if it still needs a detail fetch.
    pub fn claim_detail(&mut self, generation: u64, id: &str) -> Claim {
        if generation != self.generation {
            return Claim::Superseded;
        }
        match self.get_mut(id) {
            Ok(vacancy) if vacancy.needs_detail() => {
                vacancy.enrichment.description_loading = true;
                Claim::Claimed
            }
            _ => Claim::Skipped,
        }
    }

    /// Merges a fetched detail and clears the loading flag. Returns false,
    /// changing nothing, if the board was replaced in the meantime.
    pub fn merge_detail(&mut self, generation: u64, id: &str, detail: VacancyDetail) -> bool {
        if generation != self.generation {
            debug!(id, generation, "Dropping detail for superseded result set");
            return false;
        }
        let Ok(vacancy) = self.get_mut(id) else {
            return false;
        };
        let enrichment = &mut vacancy.enrichment;
        enrichment.description = Some(detail.description.unwrap_or_default());
        if detail.schedule.is_some() {
            enrichment.schedule = detail.schedule;
        }
        if detail.employment.is_some() {
            enrichment.employment = detail.employment;
        }
        enrichment.description_loading = false;
        true
    }

    /// Clears the loading flag after a failed fetch; the description stays
    /// absent.
    pub fn fail_detail(&mut self, generation: u64, id: &str) {
        if generation != self.generation {
            return;
        }
        if let Ok(vacancy) = self.get_mut(id) {
            vacancy.enrichment.description_loading = false;
        }
    }

    /// Marks `id` as being analyzed. Returns false if an analysis is
    /// already in flight, or if it is already scored and `rescore` is off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VacancyNotFound`] if `id` is not on the board.
    pub fn claim_score(&mut self, id: &str, rescore: bool) -> Result<bool> {
        let vacancy = self.get_mut(id)?;
        if vacancy.enrichment.score_loading || !(rescore || vacancy.needs_score()) {
            return Ok(false);
        }
        vacancy.enrichment.score_loading = true;
        Ok(true)
    }

    /// Clears the analysis flag and records `score` when there is one.
    /// Returns whether a score was stored.
    pub fn finish_score(&mut self, id: &str, score: Option<u8>) -> bool {
        let Ok(vacancy) = self.get_mut(id) else {
            return false;
        };
        vacancy.enrichment.score_loading = false;
        match score {
            Some(score) => {
                vacancy.enrichment.ai_score = Some(score);
                true
            }
            None => false,
        }
    }

    /// Marks `id` as having a letter generated. Returns false if one is
    /// already being generated, or if a letter exists and `overwrite` is
    /// off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VacancyNotFound`] if `id` is not on the board.
    pub fn claim_letter(&mut self, id: &str, overwrite: bool) -> Result<bool> {
        let vacancy = self.get_mut(id)?;
        if vacancy.enrichment.letter_loading || !(overwrite || vacancy.needs_letter()) {
            return Ok(false);
        }
        vacancy.enrichment.letter_loading = true;
        Ok(true)
    }

    /// Clears the generation flag and stores `letter` when there is one.
    /// Without `overwrite`, a letter written in the meantime is kept.
    /// Returns whether the letter was stored.
    pub fn finish_letter(&mut self, id: &str, letter: Option<String>, overwrite: bool) -> bool {
        let Ok(vacancy) = self.get_mut(id) else {
            return false;
        };
        let enrichment = &mut vacancy.enrichment;
        enrichment.letter_loading = false;
        match letter {
            Some(letter) if overwrite || enrichment.ai_letter.is_none() => {
                enrichment.ai_letter = Some(letter);
                true
            }
            _ => false,
        }
    }

    /// Sets the letter, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VacancyNotFound`] if `id` is not on the board.
    pub fn set_letter(&mut self, id: &str, letter: impl Into<String>) -> Result<()> {
        self.get_mut(id)?.enrichment.ai_letter = Some(letter.into());
        Ok(())
    }

    /// Sets the selection flag of one vacancy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VacancyNotFound`] if `id` is not on the board.
    pub fn set_selected(&mut self, id: &str, selected: bool) -> Result<()> {
        self.get_mut(id)?.enrichment.selected = selected;
        Ok(())
    }

    /// Flips the selection flag of one vacancy and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VacancyNotFound`] if `id` is not on the board.
    pub fn toggle_selected(&mut self, id: &str) -> Result<bool> {
        let enrichment = &mut self.get_mut(id)?.enrichment;
        enrichment.selected = !enrichment.selected;
        Ok(enrichment.selected)
    }

    /// Sets the selection flag of every vacancy.
    pub fn set_all_selected(&mut self, selected: bool) {
        for vacancy in &mut self.vacancies {
            vacancy.enrichment.selected = selected;
        }
    }

    /// True when the board is non-empty and every vacancy is selected.
    #[must_use]
    pub fn all_selected(&self) -> bool {
        !self.vacancies.is_empty() && self.vacancies.iter().all(|v| v.enrichment.selected)
    }

    /// `(id, letter)` of every selected vacancy carrying a letter, in order.
    #[must_use]
    pub fn submittable(&self) -> Vec<(String, String)> {
        self.vacancies
            .iter()
            .filter(|v| v.is_submittable())
            .filter_map(|v| {
                v.enrichment
                    .ai_letter
                    .clone()
                    .map(|letter| (v.id().to_string(), letter))
            })
            .collect()
    }

    /// Number of vacancies a batch submission would send.
    #[must_use]
    pub fn submittable_count(&self) -> usize {
        self.vacancies.iter().filter(|v| v.is_submittable()).count()
    }
}

/// Board handle shared between the facade and background workers.
///
/// The lock is never held across an await point.
#[derive(Debug, Clone, Default)]
pub struct SharedBoard {
    inner: Arc<Mutex<VacancyBoard>>,
}

impl SharedBoard {
    /// Creates an empty shared board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the board.
    pub fn lock(&self) -> MutexGuard<'_, VacancyBoard> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of every vacancy, in order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Vacancy> {
        self.lock().vacancies().to_vec()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::test_support::summaries;

    fn board(ids: &[&str]) -> VacancyBoard {
        let mut board = VacancyBoard::new();
        board.replace(summaries(ids));
        board
    }

    fn detail(text: &str) -> VacancyDetail {
        VacancyDetail {
            description: Some(text.into()),
            schedule: Some("Remote".into()),
            employment: None,
        }
    }

    #[test]
    fn test_replace_selects_all_and_bumps_generation() {
        let mut board = board(&["1", "2", "2", "3"]);
        assert_eq!(board.generation(), 1);
        assert_eq!(board.len(), 3);
        assert!(board.all_selected());

        board.replace(Vec::new());
        assert_eq!(board.generation(), 2);
        assert!(!board.all_selected());
    }

    #[test]
    fn test_claim_is_exclusive() {
        let mut board = board(&["1"]);
        assert_eq!(board.claim_detail(1, "1"), Claim::Claimed);
        assert_eq!(board.claim_detail(1, "1"), Claim::Skipped);
        assert!(board.pending_detail_ids().is_empty());
        assert_eq!(board.claim_detail(1, "missing"), Claim::Skipped);
        assert_eq!(board.claim_detail(0, "1"), Claim::Superseded);
    }

    #[test]
    fn test_merge_touches_only_detail_fields() {
        let mut board = board(&["1"]);
        board.set_letter("1", "my letter").unwrap();
        board.finish_score("1", Some(55));
        board.set_selected("1", false).unwrap();
        board.claim_detail(1, "1");

        assert!(board.merge_detail(1, "1", detail("full")));

        let vacancy = board.get("1").unwrap();
        assert_eq!(vacancy.enrichment.description.as_deref(), Some("full"));
        assert_eq!(vacancy.enrichment.schedule.as_deref(), Some("Remote"));
        assert!(!vacancy.enrichment.description_loading);
        assert_eq!(vacancy.enrichment.ai_letter.as_deref(), Some("my letter"));
        assert_eq!(vacancy.enrichment.ai_score, Some(55));
        assert!(!vacancy.enrichment.selected);
        assert!(board.pending_detail_ids().is_empty());
    }

    #[test]
    fn test_stale_merge_is_dropped() {
        let mut board = board(&["1"]);
        board.claim_detail(1, "1");
        board.replace(summaries(&["1"]));

        assert!(!board.merge_detail(1, "1", detail("old")));
        board.fail_detail(1, "1");

        let vacancy = board.get("1").unwrap();
        assert!(vacancy.enrichment.description.is_none());
        assert!(!vacancy.enrichment.description_loading);
    }

    #[test]
    fn test_failed_fetch_clears_loading() {
        let mut board = board(&["1"]);
        board.claim_detail(1, "1");
        board.fail_detail(1, "1");

        let vacancy = board.get("1").unwrap();
        assert!(vacancy.enrichment.description.is_none());
        assert!(!vacancy.enrichment.description_loading);
    }

    #[test]
    fn test_letter_generation_keeps_user_edit() {
        let mut board = board(&["1", "2"]);
        assert!(board.claim_letter("1", false).unwrap());
        assert!(board.claim_letter("2", false).unwrap());
        board.set_letter("1", "edited").unwrap();

        assert!(!board.finish_letter("1", Some("generated".into()), false));
        assert!(board.finish_letter("2", Some("generated".into()), false));
        assert_eq!(board.get("1").unwrap().enrichment.ai_letter.as_deref(), Some("edited"));
        assert!(!board.get("1").unwrap().enrichment.letter_loading);
        assert_eq!(board.letterless_ids(), Vec::<String>::new());
    }

    #[test]
    fn test_score_claim_is_exclusive() {
        let mut board = board(&["1", "2"]);
        assert!(board.claim_score("1", false).unwrap());
        assert!(!board.claim_score("1", false).unwrap());
        assert!(!board.claim_score("1", true).unwrap());
        assert_eq!(board.unscored_ids(), vec!["2".to_string()]);
        assert!(matches!(board.claim_score("9", false), Err(Error::VacancyNotFound(_))));

        assert!(!board.finish_score("1", None));
        assert_eq!(board.unscored_ids(), vec!["1".to_string(), "2".to_string()]);

        board.claim_score("1", false).unwrap();
        assert!(board.finish_score("1", Some(80)));
        assert!(!board.claim_score("1", false).unwrap());
        assert!(board.claim_score("1", true).unwrap());
    }

    #[test]
    fn test_selection_editing() {
        let mut board = board(&["1", "2", "3"]);
        assert!(!board.toggle_selected("2").unwrap());
        assert!(!board.all_selected());

        board.set_all_selected(true);
        assert!(board.all_selected());
        board.set_all_selected(false);
        assert!(board.vacancies().iter().all(|v| !v.enrichment.selected));

        assert!(matches!(
            board.set_selected("9", true),
            Err(Error::VacancyNotFound(_))
        ));
    }

    #[test]
    fn test_submittable_needs_selection_and_letter() {
        let mut board = board(&["1", "2", "3", "4"]);
        board.set_letter("1", "a").unwrap();
        board.set_letter("2", "b").unwrap();
        board.set_letter("3", " ").unwrap();
        board.set_selected("2", false).unwrap();

        assert_eq!(board.submittable(), vec![("1".to_string(), "a".to_string())]);
        assert_eq!(board.submittable_count(), 1);
    }

    #[test]
    fn test_shared_board_snapshot() {
        let shared = SharedBoard::new();
        shared.lock().replace(summaries(&["1", "2"]));
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].id(), "2");
    }

    proptest! {
        /// However the board is left by earlier passes, a new pass claims
        /// exactly the vacancies without a description that are not already
        /// loading, and never claims one twice.
        #[test]
        fn prop_claims_only_pending_once(states in prop::collection::vec((any::<bool>(), any::<bool>()), 0..24)) {
            let ids: Vec<String> = (0..states.len()).map(|i| i.to_string()).collect();
            let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            let mut board = board(&id_refs);
            for (id, (described, loading)) in ids.iter().zip(&states) {
                if *described {
                    board.claim_detail(1, id);
                    board.merge_detail(1, id, detail("done"));
                } else if *loading {
                    board.claim_detail(1, id);
                }
            }

            let expected: Vec<String> = ids
                .iter()
                .zip(&states)
                .filter(|(_, (described, loading))| !described && !loading)
                .map(|(id, _)| id.clone())
                .collect();
            let pending = board.pending_detail_ids();
            prop_assert_eq!(&pending, &expected);

            for id in &pending {
                prop_assert_eq!(board.claim_detail(1, id), Claim::Claimed);
            }
            for id in &ids {
                prop_assert_ne!(board.claim_detail(1, id), Claim::Claimed);
            }
        }
    }
}
