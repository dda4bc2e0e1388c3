//! The candidate chooser.

use crate::candidate::{Candidate, Proximity, ReferenceSite};
use crate::error::ChooserError;
use crate::settings::{ExclusionStore, exclusion_choices};
use crate::stats::{StatisticsStore, UseSignature};
use source_core::ContentHandle;
use std::sync::Arc;

/// A candidate together with its ranking keys.
#[derive(Debug, Clone, Copy)]
pub struct RankedCandidate<'a> {
    /// The candidate.
    pub candidate: &'a Candidate,
    /// Primary key.
    pub proximity: Proximity,
    /// Secondary key (descending).
    pub use_count: u64,
}

/// Picks one of several ranked candidates, usually by asking the user.
pub trait CandidatePicker {
    /// Return the index into `ranked` of the chosen candidate, or `None` if cancelled.
    fn pick(&mut self, site: &ReferenceSite, ranked: &[RankedCandidate<'_>]) -> Option<usize>;
}

impl<F> CandidatePicker for F
where
    F: FnMut(&ReferenceSite, &[RankedCandidate<'_>]) -> Option<usize>,
{
    fn pick(&mut self, site: &ReferenceSite, ranked: &[RankedCandidate<'_>]) -> Option<usize> {
        self(site, ranked)
    }
}

/// Picker that always accepts the top ranked candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstPicker;

impl CandidatePicker for FirstPicker {
    fn pick(&mut self, _site: &ReferenceSite, ranked: &[RankedCandidate<'_>]) -> Option<usize> {
        (!ranked.is_empty()).then_some(0)
    }
}

/// Disambiguates between several resolution targets for one reference.
///
/// With a single candidate the chooser binds it directly. Otherwise candidates are ordered by
/// [`Proximity`] and then by how often each was picked for the same reference shape before;
/// ties keep their input order. Every successful choice increments the usage counter.
#[derive(Clone)]
pub struct CandidateChooser {
    stats: Arc<dyn StatisticsStore>,
    exclusions: Arc<dyn ExclusionStore>,
}

impl std::fmt::Debug for CandidateChooser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateChooser").finish_non_exhaustive()
    }
}

impl CandidateChooser {
    /// Create a chooser over the given stores.
    pub fn new(stats: Arc<dyn StatisticsStore>, exclusions: Arc<dyn ExclusionStore>) -> Self {
        Self { stats, exclusions }
    }

    /// Statistics store.
    pub fn stats(&self) -> &Arc<dyn StatisticsStore> {
        &self.stats
    }

    /// Exclusion store.
    pub fn exclusions(&self) -> &Arc<dyn ExclusionStore> {
        &self.exclusions
    }

    /// Order `candidates` for `site`. Deterministic for fixed inputs and statistics.
    pub fn rank<'a>(
        &self,
        site: &ReferenceSite,
        candidates: &'a [Candidate],
    ) -> Result<Vec<RankedCandidate<'a>>, ChooserError> {
        let mut ranked = candidates
            .iter()
            .map(|candidate| -> Result<RankedCandidate<'a>, ChooserError> {
                let signature = UseSignature::new(&site.shape, &candidate.qualified_name);
                Ok(RankedCandidate {
                    candidate,
                    proximity: candidate.proximity(site),
                    use_count: self.stats.use_count(&signature)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        ranked.sort_by(|a, b| {
            a.proximity
                .cmp(&b.proximity)
                .then_with(|| b.use_count.cmp(&a.use_count))
        });
        Ok(ranked)
    }

    /// Choose a candidate for `site`.
    ///
    /// Returns `Ok(None)` when the picker cancels; nothing is recorded in that case.
    pub fn choose<'a>(
        &self,
        site: &ReferenceSite,
        candidates: &'a [Candidate],
        picker: &mut dyn CandidatePicker,
    ) -> Result<Option<&'a Candidate>, ChooserError> {
        check_handle(site.handle.as_ref())?;
        for candidate in candidates {
            check_handle(candidate.handle.as_ref())?;
        }

        let chosen = match candidates {
            [] => return Err(ChooserError::EmptyCandidates),
            [only] => only,
            _ => {
                let ranked = self.rank(site, candidates)?;
                let Some(index) = picker.pick(site, &ranked) else {
                    tracing::debug!(shape = %site.shape, "candidate choice cancelled");
                    return Ok(None);
                };
                match ranked.get(index) {
                    Some(entry) => entry.candidate,
                    None => {
                        return Err(ChooserError::InvalidChoice {
                            index,
                            len: ranked.len(),
                        });
                    }
                }
            }
        };

        let signature = UseSignature::new(&site.shape, &chosen.qualified_name);
        let count = self.stats.inc_use_count(&signature)?;
        tracing::debug!(%signature, count, "candidate chosen");
        Ok(Some(chosen))
    }

    /// Record an exclusion. Returns `false` if it was already recorded.
    pub fn exclude(&self, prefix: &str) -> Result<bool, ChooserError> {
        Ok(self.exclusions.add_exclusion(prefix)?)
    }

    /// Exclusion prefixes offered for `candidate`, longest first.
    pub fn exclusion_choices(&self, candidate: &Candidate) -> Vec<String> {
        exclusion_choices(&candidate.qualified_name)
    }
}

fn check_handle(handle: Option<&Arc<ContentHandle>>) -> Result<(), ChooserError> {
    match handle {
        Some(handle) if !handle.is_valid() => Err(ChooserError::Invalidated(handle.id())),
        _ => Ok(()),
    }
}
