//! Result reporting

use crate::types::{Candidate, CandidateId, Phase, VoteCount};
use serde::{Deserialize, Serialize};

/// Per-candidate share of the vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteResult {
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub vote_count: VoteCount,

    /// `vote_count / total_votes * 100`, 0.0 when nothing has been cast
    pub percentage: f64,
}

/// Snapshot of an election's counts at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyReport {
    pub phase: Phase,

    /// Results in candidate id order
    pub results: Vec<VoteResult>,
    pub total_votes: VoteCount,
}

impl TallyReport {
    pub(crate) fn from_candidates(candidates: &[Candidate], phase: Phase) -> Self {
        let total_votes: VoteCount = candidates.iter().map(|c| c.vote_count).sum();

        let results = candidates
            .iter()
            .map(|candidate| VoteResult {
                candidate_id: candidate.id,
                candidate_name: candidate.name.clone(),
                vote_count: candidate.vote_count,
                percentage: if total_votes > 0 {
                    candidate.vote_count as f64 / total_votes as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        Self {
            phase,
            results,
            total_votes,
        }
    }

    /// Whether no further change to these counts is possible
    pub fn is_final(&self) -> bool {
        self.phase.is_final()
    }

    /// Results by vote count descending, ties by candidate id
    pub fn ranked(&self) -> Vec<VoteResult> {
        let mut ranked = self.results.clone();
        ranked.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then(a.candidate_id.cmp(&b.candidate_id))
        });
        ranked
    }

    /// Every candidate sharing the highest count; empty when no votes
    pub fn leaders(&self) -> Vec<VoteResult> {
        let Some(top) = self.results.iter().map(|r| r.vote_count).max() else {
            return Vec::new();
        };
        if top == 0 {
            return Vec::new();
        }

        self.results
            .iter()
            .filter(|r| r.vote_count == top)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: CandidateId, name: &str, vote_count: VoteCount) -> Candidate {
        Candidate {
            id,
            name: name.to_string(),
            vote_count,
        }
    }

    #[test]
    fn test_percentages() {
        let report = TallyReport::from_candidates(
            &[candidate(1, "A", 3), candidate(2, "B", 1)],
            Phase::Closed,
        );

        assert_eq!(report.total_votes, 4);
        assert!((report.results[0].percentage - 75.0).abs() < f64::EPSILON);
        assert!((report.results[1].percentage - 25.0).abs() < f64::EPSILON);
        assert!(!report.is_final());
    }

    #[test]
    fn test_empty_tally() {
        let report = TallyReport::from_candidates(
            &[candidate(1, "A", 0), candidate(2, "B", 0)],
            Phase::Tallied,
        );

        assert_eq!(report.total_votes, 0);
        assert!(report.results.iter().all(|r| r.percentage == 0.0));
        assert!(report.leaders().is_empty());
        assert!(report.is_final());
    }

    #[test]
    fn test_ranking_and_ties() {
        let report = TallyReport::from_candidates(
            &[
                candidate(1, "A", 2),
                candidate(2, "B", 5),
                candidate(3, "C", 5),
            ],
            Phase::Tallied,
        );

        let order: Vec<_> = report.ranked().iter().map(|r| r.candidate_id).collect();
        assert_eq!(order, vec![2, 3, 1]);

        let leaders: Vec<_> = report.leaders().iter().map(|r| r.candidate_name.clone()).collect();
        assert_eq!(leaders, vec!["B".to_string(), "C".to_string()]);
    }
}
