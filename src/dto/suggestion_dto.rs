use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Suggestion {
    pub id: i64,
    pub league_id: i64,
    pub suggested_by: i64,
    pub title: String,
    pub description: String,
    pub voting_starts: DateTime<Utc>,
    pub voting_ends: DateTime<Utc>,
    pub is_accepted: bool,
    pub is_achieved: bool
}

impl Suggestion {
    pub fn voting_closed(&self, now: DateTime<Utc>) -> bool {
        self.voting_ends <= now
    }

    /// True when the sweep should flip `is_accepted`: voting has closed and
    /// the net tally is strictly above `threshold`. Already accepted
    /// suggestions are never re-evaluated.
    pub fn should_accept(&self, ballot: &Ballot, now: DateTime<Utc>, threshold: i64) -> bool {
        !self.is_accepted && self.voting_closed(now) && ballot.tally() > threshold
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSuggestion {
    pub title: String,
    #[serde(default)]
    pub description: String
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum VoteDirection {
    Upvote,
    Downvote
}

#[derive(Debug, Deserialize)]
pub struct CastVote {
    pub direction: VoteDirection
}

/// Upvote and downvote sets of one suggestion. A user sits in at most one of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ballot {
    pub upvotes: BTreeSet<i64>,
    pub downvotes: BTreeSet<i64>
}

impl Ballot {
    pub fn from_rows(rows: impl IntoIterator<Item = (i64, VoteDirection)>) -> Self {
        let mut ballot = Ballot::default();
        for (user_id, direction) in rows {
            ballot.cast(user_id, direction);
        }
        ballot
    }

    /// Moves `user_id` into the set for `direction`, removing it from the other.
    /// Returns false when the user already held that vote.
    pub fn cast(&mut self, user_id: i64, direction: VoteDirection) -> bool {
        let (add_to, remove_from) = match direction {
            VoteDirection::Upvote => (&mut self.upvotes, &mut self.downvotes),
            VoteDirection::Downvote => (&mut self.downvotes, &mut self.upvotes)
        };
        remove_from.remove(&user_id);
        add_to.insert(user_id)
    }

    pub fn tally(&self) -> i64 {
        self.upvotes.len() as i64 - self.downvotes.len() as i64
    }

    pub fn is_voted_on_by(&self, user_id: i64) -> bool {
        self.upvotes.contains(&user_id) || self.downvotes.contains(&user_id)
    }

    pub fn is_upvoted_by(&self, user_id: i64) -> bool {
        self.upvotes.contains(&user_id)
    }
}

#[derive(Debug, Serialize)]
pub struct SuggestionDetail {
    pub suggestion: Suggestion,
    pub upvotes: usize,
    pub downvotes: usize,
    pub tally: i64,
    pub already_voted: bool,
    pub already_upvoted: bool
}

impl SuggestionDetail {
    pub fn new(suggestion: Suggestion, ballot: &Ballot, viewer: i64) -> Self {
        Self {
            suggestion,
            upvotes: ballot.upvotes.len(),
            downvotes: ballot.downvotes.len(),
            tally: ballot.tally(),
            already_voted: ballot.is_voted_on_by(viewer),
            already_upvoted: ballot.is_upvoted_by(viewer)
        }
    }
}

/// Result of one approval sweep.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Suggestions this sweep flipped to accepted.
    pub newly_accepted: Vec<i64>,
    /// Every accepted suggestion in the league that is not yet achieved.
    pub approved: Vec<Suggestion>
}

impl SweepOutcome {
    pub fn newly_accepted(&self) -> impl Iterator<Item = &Suggestion> {
        self.approved.iter().filter(|s| self.newly_accepted.contains(&s.id))
    }
}

#[derive(Serialize)]
pub struct SuggestionUpdate {
    pub r#type: String,
    pub suggestion: Suggestion,
    pub tally: i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn suggestion(voting_ends: DateTime<Utc>) -> Suggestion {
        Suggestion {
            id: 1,
            league_id: 1,
            suggested_by: 1,
            title: "Add a second pitch".to_string(),
            description: String::new(),
            voting_starts: voting_ends - Duration::days(7),
            voting_ends,
            is_accepted: false,
            is_achieved: false
        }
    }

    fn ballot(up: i64, down: i64) -> Ballot {
        let mut ballot = Ballot::default();
        for user in 0..up {
            ballot.cast(user, VoteDirection::Upvote);
        }
        for user in up..up + down {
            ballot.cast(user, VoteDirection::Downvote);
        }
        ballot
    }

    #[test]
    fn switching_vote_moves_user_between_sets() {
        let mut ballot = Ballot::default();

        assert!(ballot.cast(7, VoteDirection::Upvote));
        assert!(ballot.is_upvoted_by(7));
        assert!(!ballot.downvotes.contains(&7));

        assert!(ballot.cast(7, VoteDirection::Downvote));
        assert!(!ballot.is_upvoted_by(7));
        assert!(ballot.downvotes.contains(&7));
        assert!(ballot.is_voted_on_by(7));
        assert!(!(ballot.upvotes.contains(&7) && ballot.downvotes.contains(&7)));
    }

    #[test]
    fn repeating_a_vote_is_idempotent() {
        let mut once = Ballot::default();
        once.cast(3, VoteDirection::Upvote);

        let mut twice = once.clone();
        assert!(!twice.cast(3, VoteDirection::Upvote));
        assert_eq!(once, twice);
    }

    #[test]
    fn tally_is_net_score() {
        assert_eq!(ballot(5, 1).tally(), 4);
        assert_eq!(ballot(1, 4).tally(), -3);
        assert_eq!(Ballot::default().tally(), 0);
    }

    #[test]
    fn from_rows_rebuilds_sets() {
        let ballot = Ballot::from_rows(vec![
            (1, VoteDirection::Upvote),
            (2, VoteDirection::Downvote),
            (3, VoteDirection::Upvote)
        ]);
        assert_eq!(ballot.upvotes.len(), 2);
        assert_eq!(ballot.downvotes.len(), 1);
        assert!(!ballot.is_voted_on_by(4));
    }

    #[test]
    fn accepts_only_closed_suggestions_above_threshold() {
        let now = Utc::now();
        let closed = suggestion(now - Duration::minutes(1));
        let open = suggestion(now + Duration::days(1));

        assert!(closed.should_accept(&ballot(5, 1), now, 3));
        assert!(!closed.should_accept(&ballot(3, 1), now, 3));
        assert!(!closed.should_accept(&ballot(4, 1), now, 3));
        assert!(!open.should_accept(&ballot(10, 0), now, 3));
    }

    #[test]
    fn sweep_outcome_filters_newly_accepted() {
        let now = Utc::now();
        let mut old = suggestion(now - Duration::days(3));
        old.is_accepted = true;
        let mut fresh = suggestion(now - Duration::days(1));
        fresh.id = 2;
        fresh.is_accepted = true;

        let outcome = SweepOutcome { newly_accepted: vec![2], approved: vec![old, fresh] };
        let ids: Vec<i64> = outcome.newly_accepted().map(|s| s.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn voting_closes_exactly_at_voting_ends() {
        let now = Utc::now();
        assert!(suggestion(now).voting_closed(now));
    }

    #[test]
    fn accepted_suggestion_is_not_reconsidered() {
        let now = Utc::now();
        let mut accepted = suggestion(now - Duration::days(1));
        accepted.is_accepted = true;

        assert!(!accepted.should_accept(&ballot(10, 0), now, 3));
        assert!(!accepted.should_accept(&ballot(0, 10), now, 3));
        assert!(accepted.is_accepted);
    }
}
