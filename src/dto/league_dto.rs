use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub head_official_id: i64,
    pub created_at: DateTime<Utc>
}

#[derive(Debug, Deserialize)]
pub struct CreateLeague {
    pub name: String,
    #[serde(default)]
    pub description: String
}

/// Capabilities a user can hold inside a league.
///
/// Each role is checked against its own relation: a user can be an official
/// without being a member, and the head official can be demoted out of the
/// officials set while still owning the league.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Official,
    HeadOfficial
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => write!(f, "a league member"),
            Role::Official => write!(f, "an official"),
            Role::HeadOfficial => write!(f, "the head official")
        }
    }
}

/// A league together with its officials and members sets.
#[derive(Debug, Clone, Serialize)]
pub struct LeagueRoster {
    pub league: League,
    pub officials: BTreeSet<i64>,
    pub members: BTreeSet<i64>
}

impl LeagueRoster {
    pub fn is_member(&self, user_id: i64) -> bool {
        self.members.contains(&user_id)
    }

    pub fn is_official(&self, user_id: i64) -> bool {
        self.officials.contains(&user_id)
    }

    pub fn is_head_official(&self, user_id: i64) -> bool {
        self.league.head_official_id == user_id
    }

    pub fn has_role(&self, user_id: i64, role: Role) -> bool {
        match role {
            Role::Member => self.is_member(user_id),
            Role::Official => self.is_official(user_id),
            Role::HeadOfficial => self.is_head_official(user_id)
        }
    }

    pub fn roles_of(&self, user_id: i64) -> RoleFlags {
        RoleFlags {
            is_member: self.is_member(user_id),
            is_official: self.is_official(user_id),
            is_head_official: self.is_head_official(user_id)
        }
    }

    /// Head official, then officials without the head, then plain members.
    pub fn overview(&self) -> MembershipOverview {
        let head = self.league.head_official_id;
        let officials: BTreeSet<i64> = self.officials.iter()
            .copied()
            .filter(|id| *id != head)
            .collect();
        let members = self.members.iter()
            .copied()
            .filter(|id| *id != head && !officials.contains(id))
            .collect();

        MembershipOverview {
            league: self.league.clone(),
            head_official: head,
            officials,
            members
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleFlags {
    pub is_member: bool,
    pub is_official: bool,
    pub is_head_official: bool
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipAction {
    Promote,
    Demote
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipChange {
    pub user_id: i64,
    pub action: MembershipAction
}

#[derive(Debug, Deserialize)]
pub struct ManageMembership {
    pub changes: Vec<MembershipChange>
}

#[derive(Debug, Serialize)]
pub struct MembershipOverview {
    pub league: League,
    pub head_official: i64,
    pub officials: BTreeSet<i64>,
    pub members: BTreeSet<i64>
}

#[derive(Debug, Serialize)]
pub struct LeagueDetail {
    pub league: League,
    #[serde(flatten)]
    pub roles: RoleFlags
}

#[derive(Serialize)]
pub struct LeagueUpdate {
    pub r#type: String,
    pub league: LeagueRoster
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(head: i64, officials: &[i64], members: &[i64]) -> LeagueRoster {
        LeagueRoster {
            league: League {
                id: 1,
                name: "Sunday Rec".to_string(),
                description: String::new(),
                head_official_id: head,
                created_at: Utc::now()
            },
            officials: officials.iter().copied().collect(),
            members: members.iter().copied().collect()
        }
    }

    #[test]
    fn role_checks_follow_their_own_sets() {
        let league = roster(1, &[1, 2], &[1, 3]);

        assert!(league.has_role(1, Role::HeadOfficial));
        assert!(league.has_role(1, Role::Official));
        assert!(league.has_role(1, Role::Member));

        assert!(league.is_official(2));
        assert!(!league.is_member(2));
        assert!(!league.is_head_official(2));

        assert!(league.is_member(3));
        assert!(!league.is_official(3));

        assert_eq!(league.roles_of(4), RoleFlags::default());
    }

    #[test]
    fn overview_excludes_head_and_officials_from_members() {
        let league = roster(1, &[1, 2], &[1, 2, 3, 4]);
        let overview = league.overview();

        assert_eq!(overview.head_official, 1);
        assert_eq!(overview.officials.into_iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(overview.members.into_iter().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn forbidden_message_names_the_role() {
        assert_eq!(Role::Official.to_string(), "an official");
        assert_eq!(Role::HeadOfficial.to_string(), "the head official");
    }
}
