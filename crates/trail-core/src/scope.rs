//! Ownership-scoped visibility.
//!
//! One parameterized policy shared by every entity kind and by history
//! queries: the predicate is pushed into the SQL WHERE clause so that
//! pagination totals stay correct, never applied in memory after the
//! fact. An actor the policy excludes simply sees fewer rows; there is
//! no separate "forbidden" signal.

use rusqlite::types::ToSql;

use crate::model::user::Actor;

/// How far a query may see, derived once per request from the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Distinguished-role actor: the base query is left unmodified.
    Unrestricted,
    /// Ordinary actor: rows where they are creator or current assignee.
    Owned(String),
    /// No resolvable actor: matches zero rows. Fail closed, never open.
    Denied,
}

impl Visibility {
    #[must_use]
    pub fn for_actor(actor: Option<&Actor>) -> Self {
        match actor {
            Some(actor) if actor.is_super() => Self::Unrestricted,
            Some(actor) => Self::Owned(actor.id.clone()),
            None => Self::Denied,
        }
    }

    /// Append this scope's predicate to a WHERE clause under construction.
    ///
    /// `creator_col` and `assignee_col` are the caller's column names
    /// (possibly table-qualified); the predicate shape is identical for
    /// every entity kind. Parameter placeholders continue the caller's
    /// `?N` numbering.
    pub fn push_predicate(
        &self,
        creator_col: &str,
        assignee_col: &str,
        conditions: &mut Vec<String>,
        params: &mut Vec<Box<dyn ToSql>>,
    ) {
        match self {
            Self::Unrestricted => {}
            Self::Owned(user_id) => {
                params.push(Box::new(user_id.clone()));
                let creator_param = params.len();
                params.push(Box::new(user_id.clone()));
                let assignee_param = params.len();
                conditions.push(format!(
                    "({creator_col} = ?{creator_param} OR {assignee_col} = ?{assignee_param})"
                ));
            }
            Self::Denied => conditions.push("0 = 1".to_owned()),
        }
    }
}
