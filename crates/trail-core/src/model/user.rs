use serde::Serialize;

/// The distinguished role that bypasses all visibility scoping.
///
/// Role checks go through [`Actor::is_super`]; never compare role strings
/// at call sites.
pub const SUPER_ROLE: &str = "super-admin";

/// An authenticated user plus their resolved roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub roles: Vec<String>,
}

impl Actor {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Does this actor hold the distinguished top-level role?
    #[must_use]
    pub fn is_super(&self) -> bool {
        self.has_role(SUPER_ROLE)
    }
}
