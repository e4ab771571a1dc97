//! Plan-based access control.
//!
//! DESIGN
//! ======
//! `authorize` is the only decision point. Route-specific gates (including
//! `require_premium`) are plan sets passed to it, so every gate produces the
//! same decision shape and the same denial message format. The decision is a
//! plain value; the HTTP layer maps it to 401/403 in `routes::gate`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// PLAN
// =============================================================================

/// Subscription tier attached to a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
    Enterprise,
}

impl Plan {
    /// Every plan, in the order used for denial messages.
    pub const ALL: [Self; 3] = [Self::Free, Self::Premium, Self::Enterprise];

    /// Parse the stored form. Unknown values yield `None`.
    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "premium" => Some(Self::Premium),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::Free => 0b001,
            Self::Premium => 0b010,
            Self::Enterprise => 0b100,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Free => "FREE",
            Self::Premium => "PREMIUM",
            Self::Enterprise => "ENTERPRISE",
        })
    }
}

// =============================================================================
// PLAN SET
// =============================================================================

/// Set of plans allowed through a gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PlanSet(u8);

impl PlanSet {
    /// The empty set. A gate built from it forbids every principal.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn only(plan: Plan) -> Self {
        Self(plan.bit())
    }

    #[must_use]
    pub fn with(mut self, plan: Plan) -> Self {
        self.insert(plan);
        self
    }

    pub fn insert(&mut self, plan: Plan) {
        self.0 |= plan.bit();
    }

    #[must_use]
    pub fn contains(self, plan: Plan) -> bool {
        self.0 & plan.bit() != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in `Plan::ALL` order.
    pub fn iter(self) -> impl Iterator<Item = Plan> {
        Plan::ALL.into_iter().filter(move |plan| self.contains(*plan))
    }
}

impl FromIterator<Plan> for PlanSet {
    fn from_iter<I: IntoIterator<Item = Plan>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

// =============================================================================
// PRINCIPAL / DECISION
// =============================================================================

/// Authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub subscription_plan: Option<Plan>,
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Unauthorized,
    Forbidden { message: String },
}

/// Denial message for a gate, e.g. `Require PREMIUM or ENTERPRISE plan`.
#[must_use]
pub fn requirement_message(allowed: PlanSet) -> String {
    if allowed.is_empty() {
        return "No plan grants access".to_owned();
    }
    let names = allowed
        .iter()
        .map(|plan| plan.to_string())
        .collect::<Vec<_>>()
        .join(" or ");
    format!("Require {names} plan")
}

// =============================================================================
// AUTHORIZE
// =============================================================================

/// Decide whether `principal` may pass a gate that admits `allowed`.
#[must_use]
pub fn authorize(principal: Option<&Principal>, allowed: PlanSet) -> Decision {
    let Some(principal) = principal else {
        return Decision::Unauthorized;
    };
    match principal.subscription_plan {
        Some(plan) if allowed.contains(plan) => Decision::Allow,
        _ => Decision::Forbidden { message: requirement_message(allowed) },
    }
}

/// Premium-only gate.
#[must_use]
pub fn require_premium(principal: Option<&Principal>) -> Decision {
    authorize(principal, PlanSet::only(Plan::Premium))
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
