//! Plan visibility transitions.
//!
//! Pure `PlanVisibility -> PlanVisibility` transforms, applied inside an
//! optimistic read-modify-write by the plan service.
//!
//! `apply` clears the allow-list whenever the resulting type is not
//! `Organizations`, while `replace` stores the given list verbatim
//! regardless of type. Records only ever project the allow-list of
//! `Organizations` plans (see [`effective_organizations`]).

use uuid::Uuid;

use crate::models::plan::{PlanVisibility, VisibilityType};

/// De-duplicate while keeping first-seen order.
fn uniq(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Set the type and union `organizations` into the allow-list. A
/// non-`Organizations` type clears the list.
pub fn apply(
    current: PlanVisibility,
    visibility_type: VisibilityType,
    organizations: &[Uuid],
) -> PlanVisibility {
    let organizations = if visibility_type == VisibilityType::Organizations {
        uniq(
            current
                .organizations
                .into_iter()
                .chain(organizations.iter().copied()),
        )
    } else {
        Vec::new()
    };

    PlanVisibility {
        visibility_type,
        organizations,
    }
}

/// Set the type and replace the allow-list wholesale with the
/// de-duplicated `organizations`, whatever the type.
pub fn replace(
    _current: PlanVisibility,
    visibility_type: VisibilityType,
    organizations: &[Uuid],
) -> PlanVisibility {
    PlanVisibility {
        visibility_type,
        organizations: uniq(organizations.iter().copied()),
    }
}

/// Drop one organization from the allow-list. The type is untouched and
/// an absent organization is a no-op.
pub fn remove_organization(current: PlanVisibility, organization: Uuid) -> PlanVisibility {
    PlanVisibility {
        visibility_type: current.visibility_type,
        organizations: current
            .organizations
            .into_iter()
            .filter(|id| *id != organization)
            .collect(),
    }
}

/// Organizations to project onto API records: the allow-list for
/// `Organizations` plans, nothing otherwise.
pub fn effective_organizations(visibility: &PlanVisibility) -> &[Uuid] {
    match visibility.visibility_type {
        VisibilityType::Organizations => &visibility.organizations,
        _ => &[],
    }
}
