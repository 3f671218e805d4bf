//! Who may be invited to an event, by event type.

use uuid::Uuid;

use crate::database::models::{EventType, Staff};
use crate::services::error::EligibilityError;

/// What the invitation rules look at.
pub struct Invitee<'a> {
    pub event_id: Uuid,
    pub staff: &'a Staff,
    /// Creators and admins currently on the roster.
    pub organizers: &'a [Staff],
    /// Organization the private-event rule is scoped to.
    pub home_organization: Uuid,
}

impl EventType {
    pub fn check_invitee(&self, invitee: &Invitee<'_>) -> Result<(), EligibilityError> {
        match self {
            EventType::Public => Ok(()),
            EventType::TeamOnly => {
                let shares_team = invitee
                    .organizers
                    .iter()
                    .any(|organizer| organizer.team_id == invitee.staff.team_id);
                if shares_team {
                    Ok(())
                } else {
                    Err(EligibilityError::NoSharedTeam {
                        staff_id: invitee.staff.id,
                        event_id: invitee.event_id,
                    })
                }
            }
            EventType::Private => {
                if invitee.staff.organization_id == invitee.home_organization {
                    Ok(())
                } else {
                    Err(EligibilityError::OutsideOrganization {
                        staff_id: invitee.staff.id,
                        organization_id: invitee.home_organization,
                    })
                }
            }
        }
    }
}
