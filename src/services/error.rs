use thiserror::Error;
use uuid::Uuid;

use crate::database::models::UnknownVariant;
use crate::database::DatabaseError;

/// Why an invitee may not join an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EligibilityError {
    #[error("staff {staff_id} shares no team with an organizer of event {event_id}")]
    NoSharedTeam { staff_id: Uuid, event_id: Uuid },

    #[error("staff {staff_id} is not a member of organization {organization_id}")]
    OutsideOrganization { staff_id: Uuid, organization_id: Uuid },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Eligibility(#[from] EligibilityError),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Exhausted(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("storage failure: {0}")]
    Storage(DatabaseError),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(what: &str, id: Uuid) -> Self {
        ServiceError::NotFound(format!("{} {} not found", what, id))
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(constraint) => {
                ServiceError::Conflict(format!("already exists ({})", constraint))
            }
            DatabaseError::ForeignKey(constraint) => {
                ServiceError::Conflict(format!("referenced record is missing or still in use ({})", constraint))
            }
            DatabaseError::NotFound(what) => ServiceError::NotFound(what),
            other => ServiceError::Storage(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Parses a stored enum from its wire label, reporting the offending field.
pub fn parse_label<T>(field: &'static str, raw: &str) -> ServiceResult<T>
where
    T: std::str::FromStr<Err = UnknownVariant>,
{
    raw.parse::<T>()
        .map_err(|e| ServiceError::validation(field, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PrizeStatus;

    #[test]
    fn unique_violations_become_conflicts() {
        let err: ServiceError = DatabaseError::Conflict("staff_events_staff_id_event_id_key".into()).into();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn unknown_labels_are_validation_errors() {
        let err = parse_label::<PrizeStatus>("prize_status", "epic").unwrap_err();
        match err {
            ServiceError::Validation { field, message } => {
                assert_eq!(field, "prize_status");
                assert!(message.contains("epic"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(parse_label::<PrizeStatus>("prize_status", "mith").unwrap(), PrizeStatus::Mith);
    }
}
