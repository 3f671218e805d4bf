pub mod eligibility;
pub mod error;
pub mod event_service;
pub mod organization_service;
pub mod position_service;
pub mod prize_service;
pub mod staff_service;
pub mod step_service;
pub mod team_service;
pub mod validation;

use std::sync::Arc;

use crate::bootstrap::Defaults;
use crate::database::Store;

pub use error::{EligibilityError, ServiceError, ServiceResult};
pub use event_service::EventService;
pub use organization_service::OrganizationService;
pub use position_service::PositionService;
pub use prize_service::PrizeService;
pub use staff_service::StaffService;
pub use step_service::StepService;
pub use team_service::TeamService;

/// Every service, sharing one store.
#[derive(Clone)]
pub struct Services {
    pub events: EventService,
    pub steps: StepService,
    pub prizes: PrizeService,
    pub staff: StaffService,
    pub positions: PositionService,
    pub organizations: OrganizationService,
    pub teams: TeamService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, defaults: Defaults) -> Self {
        Self {
            events: EventService::new(store.clone(), defaults),
            steps: StepService::new(store.clone()),
            prizes: PrizeService::new(store.clone()),
            staff: StaffService::new(store.clone(), defaults),
            positions: PositionService::new(store.clone(), defaults),
            organizations: OrganizationService::new(store.clone()),
            teams: TeamService::new(store, defaults),
        }
    }
}
