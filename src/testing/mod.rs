//! Fixtures for service-level tests, backed by the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::bootstrap::{ensure_defaults, Defaults};
use crate::config::BootstrapConfig;
use crate::database::models::{EventDetail, OrganizationDetail, Staff, Team};
use crate::database::MemoryStore;
use crate::services::event_service::NewEvent;
use crate::services::organization_service::NewOrganization;
use crate::services::prize_service::NewPrize;
use crate::services::staff_service::NewStaff;
use crate::services::step_service::NewStep;
use crate::services::team_service::NewTeam;
use crate::services::Services;

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub defaults: Defaults,
    pub services: Services,
}

impl TestContext {
    /// A freshly provisioned store with the default organization in place.
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let defaults = ensure_defaults(store.as_ref(), &BootstrapConfig::default())
            .await
            .expect("failed to provision defaults");
        let services = Services::new(store.clone(), defaults);
        Self {
            store,
            defaults,
            services,
        }
    }

    pub fn new_staff(name: &str) -> NewStaff {
        NewStaff {
            first_name: name.to_string(),
            last_name: "Tester".to_string(),
            email: format!("{}.{}@example.com", name.replace(' ', "."), Uuid::new_v4().simple()),
            password: "secret-password".to_string(),
            sex: "female".to_string(),
            ..Default::default()
        }
    }

    /// A step open from now until `hours` from now, worth up to 100 points.
    pub fn new_step(name: &str, hours: i64) -> NewStep {
        NewStep {
            name: name.to_string(),
            max_score: 100,
            end_date: (Utc::now() + Duration::hours(hours)).to_rfc3339(),
            ..Default::default()
        }
    }

    pub fn new_prize(name: &str, prize_type: &str, count: i32) -> NewPrize {
        NewPrize {
            name: name.to_string(),
            prize_type: prize_type.to_string(),
            prize_status: "common".to_string(),
            count,
            data: Some("https://cdn.example.com/prize.png".to_string()),
            ..Default::default()
        }
    }

    /// A staff member of the default organization.
    pub async fn staff(&self, name: &str) -> Staff {
        self.services
            .staff
            .create_staff(Self::new_staff(name))
            .await
            .expect("failed to create staff")
    }

    pub async fn staff_in(&self, organization_id: Uuid, team_id: Uuid) -> Staff {
        let mut new = Self::new_staff("member");
        new.organization_id = Some(organization_id);
        new.team_id = Some(team_id);
        self.services
            .staff
            .create_staff(new)
            .await
            .expect("failed to create staff")
    }

    /// An untyped organization with its default team and position.
    pub async fn organization(&self, name: &str) -> OrganizationDetail {
        self.services
            .organizations
            .create_organization(
                NewOrganization {
                    name: name.to_string(),
                    website_url: "https://example.com".to_string(),
                    ..Default::default()
                },
                None,
            )
            .await
            .expect("failed to create organization")
    }

    pub async fn team(&self, organization_id: Uuid, name: &str) -> Team {
        self.services
            .teams
            .create_team(NewTeam {
                organization_id: Some(organization_id),
                name: name.to_string(),
                description: None,
            })
            .await
            .expect("failed to create team")
    }

    pub async fn event(&self, creator_id: Uuid, event_type: Option<&str>) -> EventDetail {
        self.services
            .events
            .create_event(
                NewEvent {
                    name: "Test event".to_string(),
                    event_type: event_type.map(str::to_string),
                    ..Default::default()
                },
                creator_id,
            )
            .await
            .expect("failed to create event")
    }

    /// A public event with `count` steps ending two hours apart.
    pub async fn event_with_steps(&self, creator_id: Uuid, count: usize) -> EventDetail {
        let steps = (0..count)
            .map(|i| Self::new_step(&format!("step {}", i + 1), (i as i64 + 1) * 2))
            .collect();
        self.services
            .events
            .create_event(
                NewEvent {
                    name: "Stepped event".to_string(),
                    steps,
                    ..Default::default()
                },
                creator_id,
            )
            .await
            .expect("failed to create event")
    }
}
