use super::{Result, ServiceError};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A scheduled service entry owned by a user.
///
/// `when_local` keeps the offset the caller supplied; `when_utc` is the same
/// instant normalized to UTC. Both are either set or unset together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub user_id: u64,
    pub description: String,
    pub service_name: String,
    pub service_address: String,
    pub when_local: Option<DateTime<FixedOffset>>,
    pub when_utc: Option<DateTime<Utc>>,
}

impl Service {
    /// Create a new service with a freshly generated id.
    ///
    /// Fails when `user_id` is zero or `when` is not in the future.
    pub fn new(
        user_id: u64,
        description: impl Into<String>,
        service_name: impl Into<String>,
        service_address: impl Into<String>,
        when: Option<DateTime<FixedOffset>>,
    ) -> Result<Self> {
        if user_id == 0 {
            return Err(ServiceError::Validation(
                "can't create service entry for non-existing user".to_string(),
            ));
        }

        let mut service = Self {
            id: Uuid::new_v4(),
            user_id,
            description: description.into(),
            service_name: service_name.into(),
            service_address: service_address.into(),
            when_local: None,
            when_utc: None,
        };
        service.update_calendar(when)?;

        Ok(service)
    }

    pub fn update_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn update_service(
        &mut self,
        service_name: impl Into<String>,
        service_address: impl Into<String>,
    ) {
        self.service_name = service_name.into();
        self.service_address = service_address.into();
    }

    /// Reschedule the service. `None` clears the calendar.
    pub fn update_calendar(&mut self, when: Option<DateTime<FixedOffset>>) -> Result<()> {
        let Some(when) = when else {
            self.when_local = None;
            self.when_utc = None;
            return Ok(());
        };

        if when.with_timezone(&Utc) <= Utc::now() {
            return Err(ServiceError::Validation(
                "can't update calendar to the date in the past".to_string(),
            ));
        }

        self.when_local = Some(when);
        self.when_utc = Some(when.with_timezone(&Utc));
        Ok(())
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Service {{ id: {}, user_id: {}, name: {:?}, address: {:?}",
            self.id, self.user_id, self.service_name, self.service_address
        )?;
        if let Some(when) = self.when_utc {
            write!(f, ", when_utc: {}", when.to_rfc3339())?;
        }
        write!(f, " }}")
    }
}
