use crate::core::{Result, Service, ServiceError};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub user_id: u64,
    #[serde(default)]
    pub description: String,
    pub service_name: String,
    #[serde(default)]
    pub service_address: String,
    #[serde(default)]
    pub when: Option<DateTime<FixedOffset>>,
}

impl CreateServiceRequest {
    pub fn new(user_id: u64, service_name: impl Into<String>) -> Self {
        Self {
            user_id,
            description: String::new(),
            service_name: service_name.into(),
            service_address: String::new(),
            when: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.service_address = address.into();
        self
    }

    pub fn when(mut self, when: DateTime<FixedOffset>) -> Self {
        self.when = Some(when);
        self
    }

    pub(crate) fn into_service(self) -> Result<Service> {
        Service::new(
            self.user_id,
            self.description,
            self.service_name,
            self.service_address,
            self.when,
        )
    }
}

/// A single change applied by `ServiceApi::update_service`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceUpdate {
    Description(String),
    Service { name: String, address: String },
    Calendar(Option<DateTime<FixedOffset>>),
}

impl ServiceUpdate {
    pub(crate) fn apply(self, service: &mut Service) -> Result<()> {
        match self {
            Self::Description(description) => service.update_description(description),
            Self::Service { name, address } => service.update_service(name, address),
            Self::Calendar(when) => service.update_calendar(when)?,
        }
        Ok(())
    }
}

/// Parse a service id received as text.
pub fn parse_service_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|err| ServiceError::InvalidArgument(format!("invalid service id '{}': {}", raw, err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_service_id(&format!(" {} ", id)).unwrap(), id);
        assert!(matches!(
            parse_service_id("not-a-uuid"),
            Err(ServiceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: CreateServiceRequest =
            serde_json::from_str(r#"{"user_id": 4, "service_name": "Car service"}"#).unwrap();
        assert_eq!(request, CreateServiceRequest::new(4, "Car service"));
    }

    #[test]
    fn test_update_apply() {
        let mut service = CreateServiceRequest::new(1, "Car service")
            .into_service()
            .unwrap();
        ServiceUpdate::Service {
            name: "Bicycle service".to_string(),
            address: "Garage 2".to_string(),
        }
        .apply(&mut service)
        .unwrap();

        assert_eq!(service.service_name, "Bicycle service");
        assert_eq!(service.service_address, "Garage 2");
    }
}
