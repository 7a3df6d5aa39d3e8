//! Compliance officer lookup

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::KycResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
    pub id: String,
    pub name: String,
}

/// Source of the officers alerts and customers can be assigned to
#[async_trait]
pub trait OfficerDirectory: Send + Sync {
    async fn find(&self, officer_id: &str) -> KycResult<Option<Officer>>;
}

/// Fixed officer list
#[derive(Debug, Clone, Default)]
pub struct StaticOfficerDirectory {
    officers: HashMap<String, Officer>,
}

impl StaticOfficerDirectory {
    pub fn new(officers: impl IntoIterator<Item = Officer>) -> Self {
        Self {
            officers: officers.into_iter().map(|o| (o.id.clone(), o)).collect(),
        }
    }

    /// Add an officer whose display name equals the id
    pub fn with_officer(mut self, id: &str) -> Self {
        self.officers.insert(
            id.to_string(),
            Officer {
                id: id.to_string(),
                name: id.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl OfficerDirectory for StaticOfficerDirectory {
    async fn find(&self, officer_id: &str) -> KycResult<Option<Officer>> {
        Ok(self.officers.get(officer_id).cloned())
    }
}
