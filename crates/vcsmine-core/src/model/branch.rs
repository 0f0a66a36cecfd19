use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, Ident};

/// Branch - a line of development observed in the mined repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default)]
    id: Ident,

    pub name: String,

    pub created_at: DateTime<Utc>,

    /// When the branch was integrated back, if it was
    pub merged_at: Option<DateTime<Utc>>,
}

impl Branch {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Ident::unset(),
            name: name.into(),
            created_at,
            merged_at: None,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

impl Entity for Branch {
    fn ident(&self) -> &Ident {
        &self.id
    }

    fn ident_mut(&mut self) -> &mut Ident {
        &mut self.id
    }
}
