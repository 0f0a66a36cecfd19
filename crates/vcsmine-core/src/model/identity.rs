use serde::{Deserialize, Serialize};

use super::entity::{Entity, Ident};

/// One name/email pair a developer has committed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    #[serde(default)]
    id: Ident,

    pub name: String,

    pub email: String,
}

impl Alias {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Ident::unset(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Whether `other` denotes the same linked record
    ///
    /// Saved aliases compare by identifier, unsaved ones by (name, email).
    pub fn same_record(&self, other: &Alias) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => self.name == other.name && self.email == other.email,
        }
    }
}

impl Entity for Alias {
    fn ident(&self) -> &Ident {
        &self.id
    }

    fn ident_mut(&mut self) -> &mut Ident {
        &mut self.id
    }
}

/// Identity - one developer, reconstituted with all of their aliases
///
/// The alias collection has set semantics (see [`Alias::same_record`]) and
/// keeps arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    id: Ident,

    /// Canonical display name
    pub name: String,

    /// Preferred contact address, if known
    pub primary_email: Option<String>,

    #[serde(default)]
    aliases: Vec<Alias>,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Ident::unset(),
            name: name.into(),
            primary_email: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_primary_email(mut self, email: impl Into<String>) -> Self {
        self.primary_email = Some(email.into());
        self
    }

    /// Add an alias unless the same record is already present
    ///
    /// Returns `true` if the alias was added.
    pub fn add_alias(&mut self, alias: Alias) -> bool {
        if self.aliases.iter().any(|a| a.same_record(&alias)) {
            return false;
        }
        self.aliases.push(alias);
        true
    }

    /// Detach the alias denoting the same record as `alias`
    ///
    /// A detached saved alias keeps its identifier. To move it to another
    /// identity, update this identity before (or in the same batch ahead of)
    /// the one receiving it, so its row is released first.
    pub fn remove_alias(&mut self, alias: &Alias) -> Option<Alias> {
        let idx = self.aliases.iter().position(|a| a.same_record(alias))?;
        Some(self.aliases.remove(idx))
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    /// Mutable access for identifier assignment and field edits
    pub fn aliases_mut(&mut self) -> &mut [Alias] {
        &mut self.aliases
    }

    pub fn has_alias_email(&self, email: &str) -> bool {
        self.aliases.iter().any(|a| a.email == email)
    }
}

impl Entity for Identity {
    fn ident(&self) -> &Ident {
        &self.id
    }

    fn ident_mut(&mut self) -> &mut Ident {
        &mut self.id
    }
}
