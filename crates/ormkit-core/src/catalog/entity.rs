//! Entity and view declarations.

use std::collections::BTreeMap;

use super::config::ColumnConfig;
use super::field::FieldDecl;
use super::types::ScalarType;
use crate::validation::PreValidator;

/// Primary-key convention shared by an entity hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convention {
    /// Implicit optional integer `id` field; `id` is the conventional key.
    Standard,
    /// No implicit field and no conventional key.
    Bare,
}

impl Convention {
    /// Field name used as primary key when no override is declared.
    pub fn conventional_key(&self) -> Option<&'static str> {
        match self {
            Convention::Standard => Some("id"),
            Convention::Bare => None,
        }
    }
}

/// Ordered fields plus their pre-normalization hooks.
///
/// This is the part shared by persisted entities and computed views, and the
/// only input the validation pipeline needs.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    /// Owning entity or view name.
    pub name: String,
    /// Field declarations in declaration order.
    pub fields: Vec<FieldDecl>,
    /// Pre-normalization hooks keyed by field, in declaration order.
    pub pre_validators: Vec<(String, PreValidator)>,
}

impl FieldSet {
    /// Create an empty field set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            pre_validators: Vec::new(),
        }
    }

    /// Add a field, replacing an earlier declaration of the same name in place.
    pub fn push(&mut self, field: FieldDecl) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(slot) => *slot = field,
            None => self.fields.push(field),
        }
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Hooks registered for `field`, in declaration order.
    pub fn pre_validators_for<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a PreValidator> + 'a {
        self.pre_validators
            .iter()
            .filter(move |(name, _)| name == field)
            .map(|(_, v)| v)
    }
}

/// A persisted entity declaration (table-backed).
#[derive(Debug, Clone)]
pub struct EntityDecl {
    /// Fields and hooks.
    pub shape: FieldSet,
    /// Physical table name.
    pub table_name: String,
    /// Primary-key convention.
    pub convention: Convention,
    /// Explicit primary-key field (`get_primary_key` override).
    pub primary_key_override: Option<String>,
    /// Field views use to look this entity up.
    pub cache_field: Option<String>,
    /// Per-field storage attributes.
    pub table_config: BTreeMap<String, ColumnConfig>,
}

impl EntityDecl {
    /// Declare an entity under the standard convention.
    ///
    /// An optional integer `id` field is declared first; redeclaring `id`
    /// replaces it.
    pub fn standard(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        let mut decl = Self::with_convention(name, table_name, Convention::Standard);
        decl.shape.push(FieldDecl::optional("id", ScalarType::Int));
        decl
    }

    /// Declare an entity under the bare convention.
    pub fn bare(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self::with_convention(name, table_name, Convention::Bare)
    }

    fn with_convention(
        name: impl Into<String>,
        table_name: impl Into<String>,
        convention: Convention,
    ) -> Self {
        Self {
            shape: FieldSet::new(name),
            table_name: table_name.into(),
            convention,
            primary_key_override: None,
            cache_field: None,
            table_config: BTreeMap::new(),
        }
    }

    /// Add a field.
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.shape.push(field);
        self
    }

    /// Set the storage attributes of a field.
    pub fn column(mut self, field: impl Into<String>, config: ColumnConfig) -> Self {
        self.table_config.insert(field.into(), config);
        self
    }

    /// Register a pre-normalization hook.
    pub fn pre_validator(mut self, field: impl Into<String>, hook: PreValidator) -> Self {
        self.shape.pre_validators.push((field.into(), hook));
        self
    }

    /// Override the primary-key field.
    pub fn primary_key_field(mut self, field: impl Into<String>) -> Self {
        self.primary_key_override = Some(field.into());
        self
    }

    /// Set the cache lookup field.
    pub fn cache_field(mut self, field: impl Into<String>) -> Self {
        self.cache_field = Some(field.into());
        self
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        &self.shape.name
    }

    /// The primary-key field this declaration resolves to, if any:
    /// the explicit override, else the convention's key when declared.
    pub fn get_primary_key(&self) -> Option<&str> {
        if let Some(pk) = &self.primary_key_override {
            return Some(pk);
        }
        self.convention
            .conventional_key()
            .filter(|key| self.shape.get_field(key).is_some())
    }

    /// Storage attributes for a field (defaults when unconfigured).
    pub fn column_config(&self, field: &str) -> ColumnConfig {
        self.table_config.get(field).cloned().unwrap_or_default()
    }
}

/// A computed, read-only view declaration (no backing table).
#[derive(Debug, Clone)]
pub struct ViewDecl {
    /// Fields and hooks.
    pub shape: FieldSet,
    /// Namespace of the stored value's key.
    pub cache_key: String,
    /// Field of the input used to look the value up.
    pub cache_field: String,
}

impl ViewDecl {
    /// Declare a view.
    pub fn new(
        name: impl Into<String>,
        cache_key: impl Into<String>,
        cache_field: impl Into<String>,
    ) -> Self {
        Self {
            shape: FieldSet::new(name),
            cache_key: cache_key.into(),
            cache_field: cache_field.into(),
        }
    }

    /// Add a field.
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.shape.push(field);
        self
    }

    /// Register a pre-normalization hook.
    pub fn pre_validator(mut self, field: impl Into<String>, hook: PreValidator) -> Self {
        self.shape.pre_validators.push((field.into(), hook));
        self
    }

    /// View name.
    pub fn name(&self) -> &str {
        &self.shape.name
    }
}
