//! Typed persisted entities.

use ormkit_core::{EntityDecl, Result, Row};

/// A persisted entity type.
///
/// The declaration is plain data compiled by the schema initializer; the row
/// conversions move between the typed value and its field-keyed row. Rows
/// handed to `from_row` have already passed the validation pipeline.
///
/// ```ignore
/// impl Entity for Skill {
///     const NAME: &'static str = "Skill";
///
///     fn declaration() -> EntityDecl {
///         EntityDecl::standard(Self::NAME, "skills")
///             .field(FieldDecl::scalar("name", ScalarType::String))
///             .column("id", ColumnConfig::new().primary_key())
///     }
///
///     fn from_row(row: Row) -> Result<Self> {
///         Ok(Self { id: row.field("id")?, name: row.field("name")? })
///     }
///
///     fn to_row(&self) -> Row {
///         Row::new().with("id", self.id).with("name", &self.name)
///     }
/// }
/// ```
pub trait Entity: Sized + Send + Sync + 'static {
    /// Entity name; must match the declaration's name.
    const NAME: &'static str;

    /// Declare fields, table and storage attributes.
    fn declaration() -> EntityDecl;

    /// Build an instance from a validated, field-keyed row.
    fn from_row(row: Row) -> Result<Self>;

    /// Field-keyed row of the instance's current values.
    fn to_row(&self) -> Row;
}
