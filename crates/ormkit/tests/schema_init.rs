//! Schema initializer tests: merging hierarchies, idempotence and collisions.

mod common;

use common::*;
use ormkit::{
    init_tables, ColumnConfig, Database, Entity, EntityDecl, Error, FieldDecl, Hierarchy, Result,
    Row, ScalarType,
};

/// Same entity name as `User`, different shape.
struct UserV2;

impl Entity for UserV2 {
    const NAME: &'static str = "User";

    fn declaration() -> EntityDecl {
        EntityDecl::standard(Self::NAME, "users")
            .field(FieldDecl::scalar("email", ScalarType::String))
            .field(FieldDecl::scalar("nickname", ScalarType::String))
            .column("id", ColumnConfig::new().primary_key())
    }

    fn from_row(_row: Row) -> Result<Self> {
        Ok(Self)
    }

    fn to_row(&self) -> Row {
        Row::new()
    }
}

/// Claims the `users` table under another entity name.
struct Impostor;

impl Entity for Impostor {
    const NAME: &'static str = "Impostor";

    fn declaration() -> EntityDecl {
        EntityDecl::standard(Self::NAME, "users")
            .field(FieldDecl::scalar("email", ScalarType::String))
            .column("id", ColumnConfig::new().primary_key())
    }

    fn from_row(_row: Row) -> Result<Self> {
        Ok(Self)
    }

    fn to_row(&self) -> Row {
        Row::new()
    }
}

/// Declares itself under a name other than its own.
struct Misnamed;

impl Entity for Misnamed {
    const NAME: &'static str = "Misnamed";

    fn declaration() -> EntityDecl {
        EntityDecl::standard("Something", "somethings")
    }

    fn from_row(_row: Row) -> Result<Self> {
        Ok(Self)
    }

    fn to_row(&self) -> Row {
        Row::new()
    }
}

/// References `User` through a text column although its key is an integer.
struct Badge;

impl Entity for Badge {
    const NAME: &'static str = "Badge";

    fn declaration() -> EntityDecl {
        EntityDecl::standard(Self::NAME, "badges")
            .field(FieldDecl::foreign("user", User::NAME))
            .column("id", ColumnConfig::new().primary_key())
            .column(
                "user",
                ColumnConfig::new()
                    .name("user_email")
                    .storage_type(ScalarType::String),
            )
    }

    fn from_row(_row: Row) -> Result<Self> {
        Ok(Self)
    }

    fn to_row(&self) -> Row {
        Row::new()
    }
}

#[tokio::test]
async fn test_hierarchies_share_registry() {
    let db = test_engine();
    let metadata = init(Database::sled("primary", db.engine.clone()), None).await;

    assert_eq!(metadata.len(), 5);
    for entity in ["User", "Skill", "PhoneNumber", "Profile", "Bare"] {
        assert!(metadata.contains(entity), "{} not registered", entity);
    }
    assert_eq!(
        metadata.table_by_name("special_table").unwrap().primary_key,
        "special_id"
    );
    assert_eq!(metadata.table("User").unwrap().primary_key, "id");

    let tables: Vec<String> = db
        .engine
        .list_tables()
        .unwrap()
        .into_iter()
        .map(|t| t.table_name)
        .collect();
    assert_eq!(
        tables,
        vec!["phone_numbers", "profiles", "skills", "special_table", "users"]
    );

    seed_user(&metadata, "ada@example.com").await;
    metadata
        .objects::<Bare>()
        .insert(&Bare {
            special_id: 7,
            name: "seven".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(metadata.objects::<User>().count().await.unwrap(), 1);
    assert_eq!(metadata.objects::<Bare>().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_hierarchies_bind_their_own_handles() {
    let primary_db = test_engine();
    let bare_db = test_engine();
    let primary = Database::sled("primary", primary_db.engine.clone());
    let bare = Database::sled("bare", bare_db.engine.clone());

    let metadata = init_tables(&base(), primary.clone(), None, None)
        .await
        .unwrap();
    let metadata = init_tables(&bare_base(), bare.clone(), None, Some(&metadata))
        .await
        .unwrap();

    assert!(metadata.writer("User").unwrap().same_as(&primary));
    assert!(metadata.writer("Bare").unwrap().same_as(&bare));
    assert!(bare_db.engine.table_info("users").unwrap().is_none());
    assert!(bare_db.engine.table_info("special_table").unwrap().is_some());
}

#[tokio::test]
async fn test_reader_falls_back_to_primary() {
    let db = test_engine();
    let primary = Database::sled("primary", db.engine.clone());
    let replica = Database::sled("replica", db.engine.clone());

    let metadata = init_tables(&base(), primary.clone(), Some(replica.clone()), None)
        .await
        .unwrap();
    assert!(metadata.reader("User").unwrap().same_as(&replica));
    assert!(metadata.writer("User").unwrap().same_as(&primary));

    let metadata = init_tables(&bare_base(), primary.clone(), None, Some(&metadata))
        .await
        .unwrap();
    assert!(metadata.reader("Bare").unwrap().same_as(&primary));
}

#[tokio::test]
async fn test_reinit_is_idempotent() {
    let db = test_engine();
    let primary = Database::sled("primary", db.engine.clone());
    let metadata = init(primary.clone(), None).await;
    seed_user(&metadata, "ada@example.com").await;

    let metadata = init_tables(&base(), primary.clone(), None, Some(&metadata))
        .await
        .unwrap();
    let metadata = init_tables(&bare_base(), primary, None, Some(&metadata))
        .await
        .unwrap();

    assert_eq!(metadata.len(), 5);
    assert_eq!(metadata.objects::<PhoneNumber>().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_conflicting_entity_is_schema_error() {
    let db = test_engine();
    let primary = Database::sled("primary", db.engine.clone());
    let metadata = init(primary.clone(), None).await;

    let err = init_tables(
        &Hierarchy::standard("Base").entity::<UserV2>(),
        primary.clone(),
        None,
        Some(&metadata),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));

    let err = init_tables(
        &Hierarchy::standard("Other").entity::<Impostor>(),
        primary,
        None,
        Some(&metadata),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}

#[tokio::test]
async fn test_same_entity_in_another_hierarchy_keeps_first_binding() {
    let db = test_engine();
    let other_db = test_engine();
    let primary = Database::sled("primary", db.engine.clone());
    let other = Database::sled("other", other_db.engine.clone());
    let metadata = init(primary.clone(), None).await;

    let metadata = init_tables(
        &Hierarchy::standard("Copy").entity::<Skill>(),
        other,
        None,
        Some(&metadata),
    )
    .await
    .unwrap();

    assert_eq!(metadata.len(), 5);
    assert_eq!(metadata.registration("Skill").unwrap().hierarchy, "Base");
    assert!(metadata.writer("Skill").unwrap().same_as(&primary));
    assert!(other_db.engine.table_info("skills").unwrap().is_none());
}

#[tokio::test]
async fn test_failed_merge_keeps_registry() {
    let db = test_engine();
    let primary = Database::sled("primary", db.engine.clone());
    let metadata = init_tables(&base(), primary.clone(), None, None)
        .await
        .unwrap();

    let err = init_tables(
        &Hierarchy::standard("Broken").entity::<UserV2>(),
        primary.clone(),
        None,
        Some(&metadata),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));

    // the earlier registry is still usable and can take the next hierarchy
    assert_eq!(metadata.len(), 4);
    let metadata = init_tables(&bare_base(), primary, None, Some(&metadata))
        .await
        .unwrap();
    assert_eq!(metadata.len(), 5);
    seed_user(&metadata, "ada@example.com").await;
    assert_eq!(metadata.objects::<User>().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_convention_mismatch() {
    let db = test_engine();
    let err = init_tables(
        &Hierarchy::bare("Wrong").entity::<Skill>(),
        Database::sled("primary", db.engine.clone()),
        None,
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_misnamed_declaration() {
    let db = test_engine();
    let err = init_tables(
        &Hierarchy::standard("Base").entity::<Misnamed>(),
        Database::sled("primary", db.engine.clone()),
        None,
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_unregistered_foreign_target() {
    let db = test_engine();
    let err = init_tables(
        &Hierarchy::standard("Phones").entity::<PhoneNumber>(),
        Database::sled("primary", db.engine.clone()),
        None,
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Configuration(_)));
    assert!(db.engine.list_tables().unwrap().is_empty());
}

#[tokio::test]
async fn test_foreign_key_type_mismatch() {
    let db = test_engine();
    let err = init_tables(
        &base().entity::<Badge>(),
        Database::sled("primary", db.engine.clone()),
        None,
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}
