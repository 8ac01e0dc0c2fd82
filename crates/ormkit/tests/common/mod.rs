//! Fixture entities, views and engine helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use ormkit::{
    init_tables, CacheView, ColumnConfig, Database, Driver, EmailValidator, Entity, EntityDecl,
    FieldDecl, Hierarchy, Metadata, Operation, Outcome, PoolConfig, PreValidator, Result, Row,
    ScalarType, Secret, SecretValidator, SledDriver, StorageConfig, StorageEngine, TableSchema,
    ValueProducer, ViewDecl,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Bare {
    pub special_id: i64,
    pub name: String,
}

impl Entity for Bare {
    const NAME: &'static str = "Bare";

    fn declaration() -> EntityDecl {
        EntityDecl::bare(Self::NAME, "special_table")
            .field(FieldDecl::scalar("special_id", ScalarType::Int))
            .field(FieldDecl::scalar("name", ScalarType::String))
            .primary_key_field("special_id")
            .column("special_id", ColumnConfig::new().primary_key().index())
    }

    fn from_row(row: Row) -> Result<Self> {
        Ok(Self {
            special_id: row.field("special_id")?,
            name: row.field("name")?,
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("special_id", self.special_id)
            .with("name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub password: Secret,
    pub is_active: bool,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(full_name: &str, email: &str) -> Self {
        Self {
            id: None,
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: Secret::default(),
            is_active: true,
            created: None,
            modified: None,
        }
    }
}

impl Entity for User {
    const NAME: &'static str = "User";

    fn declaration() -> EntityDecl {
        EntityDecl::standard(Self::NAME, "users")
            .field(FieldDecl::scalar("full_name", ScalarType::String))
            .field(FieldDecl::scalar("email", ScalarType::String).with_validator(EmailValidator))
            .field(
                FieldDecl::scalar("password", ScalarType::String)
                    .with_default("")
                    .with_validator(SecretValidator::new()),
            )
            .field(FieldDecl::scalar("is_active", ScalarType::Bool).with_default(true))
            .field(FieldDecl::optional("created", ScalarType::Timestamp))
            .field(FieldDecl::optional("modified", ScalarType::Timestamp))
            .cache_field("email")
            .column("id", ColumnConfig::new().primary_key().index())
            .column("full_name", ColumnConfig::new().index())
            .column("email", ColumnConfig::new().unique())
            .column("is_active", ColumnConfig::new().default_value(true))
            .column("created", ColumnConfig::new().default_with(ValueProducer::now()))
            .column("modified", ColumnConfig::new().onupdate(ValueProducer::now()))
            .pre_validator("full_name", PreValidator::empty_string())
            .pre_validator("email", PreValidator::empty_string())
    }

    fn from_row(row: Row) -> Result<Self> {
        Ok(Self {
            id: row.field("id")?,
            full_name: row.field("full_name")?,
            email: row.field("email")?,
            password: row.field("password")?,
            is_active: row.field("is_active")?,
            created: row.field("created")?,
            modified: row.field("modified")?,
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("full_name", &self.full_name)
            .with("email", &self.email)
            .with("password", self.password.clone())
            .with("is_active", self.is_active)
            .with("created", self.created)
            .with("modified", self.modified)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skill {
    pub id: Option<i64>,
    pub name: String,
}

impl Entity for Skill {
    const NAME: &'static str = "Skill";

    fn declaration() -> EntityDecl {
        EntityDecl::standard(Self::NAME, "skills")
            .field(FieldDecl::scalar("name", ScalarType::String))
            .cache_field("name")
            .column("id", ColumnConfig::new().primary_key())
    }

    fn from_row(row: Row) -> Result<Self> {
        Ok(Self {
            id: row.field("id")?,
            name: row.field("name")?,
        })
    }

    fn to_row(&self) -> Row {
        Row::new().with("id", self.id).with("name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhoneNumber {
    pub id: Option<i64>,
    pub number: String,
    pub user: i64,
}

impl Entity for PhoneNumber {
    const NAME: &'static str = "PhoneNumber";

    fn declaration() -> EntityDecl {
        EntityDecl::standard(Self::NAME, "phone_numbers")
            .field(FieldDecl::scalar("number", ScalarType::String))
            .field(FieldDecl::foreign("user", User::NAME))
            .column("id", ColumnConfig::new().primary_key())
            .column("number", ColumnConfig::new().index().length(15))
            .column(
                "user",
                ColumnConfig::new().name("user_id").storage_type(ScalarType::Int),
            )
    }

    fn from_row(row: Row) -> Result<Self> {
        Ok(Self {
            id: row.field("id")?,
            number: row.field("number")?,
            user: row.field("user")?,
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("number", &self.number)
            .with("user", self.user)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: Option<i64>,
    pub addresses: Vec<serde_json::Value>,
    pub user: i64,
}

impl Entity for Profile {
    const NAME: &'static str = "Profile";

    fn declaration() -> EntityDecl {
        EntityDecl::standard(Self::NAME, "profiles")
            .field(FieldDecl::structured("addresses").nullable())
            .field(FieldDecl::foreign("user", User::NAME))
            .column("id", ColumnConfig::new().primary_key())
            .column(
                "user",
                ColumnConfig::new().name("user_id").storage_type(ScalarType::Int),
            )
            .column("addresses", ColumnConfig::new().jsonb())
            .pre_validator("addresses", PreValidator::empty_list())
    }

    fn from_row(row: Row) -> Result<Self> {
        Ok(Self {
            id: row.field("id")?,
            addresses: row.field("addresses")?,
            user: row.field("user")?,
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("addresses", self.addresses.clone())
            .with("user", self.user)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub full_name: String,
    pub email: String,
    pub is_active: bool,
    pub addresses: Vec<serde_json::Value>,
    pub numbers: Vec<String>,
}

#[async_trait]
impl CacheView for UserInfo {
    const NAME: &'static str = "UserInfo";

    fn declaration() -> ViewDecl {
        ViewDecl::new(Self::NAME, "user_info", "email")
            .field(FieldDecl::scalar("full_name", ScalarType::String))
            .field(FieldDecl::scalar("email", ScalarType::String).with_validator(EmailValidator))
            .field(FieldDecl::scalar("is_active", ScalarType::Bool).with_default(true))
            .field(FieldDecl::structured("addresses"))
            .field(FieldDecl::structured("numbers"))
            .pre_validator("addresses", PreValidator::empty_list())
            .pre_validator("numbers", PreValidator::empty_list())
    }

    async fn get_data(key: &str, metadata: &Metadata) -> Result<Row> {
        let profiles = metadata.objects::<Profile>();
        let profile = profiles.filter("user__email", key)?.get().await?;
        let numbers = metadata
            .objects::<PhoneNumber>()
            .filter("user__email", key)?
            .all()
            .await?;
        let user: User = profiles.related(&profile, "user").await?;

        Ok(Row::new()
            .with("full_name", user.full_name)
            .with("email", user.email)
            .with("is_active", user.is_active)
            .with("addresses", profile.addresses)
            .with(
                "numbers",
                numbers.into_iter().map(|n| n.number).collect::<Vec<String>>(),
            ))
    }

    fn from_row(row: Row) -> Result<Self> {
        Ok(Self {
            full_name: row.field("full_name")?,
            email: row.field("email")?,
            is_active: row.field("is_active")?,
            addresses: row.field("addresses")?,
            numbers: row.field("numbers")?,
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("full_name", &self.full_name)
            .with("email", &self.email)
            .with("is_active", self.is_active)
            .with("addresses", self.addresses.clone())
            .with("numbers", self.numbers.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCache {
    pub email: String,
    pub user: User,
}

#[async_trait]
impl CacheView for ProfileCache {
    const NAME: &'static str = "ProfileCache";

    fn declaration() -> ViewDecl {
        ViewDecl::new(Self::NAME, "profile_info", "email")
            .field(FieldDecl::scalar("email", ScalarType::String).with_validator(EmailValidator))
            .field(FieldDecl::structured("user"))
    }

    async fn get_data(key: &str, metadata: &Metadata) -> Result<Row> {
        let user = metadata.objects::<User>().filter("email", key)?.get().await?;
        Ok(Row::new()
            .with("email", user.email.clone())
            .with("user", user.to_row().to_json()?))
    }

    fn from_row(row: Row) -> Result<Self> {
        let user: serde_json::Value = row.field("user")?;
        Ok(Self {
            email: row.field("email")?,
            user: User::from_row(Row::from_json(user)?)?,
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("email", &self.email)
            .with("user", self.user.to_row().to_json().unwrap_or_default())
    }
}

/// The standard hierarchy.
pub fn base() -> Hierarchy {
    Hierarchy::standard("Base")
        .entity::<User>()
        .entity::<Skill>()
        .entity::<PhoneNumber>()
        .entity::<Profile>()
}

/// The bare hierarchy.
pub fn bare_base() -> Hierarchy {
    Hierarchy::bare("BareBase").entity::<Bare>()
}

pub struct TestDb {
    pub engine: Arc<StorageEngine>,
    _dir: TempDir, // Keep the temp dir alive
}

pub fn test_engine() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let engine = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
    TestDb {
        engine: Arc::new(engine),
        _dir: dir,
    }
}

/// Both hierarchies registered into one registry on one primary.
pub async fn init(primary: Database, replica: Option<Database>) -> Metadata {
    let metadata = init_tables(&base(), primary.clone(), replica.clone(), None)
        .await
        .unwrap();
    init_tables(&bare_base(), primary, replica, Some(&metadata))
        .await
        .unwrap()
}

/// Driver that counts operations before delegating to sled.
#[derive(Clone)]
pub struct CountingDriver {
    inner: SledDriver,
    pub reads: Arc<AtomicUsize>,
    pub writes: Arc<AtomicUsize>,
}

impl CountingDriver {
    pub fn new(engine: Arc<StorageEngine>) -> Self {
        Self {
            inner: SledDriver::new(engine),
            reads: Arc::new(AtomicUsize::new(0)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for CountingDriver {
    async fn execute(&self, table: Arc<TableSchema>, op: Operation) -> Result<Outcome> {
        let counter = if op.is_read_only() {
            &self.reads
        } else {
            &self.writes
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(table, op).await
    }
}

pub fn counting_database(name: &str, engine: Arc<StorageEngine>) -> (Database, CountingDriver) {
    let driver = CountingDriver::new(engine);
    let db = Database::new(name, driver.clone(), PoolConfig::default());
    (db, driver)
}

/// A user with one profile and two phone numbers.
pub async fn seed_user(metadata: &Metadata, email: &str) -> User {
    let user = metadata
        .objects::<User>()
        .insert(&User::new("Ada Lovelace", email))
        .await
        .unwrap();
    let user_id = user.id.unwrap();

    metadata
        .objects::<Profile>()
        .insert(&Profile {
            id: None,
            addresses: vec![serde_json::json!({"city": "London"})],
            user: user_id,
        })
        .await
        .unwrap();
    for number in ["555-0100", "555-0199"] {
        metadata
            .objects::<PhoneNumber>()
            .insert(&PhoneNumber {
                id: None,
                number: number.to_string(),
                user: user_id,
            })
            .await
            .unwrap();
    }
    user
}
