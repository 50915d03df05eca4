use std::time::Duration;

use bson::{doc, Bson, Document};
use mongodb::{
    error::ErrorKind,
    options::{ClientOptions, Credential, IndexOptions},
    Client, Collection, IndexModel,
};
use thiserror::Error;
use tracing::{debug, info};

use mkt_init_core::{DatabaseUser, IndexKind, IndexSpec, Product};

const APP_NAME: &str = "mkt-init";

/// Server error codes the provisioning steps care about.
mod codes {
    pub const UNAUTHORIZED: i32 = 13;
    pub const NAMESPACE_EXISTS: i32 = 48;
    pub const DUPLICATE_KEY: i32 = 11000;
    pub const USER_EXISTS: i32 = 51003;
}

/// Handle to one MongoDB database on a connected client.
#[derive(Clone)]
pub struct Database {
    client: Client,
    name: String,
}

impl Database {
    /// Connects with the credentials embedded in `uri` and pings the target database.
    pub async fn connect(uri: &str, name: &str, timeout: Duration) -> Result<Self, StorageError> {
        let options = client_options(uri, timeout).await?;
        Self::from_options(options, name).await
    }

    /// Connects as `username`, authenticating against the target database itself.
    pub async fn connect_as(
        uri: &str,
        name: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let mut options = client_options(uri, timeout).await?;
        options.credential = Some(
            Credential::builder()
                .username(username.to_string())
                .password(password.to_string())
                .source(name.to_string())
                .build(),
        );
        Self::from_options(options, name).await
    }

    async fn from_options(options: ClientOptions, name: &str) -> Result<Self, StorageError> {
        let client = Client::with_options(options).map_err(StorageError::Connect)?;

        client
            .database(name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(StorageError::Connect)?;

        info!(stage = "storage", database = name, "connected to mongodb");

        Ok(Self {
            client,
            name: name.to_string(),
        })
    }

    /// Name of the database this handle is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a handle for managing users of this database.
    pub fn users(&self) -> UserRepository {
        UserRepository {
            database: self.inner(),
        }
    }

    /// Returns a handle for creating and listing collections.
    pub fn collections(&self) -> CollectionRepository {
        CollectionRepository {
            database: self.inner(),
        }
    }

    /// Returns a handle to the product documents in `collection`.
    pub fn products(&self, collection: &str) -> ProductRepository {
        ProductRepository {
            collection: self.inner().collection(collection),
        }
    }

    /// Exposes the driver database when lower level access is required.
    pub fn inner(&self) -> mongodb::Database {
        self.client.database(&self.name)
    }
}

async fn client_options(uri: &str, timeout: Duration) -> Result<ClientOptions, StorageError> {
    let mut options = ClientOptions::parse(uri)
        .await
        .map_err(StorageError::InvalidUri)?;
    options.app_name = Some(APP_NAME.to_string());
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);
    Ok(options)
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid mongodb connection string: {0}")]
    InvalidUri(mongodb::error::Error),
    #[error("failed to connect to mongodb: {0}")]
    Connect(mongodb::error::Error),
    #[error("user '{0}' already exists")]
    UserExists(String),
    #[error("collection '{0}' already exists")]
    CollectionExists(String),
    #[error("not authorized: {0}")]
    Unauthorized(mongodb::error::Error),
    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),
    #[error("database error: {0}")]
    Database(mongodb::error::Error),
}

impl StorageError {
    /// Returns `true` when the step failed because its target is already present.
    pub fn is_already_present(&self) -> bool {
        matches!(self, Self::UserExists(_) | Self::CollectionExists(_))
    }
}

/// What a failed server command means for the step that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conflict {
    UserExists,
    NamespaceExists,
    DuplicateKey,
    Unauthorized,
    Other,
}

fn classify_code(code: i32) -> Conflict {
    match code {
        codes::USER_EXISTS => Conflict::UserExists,
        codes::NAMESPACE_EXISTS => Conflict::NamespaceExists,
        codes::DUPLICATE_KEY => Conflict::DuplicateKey,
        codes::UNAUTHORIZED => Conflict::Unauthorized,
        _ => Conflict::Other,
    }
}

fn conflict_of(err: &mongodb::error::Error) -> Conflict {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => classify_code(command.code),
        _ => Conflict::Other,
    }
}

/// Driver call whose failure is being mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    CreateUser,
    CreateCollection,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    UserExists,
    CollectionExists,
    Unauthorized,
    Database,
}

fn resolve(op: Op, conflict: Conflict) -> Resolution {
    match (op, conflict) {
        // Older servers report an existing user as a duplicate key in admin.system.users.
        (Op::CreateUser, Conflict::UserExists | Conflict::DuplicateKey) => Resolution::UserExists,
        (Op::CreateCollection, Conflict::NamespaceExists) => Resolution::CollectionExists,
        (_, Conflict::Unauthorized) => Resolution::Unauthorized,
        _ => Resolution::Database,
    }
}

/// Maps a driver error to a storage error. `subject` names the user or
/// collection an existence conflict refers to.
fn map_error(err: mongodb::error::Error, op: Op, subject: &str) -> StorageError {
    match resolve(op, conflict_of(&err)) {
        Resolution::UserExists => StorageError::UserExists(subject.to_string()),
        Resolution::CollectionExists => StorageError::CollectionExists(subject.to_string()),
        Resolution::Unauthorized => StorageError::Unauthorized(err),
        Resolution::Database => StorageError::Database(err),
    }
}

/// Repository wrapping the user management commands.
#[derive(Clone)]
pub struct UserRepository {
    database: mongodb::Database,
}

impl UserRepository {
    /// Runs `createUser` in this database.
    pub async fn create(&self, user: &DatabaseUser) -> Result<(), StorageError> {
        let command = create_user_command(user)?;
        self.database
            .run_command(command)
            .await
            .map_err(|err| map_error(err, Op::CreateUser, &user.name))?;
        debug!(stage = "storage", user = %user.name, "createUser acknowledged");
        Ok(())
    }

    /// Returns the role grants held by `name`, or `None` when the user is absent.
    pub async fn roles_of(&self, name: &str) -> Result<Option<Vec<(String, String)>>, StorageError> {
        let reply = self
            .database
            .run_command(doc! { "usersInfo": name })
            .await
            .map_err(|err| map_error(err, Op::General, name))?;
        Ok(parse_users_info(&reply))
    }
}

fn create_user_command(user: &DatabaseUser) -> Result<Document, StorageError> {
    let roles = bson::to_bson(&user.roles)?;
    Ok(doc! {
        "createUser": user.name.as_str(),
        "pwd": user.password.expose(),
        "roles": roles,
    })
}

fn parse_users_info(reply: &Document) -> Option<Vec<(String, String)>> {
    let users = reply.get_array("users").ok()?;
    let user = users.first()?.as_document()?;
    let roles = user
        .get_array("roles")
        .map(|roles| {
            roles
                .iter()
                .filter_map(Bson::as_document)
                .filter_map(|grant| {
                    let role = grant.get_str("role").ok()?;
                    let db = grant.get_str("db").ok()?;
                    Some((role.to_string(), db.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();
    Some(roles)
}

/// Repository for collection level administration.
#[derive(Clone)]
pub struct CollectionRepository {
    database: mongodb::Database,
}

impl CollectionRepository {
    /// Creates `name`. Fails with [`StorageError::CollectionExists`] if it is already there.
    pub async fn create(&self, name: &str) -> Result<(), StorageError> {
        self.database
            .create_collection(name)
            .await
            .map_err(|err| map_error(err, Op::CreateCollection, name))?;
        debug!(stage = "storage", collection = name, "collection created");
        Ok(())
    }

    /// Lists collection names visible to the connected user.
    pub async fn list_names(&self) -> Result<Vec<String>, StorageError> {
        let mut names = self
            .database
            .list_collection_names()
            .await
            .map_err(|err| map_error(err, Op::General, self.database.name()))?;
        names.sort();
        Ok(names)
    }

    /// Creates the given indexes on `collection`, returning the index names.
    pub async fn create_indexes(
        &self,
        collection: &str,
        indexes: &[IndexSpec],
    ) -> Result<Vec<String>, StorageError> {
        if indexes.is_empty() {
            return Ok(Vec::new());
        }

        let models: Vec<IndexModel> = indexes.iter().map(index_model).collect();
        let result = self
            .database
            .collection::<Document>(collection)
            .create_indexes(models)
            .await
            .map_err(|err| map_error(err, Op::General, collection))?;
        Ok(result.index_names)
    }
}

fn index_keys(spec: &IndexSpec) -> Document {
    let mut keys = Document::new();
    for (field, kind) in &spec.keys {
        let value = match kind {
            IndexKind::Ascending => Bson::Int32(1),
            IndexKind::Text => Bson::String("text".to_string()),
        };
        keys.insert(field.clone(), value);
    }
    keys
}

fn index_model(spec: &IndexSpec) -> IndexModel {
    IndexModel::builder()
        .keys(index_keys(spec))
        .options(Some(
            IndexOptions::builder().name(spec.name.clone()).build(),
        ))
        .build()
}

/// Repository over the product documents.
#[derive(Clone)]
pub struct ProductRepository {
    collection: Collection<Product>,
}

impl ProductRepository {
    /// Counts every document in the collection.
    pub async fn count(&self) -> Result<u64, StorageError> {
        self.collection
            .count_documents(doc! {})
            .await
            .map_err(|err| map_error(err, Op::General, self.collection.name()))
    }

    /// Inserts a batch of products, returning how many the server acknowledged.
    pub async fn insert_batch(&self, products: &[Product]) -> Result<usize, StorageError> {
        if products.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection
            .insert_many(products)
            .await
            .map_err(|err| map_error(err, Op::General, self.collection.name()))?;
        Ok(result.inserted_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_init_core::{plan::product_indexes, CollectionSpec, ProvisionPlan};

    fn plan() -> ProvisionPlan {
        ProvisionPlan::new(
            "marketplace_product",
            "mongo",
            "mongo123",
            "readWrite",
            CollectionSpec::bare("products"),
        )
    }

    #[test]
    fn create_user_command_scopes_roles_to_database() {
        let command = create_user_command(&plan().user).expect("command builds");
        assert_eq!(command.get_str("createUser").unwrap(), "mongo");
        assert_eq!(command.get_str("pwd").unwrap(), "mongo123");

        let roles = command.get_array("roles").unwrap();
        assert_eq!(roles.len(), 1);
        let grant = roles[0].as_document().unwrap();
        assert_eq!(grant.get_str("role").unwrap(), "readWrite");
        assert_eq!(grant.get_str("db").unwrap(), "marketplace_product");
    }

    #[test]
    fn classifies_duplicate_codes() {
        assert_eq!(classify_code(51003), Conflict::UserExists);
        assert_eq!(classify_code(11000), Conflict::DuplicateKey);
        assert_eq!(classify_code(48), Conflict::NamespaceExists);
        assert_eq!(classify_code(13), Conflict::Unauthorized);
        assert_eq!(classify_code(2), Conflict::Other);
    }

    #[test]
    fn index_keys_follow_spec_order() {
        let indexes = product_indexes();
        let text = index_keys(&indexes[0]);
        assert_eq!(text.get_str("name").unwrap(), "text");

        let compound = index_keys(&indexes[3]);
        let fields: Vec<_> = compound.keys().cloned().collect();
        assert_eq!(fields, ["name", "category"]);
        assert_eq!(compound.get_i32("category").unwrap(), 1);
    }

    #[test]
    fn parses_users_info_reply() {
        let reply = doc! {
            "users": [{
                "user": "mongo",
                "db": "marketplace_product",
                "roles": [{ "role": "readWrite", "db": "marketplace_product" }],
            }],
            "ok": 1.0,
        };
        assert_eq!(
            parse_users_info(&reply),
            Some(vec![(
                "readWrite".to_string(),
                "marketplace_product".to_string()
            )])
        );

        let empty = doc! { "users": [], "ok": 1.0 };
        assert_eq!(parse_users_info(&empty), None);
    }

    #[test]
    fn duplicates_only_count_for_the_step_that_creates_them() {
        assert_eq!(resolve(Op::CreateUser, Conflict::UserExists), Resolution::UserExists);
        assert_eq!(resolve(Op::CreateUser, Conflict::DuplicateKey), Resolution::UserExists);
        assert_eq!(resolve(Op::CreateUser, Conflict::NamespaceExists), Resolution::Database);
        assert_eq!(
            resolve(Op::CreateCollection, Conflict::NamespaceExists),
            Resolution::CollectionExists
        );
        assert_eq!(resolve(Op::CreateCollection, Conflict::DuplicateKey), Resolution::Database);
        assert_eq!(resolve(Op::General, Conflict::NamespaceExists), Resolution::Database);
        assert_eq!(resolve(Op::General, Conflict::DuplicateKey), Resolution::Database);
        assert_eq!(resolve(Op::General, Conflict::Other), Resolution::Database);
    }

    #[test]
    fn unauthorized_is_reported_for_every_call() {
        for op in [Op::CreateUser, Op::CreateCollection, Op::General] {
            assert_eq!(resolve(op, Conflict::Unauthorized), Resolution::Unauthorized, "{op:?}");
        }
    }

    #[test]
    fn already_present_covers_only_duplicates() {
        assert!(StorageError::UserExists("mongo".into()).is_already_present());
        assert!(StorageError::CollectionExists("products".into()).is_already_present());
    }

    /// Needs a live server: `MKT_INIT_TEST_MONGO_URI` must carry credentials
    /// allowed to create users. Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore = "requires MKT_INIT_TEST_MONGO_URI"]
    async fn provisions_fresh_database_and_rejects_rerun() {
        let uri = std::env::var("MKT_INIT_TEST_MONGO_URI")
            .expect("MKT_INIT_TEST_MONGO_URI must point at a mongodb server");
        let timeout = Duration::from_secs(5);
        let db_name = format!("mkt_init_test_{}", std::process::id());
        let database = Database::connect(&uri, &db_name, timeout)
            .await
            .expect("connect");
        let plan = ProvisionPlan::new(
            db_name.clone(),
            "mkt_init_test_user",
            "mkt_init_test_pwd",
            "readWrite",
            CollectionSpec::bare("products"),
        );

        database.users().create(&plan.user).await.expect("create user");
        database
            .collections()
            .create("products")
            .await
            .expect("create collection");

        let roles = database
            .users()
            .roles_of(&plan.user.name)
            .await
            .expect("usersInfo")
            .expect("user exists");
        assert_eq!(roles, vec![("readWrite".to_string(), db_name.clone())]);
        assert_eq!(database.products("products").count().await.expect("count"), 0);

        let rerun_user = database.users().create(&plan.user).await.unwrap_err();
        assert!(matches!(rerun_user, StorageError::UserExists(_)), "{rerun_user}");
        let rerun_collection = database.collections().create("products").await.unwrap_err();
        assert!(
            matches!(rerun_collection, StorageError::CollectionExists(_)),
            "{rerun_collection}"
        );

        let as_user = Database::connect_as(
            &uri,
            &db_name,
            &plan.user.name,
            plan.user.password.expose(),
            timeout,
        )
        .await
        .expect("connect as created user");
        assert_eq!(
            as_user.collections().list_names().await.expect("list"),
            vec!["products".to_string()]
        );

        database
            .inner()
            .run_command(doc! { "dropUser": plan.user.name.as_str() })
            .await
            .expect("drop user");
        database.inner().drop().await.expect("drop database");
    }
}
