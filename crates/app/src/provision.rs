use std::future::Future;

use thiserror::Error;
use tracing::{info, warn};

use mkt_init_core::{plan::product_indexes, CollectionSpec, DatabaseUser, IndexSpec, ProvisionPlan};
use mkt_init_storage::{Database, StorageError};
use mkt_init_util::{AppConfig, ExistingPolicy};

/// Administrative operations the routine needs from the target database.
pub trait ProvisionTarget {
    fn database_name(&self) -> &str;

    fn create_user(
        &self,
        user: &DatabaseUser,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn create_collection(&self, name: &str)
        -> impl Future<Output = Result<(), StorageError>> + Send;

    fn create_indexes(
        &self,
        collection: &str,
        indexes: &[IndexSpec],
    ) -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;
}

impl ProvisionTarget for Database {
    fn database_name(&self) -> &str {
        self.name()
    }

    async fn create_user(&self, user: &DatabaseUser) -> Result<(), StorageError> {
        self.users().create(user).await
    }

    async fn create_collection(&self, name: &str) -> Result<(), StorageError> {
        self.collections().create(name).await
    }

    async fn create_indexes(
        &self,
        collection: &str,
        indexes: &[IndexSpec],
    ) -> Result<Vec<String>, StorageError> {
        self.collections().create_indexes(collection, indexes).await
    }
}

/// How a single provisioning step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Created,
    AlreadyPresent,
}

impl StepOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyPresent => "already_present",
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub database: String,
    pub user: StepOutcome,
    pub collection: StepOutcome,
    pub indexes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("createUser failed: {0}")]
    CreateUser(#[source] StorageError),
    #[error("create collection failed: {0}")]
    CreateCollection(#[source] StorageError),
    #[error("createIndexes failed: {0}")]
    CreateIndexes(#[source] StorageError),
    #[error("verification failed: {0}")]
    VerificationFailed(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Builds the plan described by the configuration.
pub fn plan_from_config(config: &AppConfig) -> ProvisionPlan {
    let mut collection = CollectionSpec::bare(&config.target.collection);
    if config.create_indexes {
        collection = collection.with_indexes(product_indexes());
    }
    ProvisionPlan::new(
        &config.target.database,
        &config.target.username,
        &config.target.password,
        &config.target.role,
        collection,
    )
}

/// Creates the user, then the collection, then its indexes.
///
/// Nothing is rolled back: a user created before a failing collection step
/// stays in place.
pub async fn run<T: ProvisionTarget>(
    target: &T,
    plan: &ProvisionPlan,
    policy: ExistingPolicy,
) -> Result<ProvisionReport, ProvisionError> {
    info!(stage = "provision", database = target.database_name(), policy = policy.as_str(), "selected database");

    let user = settle(
        target.create_user(&plan.user).await,
        policy,
        ProvisionError::CreateUser,
    )?;
    info!(stage = "provision", user = %plan.user.name, outcome = user.as_str(), "user step finished");

    let collection = settle(
        target.create_collection(&plan.collection.name).await,
        policy,
        ProvisionError::CreateCollection,
    )?;
    info!(stage = "provision", collection = %plan.collection.name, outcome = collection.as_str(), "collection step finished");

    let indexes = if plan.collection.indexes.is_empty() {
        Vec::new()
    } else {
        let names = target
            .create_indexes(&plan.collection.name, &plan.collection.indexes)
            .await
            .map_err(ProvisionError::CreateIndexes)?;
        info!(stage = "provision", collection = %plan.collection.name, indexes = ?names, "indexes ensured");
        names
    };

    Ok(ProvisionReport {
        database: target.database_name().to_string(),
        user,
        collection,
        indexes,
    })
}

fn settle(
    result: Result<(), StorageError>,
    policy: ExistingPolicy,
    wrap: fn(StorageError) -> ProvisionError,
) -> Result<StepOutcome, ProvisionError> {
    match result {
        Ok(()) => Ok(StepOutcome::Created),
        Err(err) if err.is_already_present() && policy == ExistingPolicy::Skip => {
            warn!(stage = "provision", error = %err, "already present, skipping");
            Ok(StepOutcome::AlreadyPresent)
        }
        Err(err) => Err(wrap(err)),
    }
}

/// Post-provisioning check of the created credential.
pub trait CredentialCheck {
    fn check(&self, plan: &ProvisionPlan)
        -> impl Future<Output = Result<(), ProvisionError>> + Send;
}

/// Runs [`verify`] against the live server.
pub struct LiveCheck<'a> {
    pub config: &'a AppConfig,
    pub admin: &'a Database,
}

impl CredentialCheck for LiveCheck<'_> {
    async fn check(&self, plan: &ProvisionPlan) -> Result<(), ProvisionError> {
        verify(self.config, self.admin, plan).await
    }
}

/// Checks the created credential from the outside: the admin side must see
/// the role grant, and a session opened as the new user must see the collection.
pub async fn verify(
    config: &AppConfig,
    admin: &Database,
    plan: &ProvisionPlan,
) -> Result<(), ProvisionError> {
    let grants = admin
        .users()
        .roles_of(&plan.user.name)
        .await?
        .ok_or_else(|| {
            ProvisionError::VerificationFailed(format!("user '{}' not found", plan.user.name))
        })?;
    check_grants(&grants, plan)?;

    let as_user = Database::connect_as(
        &config.mongo_uri,
        &plan.database,
        &plan.user.name,
        plan.user.password.expose(),
        config.connect_timeout,
    )
    .await?;
    let names = as_user.collections().list_names().await?;
    check_listing(&names, &plan.collection.name)?;

    info!(stage = "provision", user = %plan.user.name, collections = ?names, "credential verified");
    Ok(())
}

fn check_grants(grants: &[(String, String)], plan: &ProvisionPlan) -> Result<(), ProvisionError> {
    for expected in &plan.user.roles {
        let held = grants
            .iter()
            .any(|(role, db)| *role == expected.role && *db == expected.db);
        if !held {
            return Err(ProvisionError::VerificationFailed(format!(
                "user '{}' lacks role '{}' on '{}'",
                plan.user.name, expected.role, expected.db
            )));
        }
    }
    Ok(())
}

fn check_listing(names: &[String], collection: &str) -> Result<(), ProvisionError> {
    if names.iter().any(|name| name == collection) {
        Ok(())
    } else {
        Err(ProvisionError::VerificationFailed(format!(
            "collection '{collection}' not visible to the created user (saw {names:?})"
        )))
    }
}
