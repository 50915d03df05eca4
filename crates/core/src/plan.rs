use std::fmt;

use serde::Serialize;

pub const DEFAULT_DATABASE: &str = "marketplace_product";
pub const DEFAULT_COLLECTION: &str = "products";
pub const DEFAULT_ROLE: &str = "readWrite";

/// Everything the provisioning routine creates, in the order it creates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPlan {
    pub database: String,
    pub user: DatabaseUser,
    pub collection: CollectionSpec,
}

impl ProvisionPlan {
    /// Builds a plan granting `role` on `database` to the given user.
    pub fn new(
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
        collection: CollectionSpec,
    ) -> Self {
        let database = database.into();
        let user = DatabaseUser {
            name: username.into(),
            password: Password(password.into()),
            roles: vec![RoleGrant {
                role: role.into(),
                db: database.clone(),
            }],
        };
        Self {
            database,
            user,
            collection,
        }
    }
}

/// Credential created inside the target database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUser {
    pub name: String,
    pub password: Password,
    pub roles: Vec<RoleGrant>,
}

/// Secret wrapper that keeps passwords out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// A built-in role scoped to a single database, shaped as the server expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

/// Collection to create, with the indexes that should exist on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexes: Vec::new(),
        }
    }

    pub fn with_indexes(mut self, indexes: Vec<IndexSpec>) -> Self {
        self.indexes = indexes;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Ascending,
    Text,
}

/// A named index over one or more fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<(String, IndexKind)>,
}

impl IndexSpec {
    pub fn ascending(name: &str, fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keys: fields
                .iter()
                .map(|field| (field.to_string(), IndexKind::Ascending))
                .collect(),
        }
    }

    pub fn text(name: &str, field: &str) -> Self {
        Self {
            name: name.to_string(),
            keys: vec![(field.to_string(), IndexKind::Text)],
        }
    }
}

/// Indexes the product service expects on its collection.
pub fn product_indexes() -> Vec<IndexSpec> {
    vec![
        IndexSpec::text("name_text", "name"),
        IndexSpec::ascending("name", &["name"]),
        IndexSpec::ascending("category", &["category"]),
        IndexSpec::ascending("name_category_idx", &["name", "category"]),
    ]
}
