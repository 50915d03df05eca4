use std::io::{self, Write};

use rand::Rng;
use thiserror::Error;
use tracing::info;

use mkt_init_core::ProvisionPlan;
use mkt_init_util::ExistingPolicy;

use crate::provision::{self, CredentialCheck, ProvisionError, ProvisionReport, ProvisionTarget};
use crate::seed::{ProductSeeder, ProductStore, SeedError};

/// Optional steps that follow provisioning.
pub struct InitSteps<C, S, R> {
    pub policy: ExistingPolicy,
    pub check: Option<C>,
    /// Seeder and the product count to top the collection up to.
    pub seed: Option<(ProductSeeder<S, R>, u64)>,
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error("failed to write confirmation: {0}")]
    Output(#[from] io::Error),
}

/// Provisions, checks and seeds, then writes the confirmation line to `out`.
///
/// The line is written only after every enabled step succeeded.
pub async fn initialize<T, C, S, R, W>(
    target: &T,
    plan: &ProvisionPlan,
    steps: InitSteps<C, S, R>,
    out: &mut W,
) -> Result<ProvisionReport, InitError>
where
    T: ProvisionTarget,
    C: CredentialCheck,
    S: ProductStore,
    R: Rng,
    W: Write,
{
    let report = provision::run(target, plan, steps.policy).await?;
    info!(
        stage = "app",
        database = %report.database,
        user = report.user.as_str(),
        collection = report.collection.as_str(),
        indexes = report.indexes.len(),
        "provisioning finished"
    );

    if let Some(check) = steps.check {
        check.check(plan).await?;
    }

    if let Some((mut seeder, target_count)) = steps.seed {
        seeder.execute(target_count).await?;
    }

    writeln!(out, "Initialized {} database", report.database)?;
    out.flush()?;
    Ok(report)
}
