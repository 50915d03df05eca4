mod init;
mod provision;
mod seed;
mod telemetry;
#[cfg(test)]
mod testing;

use std::io;

use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use mkt_init_storage::Database;
use mkt_init_util::{load_env_file, AppConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    info!(stage = "app", env = %config.environment.as_str(), target = ?config.target, "starting database initialization");

    let database = Database::connect(
        &config.mongo_uri,
        &config.target.database,
        config.connect_timeout,
    )
    .await?;

    let plan = provision::plan_from_config(&config);
    let check = config.verify.then(|| provision::LiveCheck {
        config: &config,
        admin: &database,
    });
    let seed = config.seed.is_enabled().then(|| {
        let rng = match config.seed.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let products = database.products(&plan.collection.name);
        (
            seed::ProductSeeder::new(products, rng, config.seed.batch_size),
            config.seed.target_count,
        )
    });

    let steps = init::InitSteps {
        policy: config.on_existing,
        check,
        seed,
    };
    init::initialize(&database, &plan, steps, &mut io::stdout()).await?;
    Ok(())
}
