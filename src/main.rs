use anyhow::{Context, bail};
use log::{info, warn};
use segenhance::inference::load_model;
use segenhance::{BatchProcessor, Config, Enhancer};
use std::env;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    let model = load_model(&config.model).context("loading enhancement model")?;
    let enhancer = Enhancer::from_config(&config, model)?;

    let batch = BatchProcessor::new(&enhancer, &config.batch);
    let report = batch.run().context("batch enhancement aborted")?;
    let manifest = batch.write_manifest(&config, &report)?;

    info!(
        "{} enhanced, {} failed; manifest written to {:?}",
        report.succeeded(),
        report.failed(),
        manifest
    );
    if report.failed() > 0 {
        warn!("Some files could not be enhanced, see the manifest for details");
        if report.succeeded() == 0 {
            bail!("no file was enhanced");
        }
    }
    Ok(())
}
