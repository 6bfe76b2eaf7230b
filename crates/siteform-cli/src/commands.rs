use anyhow::{Context, Result};
use siteform_core::{ApiConfig, ExportOptions, Exporter, HttpSourceApi};

use crate::cli::{Commands, ExportArgs};

pub(crate) fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Export(args) => run_export(&args),
    }
}

fn run_export(args: &ExportArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let api = HttpSourceApi::new(config).context("failed to build API client")?;

    let options = ExportOptions {
        assets: args.assets.clone(),
        dashboards: args.dashboards,
    };
    let template = Exporter::new(&api).export(&options)?;

    let name = if args.assets.is_some() {
        "site-assets-and-models"
    } else {
        "site-models"
    };
    let path = template.write_to(&args.out, name)?;
    println!("exported {} resources to {}", template.len(), path.display());
    Ok(())
}

/// Command-line flags win over the environment; the endpoint must come from
/// one of the two.
fn resolve_config(args: &ExportArgs) -> Result<ApiConfig> {
    let env = ApiConfig::from_env();

    let endpoint = args
        .endpoint
        .clone()
        .or_else(|| env.as_ref().map(|config| config.base_url.clone()))
        .context("no API endpoint; pass --endpoint or set SITEFORM_API_URL")?;

    let mut config = ApiConfig::new(endpoint);
    config.token = args
        .token
        .clone()
        .or_else(|| env.as_ref().and_then(|config| config.token.clone()));
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    } else if let Some(env) = &env {
        config.timeout_ms = env.timeout_ms;
    }
    Ok(config)
}
