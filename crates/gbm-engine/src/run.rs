use {
    crate::infra::{cli, config, observe, simulator},
    anyhow::{Context, Result},
    clap::Parser,
    std::path::Path,
    tokio::fs,
};

/// Runs the engine binary and exits the process with a non-zero code if it
/// fails.
pub async fn start(args: impl Iterator<Item = String>) {
    if let Err(err) = run(args).await {
        tracing::error!(?err, "gbm engine failed");
        std::process::exit(1);
    }
}

pub async fn run(args: impl Iterator<Item = String>) -> Result<()> {
    let args = cli::Args::parse_from(args);
    observe::init(&args.log, args.use_json_logs);
    tracing::info!("running gbm engine with {args:#?}");

    match args.command {
        cli::Command::Simulate { config, script } => simulate(&config, &script).await,
        cli::Command::Validate { config } => validate(&config).await,
    }
}

async fn simulate(config: &Path, script: &Path) -> Result<()> {
    let config = config::file::load(config).await;
    let steps = fs::read_to_string(script)
        .await
        .with_context(|| format!("failed to read script {script:?}"))?;
    let steps: Vec<simulator::Step> =
        serde_json::from_str(&steps).with_context(|| format!("invalid script {script:?}"))?;

    let mut simulator = simulator::Simulator::new(config)?;
    let report = simulator.run(steps);
    println!("{report}");
    println!("{}", observe::encoded_metrics());
    Ok(())
}

async fn validate(config: &Path) -> Result<()> {
    let config = config::file::load(config).await;
    let simulator = simulator::Simulator::new(config)?;
    let engine = simulator.engine();
    tracing::info!(admin = %engine.admin(), operator = %engine.operator(), "configuration is valid");
    for (id, preset) in engine.presets() {
        tracing::info!(%id, ?preset, "preset");
    }
    for (id, contract) in engine.contracts() {
        tracing::info!(%id, ?contract, "contract");
    }
    Ok(())
}
