use anyhow::Context;
use studygate::{cli::config_path_from_args, config::Config, logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let _logging_guard = logging::init_tracing(&config.logging)?;

    server::run(config).await
}
