use anyhow::Result;
use api_manager::ApiManager;
use clap::Parser;
use connector_manager::cli::{Cli, Commands};
use connector_manager::commands;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = commands::load(cli.config.as_deref())?;

    // RUST_LOG wins; otherwise the configured level for our crates
    let level = if cli.verbose {
        "debug".to_string()
    } else if settings.logging.enabled {
        settings.logging.level.clone()
    } else {
        "off".to_string()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("api_manager={level},connector_manager={level}").into()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(default = %settings.default, "Connector manager starting");
    let manager = ApiManager::from_settings(settings);

    let output = match cli.command {
        Commands::List => commands::list(&manager),
        Commands::Request {
            connector,
            method,
            endpoint,
            data,
            query,
            headers,
        } => {
            let request =
                commands::build_request(&method, &endpoint, data.as_deref(), &query, &headers)?;
            commands::request(&manager, &connector, request).await?
        }
        Commands::AuthUrl {
            connector,
            scope,
            redirect_uri,
        } => {
            commands::auth_url(&manager, &connector, scope.as_deref(), redirect_uri.as_deref())
                .await?
        }
        Commands::Show { connector } => commands::show(&manager, &connector).await?,
    };

    println!("{}", output);
    Ok(())
}
