use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "connector-manager",
    about = "Call third-party APIs through authenticated connectors",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file; connector settings come from the environment when unset
    #[arg(long, env = "API_MANAGER_CONFIG")]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered connectors and whether their settings are complete
    List,

    /// Send one request through a connector and print the response
    Request {
        /// Connector name, e.g. google or exactonline
        connector: String,
        /// HTTP method
        method: String,
        /// Endpoint relative to the connector base URL
        endpoint: String,
        /// JSON object sent as the request body
        #[arg(long)]
        data: Option<String>,
        /// Query parameter as key=value (repeatable)
        #[arg(long = "query", short = 'q')]
        query: Vec<String>,
        /// Extra header as name=value (repeatable)
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
    },

    /// Print the OAuth consent URL for a connector
    AuthUrl {
        connector: String,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// Print a connector's configuration with credentials masked
    Show { connector: String },
}
