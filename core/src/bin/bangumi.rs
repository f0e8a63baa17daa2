use std::process::ExitCode;

use bangumi_core::{
    BangumiClient, CancellationToken, ClientConfig, JsonMap, ResponseGroup, SearchRequest,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Query the bgm.tv catalog from the command line.
#[derive(Parser)]
#[command(name = "bangumi", version)]
struct Cli {
    /// Access token, sent as a bearer token.
    #[arg(long, env = "BANGUMI_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// API host; defaults to BANGUMI_HOST or https://api.bgm.tv.
    #[arg(long)]
    host: Option<String>,

    /// HTTP proxy URL.
    #[arg(long)]
    proxy: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one subject by id.
    Subject { id: String },
    /// Search subjects by keyword.
    Search {
        keywords: String,
        /// Subject type code (1 book, 2 anime, 3 music, 4 game, 6 real).
        #[arg(long = "type", default_value_t = 0)]
        subject_type: i32,
        #[arg(long, default_value_t = 0)]
        start: i64,
        #[arg(long, default_value_t = 25)]
        max_results: i64,
        #[arg(long, default_value = "small")]
        response_group: ResponseGroup,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, Box<dyn std::error::Error>> {
    let mut config = ClientConfig::from_env();
    config.caller = "bangumi-cli".to_string();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(proxy) = cli.proxy.filter(|p| !p.is_empty()) {
        config.proxy = Some(proxy);
    }

    let client = BangumiClient::from_config(config)?;
    let cancel = CancellationToken::new();
    let token = cli.token.as_deref();

    let result: JsonMap = match cli.command {
        Command::Subject { id } => client.get_subject(&cancel, token, &id)?,
        Command::Search {
            keywords,
            subject_type,
            start,
            max_results,
            response_group,
        } => {
            let search = SearchRequest {
                keywords,
                subject_type,
                response_group,
                start,
                max_results,
            };
            client.search_subjects_by_keywords(&cancel, token, &search)?
        }
    };
    Ok(serde_json::to_string_pretty(&result)?)
}
