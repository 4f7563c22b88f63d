//! YourMembership auth - CLI Tool
//!
//! Drives the provider's session API by hand: open sessions, print login URLs,
//! fetch a member profile for a session the user already authenticated.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yourmembership_auth::auth::envelope::ApiResponse;
use yourmembership_auth::auth::strategy::{MemorySessionStore, SessionStore, SocialBackend};
use yourmembership_auth::auth::yourmembership::{
    YourMembershipBackend, MEMBER_PROFILE_GET, SESSION_KEY,
};
use yourmembership_auth::Config;

#[derive(Parser)]
#[command(name = "ym-auth")]
#[command(about = "CLI for the YourMembership auth backend")]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, env = "YM_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new API session and print its id
    Session,

    /// Start a login: print the provider URL and the session to complete it with
    AuthUrl,

    /// Fetch the member profile for an authenticated session
    Profile {
        /// Session id returned by `auth-url`
        #[arg(long)]
        session: String,
    },

    /// Print the request envelope for a call without sending it
    Request {
        /// API method (e.g. "Session.Create")
        method: String,

        /// Session id to embed
        #[arg(long)]
        session: Option<String>,

        /// Call argument as key=value (repeatable)
        #[arg(long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,
    },
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,yourmembership_auth=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_yaml_and_env(Some(&cli.config))?;
    let backend = YourMembershipBackend::new(&config.yourmembership);

    match cli.command {
        Commands::Session => {
            let session_id = backend
                .create_session()
                .await
                .context("Failed to create session")?;
            println!("{}", session_id);
        }
        Commands::AuthUrl => {
            let session = MemorySessionStore::new();
            let url = backend
                .auth_url(&session)
                .await
                .context("Failed to build authorization URL")?;
            let output = json!({
                "url": url,
                "session_id": session.get(SESSION_KEY),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Profile { session } => {
            let response = backend
                .call_api(MEMBER_PROFILE_GET, Some(&session), &[])
                .await
                .context("Failed to fetch member profile")?;
            print_profile(&backend, &response)?;
        }
        Commands::Request {
            method,
            session,
            args,
        } => {
            let args: Vec<(&str, &str)> = args
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let xml = backend.build_request(&method, session.as_deref(), &args)?;
            print!("{}", xml);
        }
    }

    Ok(())
}

fn print_profile(backend: &YourMembershipBackend, response: &ApiResponse) -> Result<()> {
    let details = backend.user_details(response)?;
    let uid = backend.user_id(&details, response)?;
    let extra_data = backend.extra_data(response, Some(&details));

    let output = json!({
        "backend": backend.name(),
        "uid": uid,
        "details": details,
        "extra_data": extra_data,
        "response": response,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
