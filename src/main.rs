//! rtctoken CLI entry point

mod cli;

use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use clap::Parser;
use rtctoken::request::{self, RtcTokenRequest, RtmTokenRequest};
use rtctoken::token;
use rtctoken::{Credentials, TokenBuilder};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only tokens
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let credentials = || -> Result<Credentials> {
        let app_id = cli.app_id.clone().context("APP_ID or --app-id required")?;
        let certificate = cli
            .app_certificate
            .clone()
            .context("APP_CERTIFICATE or --app-certificate required")?;
        Credentials::new(app_id, certificate).context("Invalid credentials")
    };

    match &cli.command {
        Commands::Rtc(args) => {
            let builder = TokenBuilder::new(credentials()?);
            let request = RtcTokenRequest::parse(
                &args.channel,
                &args.role,
                &args.mode,
                &args.uid,
                args.expiry.as_deref(),
            )
            .inspect_err(|e| warn!(error = %e, "Rejected RTC token request"))
            .context("Error generating RTC token")?;
            let token = request
                .issue(&builder)
                .inspect_err(|e| warn!(error = %e, "RTC token build failed"))
                .context("Error generating RTC token")?;

            info!(channel = %request.channel_name, role = %request.role, "Issued RTC token");
            println!("{}", token);
        }
        Commands::Rtm { user_id, expiry } => {
            let builder = TokenBuilder::new(credentials()?);
            let request = RtmTokenRequest::parse(user_id, expiry.as_deref())
                .inspect_err(|e| warn!(error = %e, "Rejected RTM token request"))
                .context("Error generating RTM token")?;
            let token = request
                .issue(&builder)
                .inspect_err(|e| warn!(error = %e, "RTM token build failed"))
                .context("Error generating RTM token")?;

            info!(ttl_seconds = request.ttl_seconds, "Issued RTM token");
            println!("{}", token);
        }
        Commands::Rte(args) => {
            let builder = TokenBuilder::new(credentials()?);
            let request = RtcTokenRequest::parse(
                &args.channel,
                &args.role,
                &args.mode,
                &args.uid,
                args.expiry.as_deref(),
            )
            .context("Error generating tokens")?;
            let pair = request::issue_both(&builder, &request)
                .inspect_err(|e| warn!(error = %e, "Token pair build failed"))
                .context("Error generating tokens")?;

            info!(channel = %request.channel_name, "Issued RTC and RTM tokens");
            println!("{}", serde_json::to_string_pretty(&pair)?);
        }
        Commands::Inspect { token } => {
            let decoded = token::decode_unverified(token).context("Failed to decode token")?;
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        }
        Commands::Verify { token, identifier } => {
            let credentials = credentials()?;
            let decoded = token::decode(
                token,
                credentials.app_id.as_str(),
                &credentials.certificate,
                identifier,
            )
            .context("Token verification failed")?;

            info!(
                issued_at = decoded.issued_at,
                expires_at = ?decoded.expires_at(),
                "Token signature valid"
            );
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        }
    }

    Ok(())
}
