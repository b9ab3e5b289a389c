//! CLI command definitions

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rtctoken")]
#[command(about = "Issue and verify real-time channel and messaging tokens", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Application id issued by the platform
    #[arg(long, env = "APP_ID", global = true)]
    pub app_id: Option<String>,

    /// Application certificate (signing secret)
    #[arg(long, env = "APP_CERTIFICATE", global = true, hide_env_values = true)]
    pub app_certificate: Option<String>,

    /// Log filter when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build an RTC channel token
    ///
    /// Examples:
    ///   rtctoken rtc room1 publisher uid 12345
    ///   rtctoken rtc room1 subscriber userAccount alice --expiry 600
    Rtc(RtcArgs),

    /// Build an RTM messaging token
    ///
    /// Examples:
    ///   rtctoken rtm user-42 --expiry 600
    Rtm {
        /// Messaging user id
        user_id: String,

        /// Token lifetime in seconds from now
        #[arg(long)]
        expiry: Option<String>,
    },

    /// Build RTC and RTM tokens for the same user, printed as JSON
    Rte(RtcArgs),

    /// Print a token's contents without verifying it
    Inspect {
        /// Token to decode
        token: String,
    },

    /// Verify a token against the configured credentials
    Verify {
        /// Token to verify
        token: String,

        /// Channel name (RTC) or user id (RTM) the token must be bound to
        identifier: String,
    },
}

#[derive(Args)]
pub struct RtcArgs {
    /// Channel name
    pub channel: String,

    /// publisher or subscriber (anything else subscribes)
    pub role: String,

    /// How the user is addressed: uid or userAccount
    pub mode: String,

    /// Numeric uid or user account, depending on mode
    pub uid: String,

    /// Token lifetime in seconds from now
    #[arg(long)]
    pub expiry: Option<String>,
}
