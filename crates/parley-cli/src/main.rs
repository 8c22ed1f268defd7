//! Parley line client entry point.
//!
//! # Usage
//!
//! ```bash
//! parley --server ws://localhost:3000/socket --user-id u1 --display-name Alice
//! ```

use clap::Parser;
use parley_app::{Runtime, RuntimeConfig};
use parley_cli::{Repl, WsDriver};
use parley_core::env::SystemEnv;
use parley_proto::UserIdentity;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Parley chat client
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Line-oriented client for the Parley chat protocol")]
#[command(version)]
struct Args {
    /// Socket endpoint of the chat server
    #[arg(short, long, env = "PARLEY_SERVER_URL", default_value = "ws://localhost:3000/socket")]
    server: String,

    /// User ID sent as connection metadata
    #[arg(short, long, env = "PARLEY_USER_ID")]
    user_id: String,

    /// Display name shown on sent messages
    #[arg(short, long, env = "PARLEY_DISPLAY_NAME")]
    display_name: Option<String>,

    /// Avatar URL
    #[arg(long, env = "PARLEY_AVATAR")]
    avatar: Option<String>,

    /// Seconds to wait for a send acknowledgement
    #[arg(long, default_value = "10")]
    send_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let display_name = args.display_name.unwrap_or_else(|| args.user_id.clone());
    let mut identity = UserIdentity::new(args.user_id, display_name);
    if let Some(avatar) = args.avatar {
        identity = identity.with_avatar(avatar);
    }

    let mut config = RuntimeConfig::default();
    config.client.send_ack_timeout = std::time::Duration::from_secs(args.send_timeout);

    tracing::info!(server = %args.server, user_id = %identity.id, "starting");

    let (runtime, handle) = Runtime::new(WsDriver::new(args.server), SystemEnv::new(), config);
    let runtime = tokio::spawn(runtime.run());

    Repl::new(handle, identity).run().await?;
    runtime.await?;

    Ok(())
}
