use clap::Parser;
use log::{error, info};
use server::config::{ServerConfig, SessionConfig};
use server::network::Server;
use shared::{DEFAULT_GAME_TIME, MIN_PLAYERS, TAG_DISTANCE};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Game length in countdown ticks
    #[arg(short, long, default_value_t = DEFAULT_GAME_TIME)]
    game_time: u32,

    /// Milliseconds between countdown ticks
    #[arg(long, default_value = "1000")]
    tick_ms: u64,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "64")]
    max_connections: usize,

    /// Players needed to start a game
    #[arg(long, default_value_t = MIN_PLAYERS)]
    min_players: usize,

    /// Tags land below this distance
    #[arg(long, default_value_t = TAG_DISTANCE)]
    tag_distance: f32,

    /// Seed for tagger selection
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        addr: format!("{}:{}", args.host, args.port),
        max_connections: args.max_connections,
        tick_interval: Duration::from_millis(args.tick_ms),
        seed: args.seed,
        session: SessionConfig {
            game_duration_secs: args.game_time,
            min_players: args.min_players,
            tag_distance: args.tag_distance,
        },
    };

    info!("Starting tag server on {}", config.addr);
    info!(
        "Games need {} players and last {} ticks of {}ms",
        config.session.min_players, config.session.game_duration_secs, args.tick_ms
    );

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
