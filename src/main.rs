use clap::{Parser, Subcommand};

mod app;
mod auth;
mod clock;
mod config;
mod error;
mod images;
mod products;
mod seed;
mod state;
mod storage;
#[cfg(test)]
mod test_support;

use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "catalog", about = "Product catalog API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create a user who can log in
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Wipe the catalog and insert sample products
    Seed {
        #[arg(long, default_value_t = 20)]
        products: usize,
    },
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "catalog=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let state = AppState::init().await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let addr = state.config.listen_addr;
            app::serve(app::build_app(state), addr).await
        }
        Command::CreateUser { email, password } => {
            seed::create_user(&state, &email, &password).await.map(|_| ())
        }
        Command::Seed { products } => seed::seed_products(&state, products).await,
    }
}
