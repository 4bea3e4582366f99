//! Order API - HTTP server and operator commands.

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use domain::ROLE_ADMIN;
use gateway_lib::config::GatewayConfig;
use user_service_lib::config::UserServiceConfig;
use user_service_lib::MigrateAction;

#[derive(Parser)]
#[command(name = "order-api")]
#[command(author, version, about = "Order backend API server", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(short = 'H', long, env = "SERVER_HOST")]
        host: Option<String>,
        #[arg(short, long, env = "SERVER_PORT")]
        port: Option<u16>,
    },

    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateCommand,
    },

    /// Create an administrator account
    CreateAdmin(CreateAdminArgs),
}

#[derive(Subcommand)]
enum MigrateCommand {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

impl From<MigrateCommand> for MigrateAction {
    fn from(command: MigrateCommand) -> Self {
        match command {
            MigrateCommand::Up => MigrateAction::Up,
            MigrateCommand::Down => MigrateAction::Down,
            MigrateCommand::Status => MigrateAction::Status,
            MigrateCommand::Fresh => MigrateAction::Fresh,
        }
    }
}

#[derive(Args)]
struct CreateAdminArgs {
    #[arg(long, env = "ADMIN_USERNAME")]
    username: String,
    #[arg(long, env = "ADMIN_EMAIL")]
    email: String,
    /// Must satisfy the password policy
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value = ROLE_ADMIN)]
    role: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Serve { host, port } => {
            let mut config = GatewayConfig::from_env();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            gateway_lib::run_server(config).await
        }
        Commands::Migrate { action } => {
            user_service_lib::run_migrations(&UserServiceConfig::from_env(), action.into())
                .await
                .map(|states| {
                    for state in states {
                        let marker = if state.applied { "[x]" } else { "[ ]" };
                        println!("{} {}", marker, state.name);
                    }
                })
                .map_err(Into::into)
        }
        Commands::CreateAdmin(args) => {
            gateway_lib::create_admin(args.username, args.email, args.password, args.role)
                .await
                .map(|user| {
                    tracing::info!(user_id = %user.id, role = %user.role, "Account created");
                })
        }
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing subscriber
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".to_string())
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
