use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cycle_chamas::ChamaService;
use cycle_config::load as load_config;
use cycle_database::{
    initialize_database, CreateChamaRequest, CreateCycleRequest, InviteMemberRequest,
    RegisterUserRequest,
};
use cycle_gateway::{create_router, GatewayState};
use cycle_ledger::{InMemoryLedger, LogNotifier};

#[derive(Parser)]
#[command(name = "cycle-server", about = "Cycle chama platform backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Populate the database with a demo chama for local development.
    SeedData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config = load_config().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::SeedData => seed(config).await,
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(env_filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")
}

async fn serve(config: cycle_config::AppConfig) -> anyhow::Result<()> {
    info!("starting Cycle backend");

    let pool = initialize_database(&config.database)
        .await
        .with_context(|| format!("failed to initialize database {}", config.database.url))?;

    let state = GatewayState::new(
        pool,
        Arc::new(InMemoryLedger::new()),
        Arc::new(LogNotifier),
        &config.invites,
    );
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

/// Seed a demo chama: three members, an open cycle, and one contribution.
async fn seed(config: cycle_config::AppConfig) -> anyhow::Result<()> {
    let pool = initialize_database(&config.database)
        .await
        .with_context(|| format!("failed to initialize database {}", config.database.url))?;

    let ledger = Arc::new(InMemoryLedger::new());
    let service = ChamaService::new(
        pool,
        ledger.clone(),
        Arc::new(LogNotifier),
        &config.invites,
    );

    let admin = service
        .register_user(RegisterUserRequest {
            phone_number: "+254700000001".to_string(),
            display_name: Some("Wanjiku".to_string()),
        })
        .await?;
    let treasurer = service
        .register_user(RegisterUserRequest {
            phone_number: "+254700000002".to_string(),
            display_name: Some("Otieno".to_string()),
        })
        .await?;
    let member = service
        .register_user(RegisterUserRequest {
            phone_number: "+254700000003".to_string(),
            display_name: Some("Akinyi".to_string()),
        })
        .await?;

    let chama = service
        .create_chama(
            admin.id,
            CreateChamaRequest {
                name: "Umoja Savings Circle".to_string(),
                description: Some("Demo chama seeded for development".to_string()),
                contribution_amount: 1000.0,
                contribution_frequency: "monthly".to_string(),
                target_amount: None,
                max_members: 10,
                settings: None,
            },
        )
        .await?;

    for user in [&treasurer, &member] {
        let invite = service
            .invite_member(
                admin.id,
                chama.id,
                InviteMemberRequest {
                    user_id: user.id,
                    expires_in_hours: None,
                },
            )
            .await?;
        service.accept_invite(user.id, invite.id).await?;
    }

    let cycle = service
        .create_contribution_cycle(admin.id, chama.id, CreateCycleRequest::default())
        .await?;

    ledger.deposit_user(member.id, 5000.0).await?;
    service
        .contribute_to_chama(
            member.id,
            chama.id,
            cycle.id,
            cycle_database::ContributeRequest {
                amount: 1000.0,
                notes: Some("seed contribution".to_string()),
            },
        )
        .await?;

    info!(
        chama_id = chama.id,
        cycle_id = cycle.id,
        admin_token = %admin.api_token,
        treasurer_token = %treasurer.api_token,
        member_token = %member.api_token,
        "seed data created"
    );

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
