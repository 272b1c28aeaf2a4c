//! Cycle Database Crate
//!
//! Connection management, embedded migrations, and entity definitions for
//! the Cycle chama platform.

use sqlx::SqlitePool;

pub use cycle_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod types;

pub use connection::{prepare_database, DatabaseConnection};
pub use migrations::run_migrations;

pub use entities::{
    chama::{Chama, ChamaStatus, CreateChamaRequest},
    contribution::{ContributeRequest, Contribution},
    cycle::{ContributionCycle, CreateCycleRequest, CycleStatus},
    invite::{ChamaInvite, InviteMemberRequest, InviteStatus},
    member::{ChamaMember, MemberRole, MemberStatus, UpdateMemberRoleRequest},
    payout::Payout,
    user::{RegisterUserRequest, User},
};

pub use types::{errors::DatabaseError, DatabaseResult};

/// Initialize the database with migrations applied.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}
