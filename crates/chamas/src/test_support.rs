//! Shared fixtures for the service tests: an in-memory database, the
//! reference ledger wrapped in a failure toggle, and a recording notifier.

use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;

use cycle_config::InviteConfig;
use cycle_database::{
    run_migrations, Chama, ContributeRequest, Contribution, ContributionCycle, CreateChamaRequest,
    CreateCycleRequest, InviteMemberRequest, RegisterUserRequest, User,
};
use cycle_ledger::{
    InMemoryLedger, Ledger, LedgerError, LedgerTransaction, RecordingNotifier,
};

use crate::service::ChamaService;

#[derive(Debug, Clone, Copy, PartialEq)]
enum FailMode {
    None,
    UserWallets,
    ChamaWallets,
    Payouts,
}

/// Ledger wrapper whose failure behaviour can be flipped mid-test.
#[derive(Clone)]
pub struct ToggleLedger {
    inner: InMemoryLedger,
    mode: Arc<StdMutex<FailMode>>,
}

impl ToggleLedger {
    fn new(inner: InMemoryLedger) -> Self {
        Self {
            inner,
            mode: Arc::new(StdMutex::new(FailMode::None)),
        }
    }

    fn set(&self, mode: FailMode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn current(&self) -> FailMode {
        *self.mode.lock().unwrap()
    }

    pub fn fail_user_wallets(&self) {
        self.set(FailMode::UserWallets);
    }

    pub fn fail_chama_wallets(&self) {
        self.set(FailMode::ChamaWallets);
    }

    pub fn fail_payouts(&self) {
        self.set(FailMode::Payouts);
    }

    pub fn recover(&self) {
        self.set(FailMode::None);
    }
}

#[async_trait]
impl Ledger for ToggleLedger {
    async fn create_user_wallet(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        if self.current() == FailMode::UserWallets {
            return Err(LedgerError::Unavailable("user wallet outage".to_string()));
        }
        self.inner.create_user_wallet(user_id, name).await
    }

    async fn create_chama_wallet(
        &self,
        chama_id: i64,
        name: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        if self.current() == FailMode::ChamaWallets {
            return Err(LedgerError::Unavailable("chama wallet outage".to_string()));
        }
        self.inner.create_chama_wallet(chama_id, name).await
    }

    async fn process_contribution(
        &self,
        user_id: i64,
        chama_id: i64,
        amount: f64,
        description: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        self.inner
            .process_contribution(user_id, chama_id, amount, description)
            .await
    }

    async fn process_payout(
        &self,
        chama_id: i64,
        recipient_user_id: i64,
        amount: f64,
        description: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        if self.current() == FailMode::Payouts {
            return Err(LedgerError::Unavailable("payout outage".to_string()));
        }
        self.inner
            .process_payout(chama_id, recipient_user_id, amount, description)
            .await
    }
}

pub struct TestContext {
    pub service: ChamaService,
    pub ledger: InMemoryLedger,
    pub ledger_toggle: ToggleLedger,
    pub notifier: RecordingNotifier,
}

impl TestContext {
    pub async fn register_user(&self, phone: &str) -> User {
        self.service
            .register_user(RegisterUserRequest {
                phone_number: phone.to_string(),
                display_name: None,
            })
            .await
            .unwrap()
    }

    /// Create a chama for `admin` and walk each of `members` through the
    /// invite-and-accept flow.
    pub async fn setup_chama(
        &self,
        admin: &User,
        members: &[&User],
        contribution_amount: f64,
        max_members: i64,
    ) -> Chama {
        let chama = self
            .service
            .create_chama(admin.id, chama_request(contribution_amount, max_members))
            .await
            .unwrap();

        for member in members {
            let invite = self
                .service
                .invite_member(
                    admin.id,
                    chama.id,
                    InviteMemberRequest {
                        user_id: member.id,
                        expires_in_hours: None,
                    },
                )
                .await
                .unwrap();
            self.service
                .accept_invite(member.id, invite.id)
                .await
                .unwrap();
        }

        chama
    }

    pub async fn create_cycle(&self, officer: &User, chama_id: i64) -> ContributionCycle {
        self.service
            .create_contribution_cycle(officer.id, chama_id, CreateCycleRequest::default())
            .await
            .unwrap()
    }

    pub async fn fund_user(&self, user_id: i64, amount: f64) {
        self.ledger.deposit_user(user_id, amount).await.unwrap();
    }

    pub async fn contribute(
        &self,
        user: &User,
        chama_id: i64,
        cycle_id: i64,
        amount: f64,
    ) -> Contribution {
        self.service
            .contribute_to_chama(
                user.id,
                chama_id,
                cycle_id,
                ContributeRequest { amount, notes: None },
            )
            .await
            .unwrap()
    }
}

pub fn chama_request(contribution_amount: f64, max_members: i64) -> CreateChamaRequest {
    CreateChamaRequest {
        name: "Umoja Savings".to_string(),
        description: None,
        contribution_amount,
        contribution_frequency: "monthly".to_string(),
        target_amount: None,
        max_members,
        settings: None,
    }
}

/// Fresh service over an in-memory database with migrations applied.
pub async fn test_service() -> TestContext {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();

    let ledger = InMemoryLedger::new();
    let toggle = ToggleLedger::new(ledger.clone());
    let notifier = RecordingNotifier::new();

    let service = ChamaService::new(
        pool,
        Arc::new(toggle.clone()),
        Arc::new(notifier.clone()),
        &InviteConfig { expiry_hours: 72 },
    );

    TestContext {
        service,
        ledger,
        ledger_toggle: toggle,
        notifier,
    }
}

/// Service whose ledger refuses to provision user wallets.
pub async fn test_service_with_failing_ledger() -> TestContext {
    let ctx = test_service().await;
    ctx.ledger_toggle.fail_user_wallets();
    ctx
}
