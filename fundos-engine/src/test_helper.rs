use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use fundos_api::domain::attachment::AttachmentRef;
use fundos_api::domain::payload::{
    ExpenseLineItemPayload, ExpenseReportPayload, FundRequestPayload, ReimbursementPayload,
};
use fundos_api::domain::request_status::RequestStatus;
use fundos_api::domain::role::ActorRole;
use fundos_api::service::clock::Clock;
use fundos_api::service::extraction::{ExtractedReceipt, ExtractionError, ExtractionProvider};
use fundos_api::service::notification::{NotificationSink, StatusChangeNotice};
use fundos_db::models::reimbursement::ReimbursementModel;
use fundos_db::models::request::FundRequestModel;
use fundos_db::repository::entity_store::EntityStore;

use crate::reimbursements::ReimbursementService;
use crate::requests::FundRequestService;
use crate::store::memory::{InMemoryEntityStore, InMemoryIdentityProvider};

pub const SYSTEM_USER: Uuid = Uuid::nil();

type TestError = Box<dyn std::error::Error + Send + Sync>;

/// Clock pinned to a start instant, advanced explicitly by tests.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        *self.now.lock() += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Sink that records every notice it receives.
#[derive(Default)]
pub struct CollectingSink {
    notices: Mutex<Vec<StatusChangeNotice>>,
}

impl CollectingSink {
    pub fn count(&self) -> usize {
        self.notices.lock().len()
    }

    pub fn last(&self) -> Option<StatusChangeNotice> {
        self.notices.lock().last().cloned()
    }
}

#[async_trait]
impl NotificationSink for CollectingSink {
    async fn notify(&self, notice: StatusChangeNotice) -> Result<(), TestError> {
        self.notices.lock().push(notice);
        Ok(())
    }
}

/// Sink that always fails, for verifying notification failures never roll
/// back a transition.
pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn notify(&self, _notice: StatusChangeNotice) -> Result<(), TestError> {
        Err("notification channel down".into())
    }
}

/// Extraction stub scripted per receipt name, with an invocation counter
/// for memoization checks and optional per-receipt delays for timeout
/// checks.
pub struct ScriptedExtraction {
    outcomes: Mutex<HashMap<String, Result<ExtractedReceipt, ExtractionError>>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl ScriptedExtraction {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, receipt_name: &str, outcome: Result<ExtractedReceipt, ExtractionError>) {
        self.outcomes.lock().insert(receipt_name.to_string(), outcome);
    }

    pub fn delay(&self, receipt_name: &str, delay: Duration) {
        self.delays.lock().insert(receipt_name.to_string(), delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionProvider for ScriptedExtraction {
    async fn extract(&self, receipt: &AttachmentRef) -> Result<ExtractedReceipt, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().get(receipt.name.as_str()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.outcomes
            .lock()
            .get(receipt.name.as_str())
            .cloned()
            .unwrap_or_else(|| {
                Err(ExtractionError::Unreadable(format!(
                    "no script for {}",
                    receipt.name
                )))
            })
    }
}

pub struct RequestContext {
    pub clock: Arc<FixedClock>,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub notifier: Arc<CollectingSink>,
    pub store: Arc<InMemoryEntityStore<FundRequestModel>>,
    pub requests: FundRequestService,
    pub requester: Uuid,
    pub admin: Uuid,
}

impl RequestContext {
    pub fn entity_store(&self) -> Arc<dyn EntityStore<FundRequestModel>> {
        self.store.clone()
    }

    pub async fn submitted_request(&self) -> Result<FundRequestModel, TestError> {
        let draft = self
            .requests
            .create_draft(&sample_request_payload(self.requester))
            .await?;
        Ok(self.requests.submit(draft.id, self.requester).await?)
    }

    /// Walk a fresh request to `AwaitingReport`: admin approval and release,
    /// then the two system timer steps.
    pub async fn awaiting_report_request(&self) -> Result<FundRequestModel, TestError> {
        let request = self.submitted_request().await?;
        self.requests.begin_review(request.id, self.admin).await?;
        self.requests.approve(request.id, self.admin).await?;
        self.requests.release_funds(request.id, self.admin).await?;
        self.requests
            .machine()
            .transition(request.id, RequestStatus::InExecution, SYSTEM_USER, None)
            .await?;
        Ok(self
            .requests
            .machine()
            .transition(request.id, RequestStatus::AwaitingReport, SYSTEM_USER, None)
            .await?)
    }

    pub async fn reported_request(&self) -> Result<FundRequestModel, TestError> {
        let request = self.awaiting_report_request().await?;
        Ok(self
            .requests
            .submit_expense_report(request.id, self.requester, &sample_report_payload())
            .await?)
    }
}

pub fn setup_request_context() -> RequestContext {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ));
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let notifier = Arc::new(CollectingSink::default());
    let store = Arc::new(InMemoryEntityStore::new());

    let requester = Uuid::new_v4();
    let admin = Uuid::new_v4();
    identity.register(requester, ActorRole::Requester);
    identity.register(admin, ActorRole::Administrator);

    let requests = FundRequestService::new(
        store.clone(),
        identity.clone(),
        clock.clone(),
        notifier.clone(),
    );

    RequestContext {
        clock,
        identity,
        notifier,
        store,
        requests,
        requester,
        admin,
    }
}

pub struct ReimbursementContext {
    pub reimbursements: ReimbursementService,
    pub requester: Uuid,
    pub admin: Uuid,
}

pub fn setup_reimbursement_context() -> ReimbursementContext {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ));
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let store: Arc<InMemoryEntityStore<ReimbursementModel>> = Arc::new(InMemoryEntityStore::new());

    let requester = Uuid::new_v4();
    let admin = Uuid::new_v4();
    identity.register(requester, ActorRole::Requester);
    identity.register(admin, ActorRole::Administrator);

    let reimbursements = ReimbursementService::new(
        store,
        identity,
        clock,
        Arc::new(CollectingSink::default()),
    );

    ReimbursementContext {
        reimbursements,
        requester,
        admin,
    }
}

pub fn sample_request_payload(requester_id: Uuid) -> FundRequestPayload {
    FundRequestPayload {
        requester_id,
        expense_category: "Consumables".to_string(),
        cost_center: "CC-101".to_string(),
        jurisdiction: "Capital District".to_string(),
        amount: "1500.00".parse().unwrap(),
        justification: "Small urgent expenses for the jury session".to_string(),
        period_start: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        period_end: NaiveDate::from_ymd_opt(2024, 4, 4).unwrap(),
        attachment: None,
    }
}

fn report_line(amount: &str, receipt_name: &str) -> ExpenseLineItemPayload {
    ExpenseLineItemPayload {
        id: Uuid::new_v4(),
        incurred_on: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
        description: "Session expense".to_string(),
        amount: amount.parse().unwrap(),
        receipt: AttachmentRef::new(receipt_name, 2048).unwrap(),
    }
}

pub fn sample_report_payload() -> ExpenseReportPayload {
    ExpenseReportPayload {
        notes: Some("All receipts attached".to_string()),
        declared_total: None,
        items: vec![
            report_line("85.50", "receipt-1.pdf"),
            report_line("60.00", "receipt-2.pdf"),
            report_line("95.25", "receipt-3.pdf"),
            report_line("65.00", "receipt-4.pdf"),
            report_line("850.00", "receipt-5.pdf"),
        ],
    }
}

pub fn sample_reimbursement_payload(requester_id: Uuid) -> ReimbursementPayload {
    ReimbursementPayload {
        requester_id,
        amount: "230.40".parse().unwrap(),
        description: "Parking during the external inspection".to_string(),
        receipt: Some(AttachmentRef::new("parking.pdf", 512).unwrap()),
    }
}
