use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::domain::report_status::ReportStatus;
use crate::domain::request_status::RequestStatus;
use crate::domain::role::ActorRole;

/// Capabilities every workflow status enum must expose.
pub trait WorkflowState:
    Copy + Clone + Eq + Hash + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static
{
    /// Human-readable description, shown in list screens and in the
    /// confirmation dialog before a transition is committed.
    fn description(&self) -> &'static str;

    /// Whether reaching this status demands a non-empty reason
    /// (return-for-correction and reject actions).
    fn requires_reason(&self) -> bool;
}

/// The entity kinds governed by a transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowKind {
    FundRequest,
    ExpenseReport,
    Reimbursement,
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowKind::FundRequest => write!(f, "FundRequest"),
            WorkflowKind::ExpenseReport => write!(f, "ExpenseReport"),
            WorkflowKind::Reimbursement => write!(f, "Reimbursement"),
        }
    }
}

/// Role-gated transition map for one entity kind.
///
/// Transitions are encoded as data rather than code branches so the UI
/// (deciding which action buttons to render) and the status machine
/// (validating a requested move) share one source of truth.
#[derive(Debug, Clone)]
pub struct TransitionTable<S: WorkflowState> {
    kind: WorkflowKind,
    edges: HashMap<(ActorRole, S), HashSet<S>>,
}

impl<S: WorkflowState> TransitionTable<S> {
    fn new(kind: WorkflowKind) -> Self {
        Self {
            kind,
            edges: HashMap::new(),
        }
    }

    fn allow(mut self, role: ActorRole, from: S, to: &[S]) -> Self {
        self.edges
            .entry((role, from))
            .or_default()
            .extend(to.iter().copied());
        self
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    /// Statuses reachable by `role` from `from`.
    ///
    /// Pure and total: unknown (role, status) pairs yield the empty set
    /// rather than an error.
    pub fn available_transitions(&self, role: ActorRole, from: S) -> HashSet<S> {
        self.edges.get(&(role, from)).cloned().unwrap_or_default()
    }

    pub fn permits(&self, role: ActorRole, from: S, to: S) -> bool {
        self.edges
            .get(&(role, from))
            .map(|targets| targets.contains(&to))
            .unwrap_or(false)
    }

    /// A status is terminal when no role has an outgoing edge from it.
    pub fn is_terminal(&self, status: S) -> bool {
        !self.edges.keys().any(|(_, from)| *from == status)
    }
}

/// Transition table for the fund-request lifecycle.
///
/// Requesters drive submission and resubmission, administrators drive every
/// review decision, and the system principal drives the timer edges (period
/// start, period end, reporting deadline).
pub fn fund_request_transitions() -> TransitionTable<RequestStatus> {
    use ActorRole::{Administrator, Requester, System};
    use RequestStatus::*;

    TransitionTable::new(WorkflowKind::FundRequest)
        .allow(Requester, Draft, &[Submitted])
        .allow(Requester, ReturnedForAdjustment, &[Submitted])
        .allow(Requester, AwaitingReport, &[ReportSubmitted])
        .allow(Requester, Regularized, &[ReportSubmitted])
        .allow(Requester, ReportReturned, &[ReportCorrected])
        .allow(Administrator, Submitted, &[UnderReview])
        .allow(
            Administrator,
            UnderReview,
            &[ApprovedForGrant, ReturnedForAdjustment, Rejected],
        )
        .allow(Administrator, ApprovedForGrant, &[FundsReleased])
        .allow(Administrator, ReportSubmitted, &[ReportUnderReview])
        .allow(Administrator, ReportCorrected, &[ReportUnderReview])
        .allow(
            Administrator,
            ReportUnderReview,
            &[ReportApproved, ReportReturned, ReportRejected],
        )
        .allow(Administrator, ReportApproved, &[Archived])
        .allow(Administrator, InDefault, &[Regularized])
        .allow(System, FundsReleased, &[InExecution])
        .allow(System, InExecution, &[AwaitingReport])
        .allow(System, AwaitingReport, &[InDefault])
}

/// Transition table for the expense-report ("prestação de contas") cycle.
pub fn expense_report_transitions() -> TransitionTable<ReportStatus> {
    use ActorRole::{Administrator, Requester};
    use ReportStatus::*;

    TransitionTable::new(WorkflowKind::ExpenseReport)
        .allow(Requester, Draft, &[Pending])
        .allow(Requester, ReturnedForCorrection, &[Pending])
        .allow(Administrator, Pending, &[InReview])
        .allow(
            Administrator,
            InReview,
            &[Approved, ReturnedForCorrection, Rejected],
        )
        .allow(Administrator, Approved, &[Concluded])
}

/// Transition table for the reimbursement ("reembolso") cycle.
///
/// Identical to the expense-report table except that a reimbursement
/// returned for correction cannot be resubmitted.
pub fn reimbursement_transitions() -> TransitionTable<ReportStatus> {
    use ActorRole::{Administrator, Requester};
    use ReportStatus::*;

    TransitionTable::new(WorkflowKind::Reimbursement)
        .allow(Requester, Draft, &[Pending])
        .allow(Administrator, Pending, &[InReview])
        .allow(
            Administrator,
            InReview,
            &[Approved, ReturnedForCorrection, Rejected],
        )
        .allow(Administrator, Approved, &[Concluded])
}
