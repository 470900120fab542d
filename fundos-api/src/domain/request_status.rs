use serde::{Deserialize, Serialize};

use crate::domain::transition::WorkflowState;

/// Lifecycle of a fund-advance request, from submission through analysis,
/// execution, expense reporting and archival.
///
/// The `Report*` statuses track the embedded expense report as it moves
/// through review; `InDefault` ("em alcance") is reached when the reporting
/// deadline expires and is lifted only by an administrator unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestStatus {
    Draft,
    Submitted,
    UnderReview,
    ReturnedForAdjustment,
    Rejected,
    ApprovedForGrant,
    FundsReleased,
    InExecution,
    AwaitingReport,
    InDefault,
    Regularized,
    ReportSubmitted,
    ReportUnderReview,
    ReportReturned,
    ReportCorrected,
    ReportRejected,
    ReportApproved,
    Archived,
}

impl RequestStatus {
    /// All statuses, in lifecycle order. Used by table-totality checks and
    /// by UIs that render the full pipeline.
    pub const ALL: [RequestStatus; 18] = [
        RequestStatus::Draft,
        RequestStatus::Submitted,
        RequestStatus::UnderReview,
        RequestStatus::ReturnedForAdjustment,
        RequestStatus::Rejected,
        RequestStatus::ApprovedForGrant,
        RequestStatus::FundsReleased,
        RequestStatus::InExecution,
        RequestStatus::AwaitingReport,
        RequestStatus::InDefault,
        RequestStatus::Regularized,
        RequestStatus::ReportSubmitted,
        RequestStatus::ReportUnderReview,
        RequestStatus::ReportReturned,
        RequestStatus::ReportCorrected,
        RequestStatus::ReportRejected,
        RequestStatus::ReportApproved,
        RequestStatus::Archived,
    ];
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Draft => write!(f, "Draft"),
            RequestStatus::Submitted => write!(f, "Submitted"),
            RequestStatus::UnderReview => write!(f, "UnderReview"),
            RequestStatus::ReturnedForAdjustment => write!(f, "ReturnedForAdjustment"),
            RequestStatus::Rejected => write!(f, "Rejected"),
            RequestStatus::ApprovedForGrant => write!(f, "ApprovedForGrant"),
            RequestStatus::FundsReleased => write!(f, "FundsReleased"),
            RequestStatus::InExecution => write!(f, "InExecution"),
            RequestStatus::AwaitingReport => write!(f, "AwaitingReport"),
            RequestStatus::InDefault => write!(f, "InDefault"),
            RequestStatus::Regularized => write!(f, "Regularized"),
            RequestStatus::ReportSubmitted => write!(f, "ReportSubmitted"),
            RequestStatus::ReportUnderReview => write!(f, "ReportUnderReview"),
            RequestStatus::ReportReturned => write!(f, "ReportReturned"),
            RequestStatus::ReportCorrected => write!(f, "ReportCorrected"),
            RequestStatus::ReportRejected => write!(f, "ReportRejected"),
            RequestStatus::ReportApproved => write!(f, "ReportApproved"),
            RequestStatus::Archived => write!(f, "Archived"),
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(RequestStatus::Draft),
            "Submitted" => Ok(RequestStatus::Submitted),
            "UnderReview" => Ok(RequestStatus::UnderReview),
            "ReturnedForAdjustment" => Ok(RequestStatus::ReturnedForAdjustment),
            "Rejected" => Ok(RequestStatus::Rejected),
            "ApprovedForGrant" => Ok(RequestStatus::ApprovedForGrant),
            "FundsReleased" => Ok(RequestStatus::FundsReleased),
            "InExecution" => Ok(RequestStatus::InExecution),
            "AwaitingReport" => Ok(RequestStatus::AwaitingReport),
            "InDefault" => Ok(RequestStatus::InDefault),
            "Regularized" => Ok(RequestStatus::Regularized),
            "ReportSubmitted" => Ok(RequestStatus::ReportSubmitted),
            "ReportUnderReview" => Ok(RequestStatus::ReportUnderReview),
            "ReportReturned" => Ok(RequestStatus::ReportReturned),
            "ReportCorrected" => Ok(RequestStatus::ReportCorrected),
            "ReportRejected" => Ok(RequestStatus::ReportRejected),
            "ReportApproved" => Ok(RequestStatus::ReportApproved),
            "Archived" => Ok(RequestStatus::Archived),
            _ => Err(format!("Invalid RequestStatus: {s}")),
        }
    }
}

impl WorkflowState for RequestStatus {
    fn description(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "Draft: request not yet submitted for analysis",
            RequestStatus::Submitted => "Submitted: awaiting triage by the administrative office",
            RequestStatus::UnderReview => "Under review: request is being analyzed",
            RequestStatus::ReturnedForAdjustment => {
                "Returned for adjustment: requester must correct and resubmit"
            }
            RequestStatus::Rejected => "Rejected: request denied, no further action possible",
            RequestStatus::ApprovedForGrant => {
                "Approved: grant authorized, awaiting release of funds"
            }
            RequestStatus::FundsReleased => "Funds released: advance deposited to the requester",
            RequestStatus::InExecution => {
                "In execution: advance is being spent within the usage period"
            }
            RequestStatus::AwaitingReport => {
                "Awaiting expense report: usage period ended, accounts due"
            }
            RequestStatus::InDefault => {
                "In default: reporting deadline expired without an expense report"
            }
            RequestStatus::Regularized => "Regularized: default lifted, reporting reopened",
            RequestStatus::ReportSubmitted => "Expense report submitted: awaiting review",
            RequestStatus::ReportUnderReview => "Expense report under review",
            RequestStatus::ReportReturned => "Expense report returned: corrections required",
            RequestStatus::ReportCorrected => "Expense report corrected: awaiting a new review",
            RequestStatus::ReportRejected => "Expense report rejected: disallowance upheld",
            RequestStatus::ReportApproved => "Expense report approved: accounts reconciled",
            RequestStatus::Archived => "Archived: case closed",
        }
    }

    fn requires_reason(&self) -> bool {
        matches!(
            self,
            RequestStatus::ReturnedForAdjustment
                | RequestStatus::Rejected
                | RequestStatus::ReportReturned
                | RequestStatus::ReportRejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn every_status_round_trips_through_str() {
        for status in RequestStatus::ALL {
            assert_eq!(RequestStatus::from_str(&status.to_string()), Ok(status));
        }
        assert!(RequestStatus::from_str("Pending").is_err());
    }

    #[test]
    fn only_negative_actions_require_a_reason() {
        let negative: Vec<_> = RequestStatus::ALL
            .iter()
            .filter(|s| s.requires_reason())
            .collect();
        assert_eq!(
            negative,
            vec![
                &RequestStatus::ReturnedForAdjustment,
                &RequestStatus::Rejected,
                &RequestStatus::ReportReturned,
                &RequestStatus::ReportRejected,
            ]
        );
    }

    #[test]
    fn every_status_has_a_description() {
        for status in RequestStatus::ALL {
            assert!(!status.description().is_empty());
        }
    }
}
