use serde::{Deserialize, Serialize};

use crate::domain::transition::WorkflowState;

/// Settlement cycle shared by expense reports ("prestação de contas") and
/// reimbursements ("reembolso").
///
/// The two entity kinds use the same states but different transition tables:
/// the reimbursement table has no resubmission edge out of
/// `ReturnedForCorrection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportStatus {
    Draft,
    Pending,
    InReview,
    ReturnedForCorrection,
    Approved,
    Rejected,
    Concluded,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 7] = [
        ReportStatus::Draft,
        ReportStatus::Pending,
        ReportStatus::InReview,
        ReportStatus::ReturnedForCorrection,
        ReportStatus::Approved,
        ReportStatus::Rejected,
        ReportStatus::Concluded,
    ];
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Draft => write!(f, "Draft"),
            ReportStatus::Pending => write!(f, "Pending"),
            ReportStatus::InReview => write!(f, "InReview"),
            ReportStatus::ReturnedForCorrection => write!(f, "ReturnedForCorrection"),
            ReportStatus::Approved => write!(f, "Approved"),
            ReportStatus::Rejected => write!(f, "Rejected"),
            ReportStatus::Concluded => write!(f, "Concluded"),
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(ReportStatus::Draft),
            "Pending" => Ok(ReportStatus::Pending),
            "InReview" => Ok(ReportStatus::InReview),
            "ReturnedForCorrection" => Ok(ReportStatus::ReturnedForCorrection),
            "Approved" => Ok(ReportStatus::Approved),
            "Rejected" => Ok(ReportStatus::Rejected),
            "Concluded" => Ok(ReportStatus::Concluded),
            _ => Err(format!("Invalid ReportStatus: {s}")),
        }
    }
}

impl WorkflowState for ReportStatus {
    fn description(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "Draft: not yet submitted",
            ReportStatus::Pending => "Pending: submitted, awaiting triage",
            ReportStatus::InReview => "In review: being analyzed",
            ReportStatus::ReturnedForCorrection => {
                "Returned for correction: disallowance (glosa) to address"
            }
            ReportStatus::Approved => "Approved: awaiting conclusion",
            ReportStatus::Rejected => "Rejected: no further action possible",
            ReportStatus::Concluded => "Concluded: settled and closed",
        }
    }

    fn requires_reason(&self) -> bool {
        matches!(
            self,
            ReportStatus::ReturnedForCorrection | ReportStatus::Rejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn every_status_round_trips_through_str() {
        for status in ReportStatus::ALL {
            assert_eq!(ReportStatus::from_str(&status.to_string()), Ok(status));
        }
        assert!(ReportStatus::from_str("UnderReview").is_err());
    }

    #[test]
    fn only_negative_actions_require_a_reason() {
        for status in ReportStatus::ALL {
            let negative = matches!(
                status,
                ReportStatus::ReturnedForCorrection | ReportStatus::Rejected
            );
            assert_eq!(status.requires_reason(), negative);
        }
    }
}
