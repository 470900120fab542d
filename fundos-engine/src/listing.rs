use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fundos_api::domain::request_status::RequestStatus;
use fundos_api::domain::transition::WorkflowState;
use fundos_api::error::{WorkflowError, WorkflowResult};
use fundos_db::models::request::FundRequestModel;
use fundos_db::repository::query::QueryBy;

/// Filter understood by the request collection's `query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub requester_id: Option<Uuid>,
    pub expense_category: Option<String>,
    pub submitted_after: Option<DateTime<Utc>>,
    pub submitted_before: Option<DateTime<Utc>>,
    /// Case-insensitive match against justification, category and
    /// jurisdiction.
    pub text: Option<String>,
}

/// Whether a request satisfies the filter. Shared by the in-memory store
/// and by any host that filters an already-loaded collection.
pub fn matches(request: &FundRequestModel, filter: &RequestFilter) -> bool {
    if let Some(status) = filter.status {
        if request.status != status {
            return false;
        }
    }
    if let Some(requester_id) = filter.requester_id {
        if request.requester_id != requester_id {
            return false;
        }
    }
    if let Some(category) = &filter.expense_category {
        if !request
            .expense_category
            .as_str()
            .eq_ignore_ascii_case(category)
        {
            return false;
        }
    }
    if filter.submitted_after.is_some() || filter.submitted_before.is_some() {
        let Some(submitted_at) = request.submitted_at else {
            return false;
        };
        if let Some(after) = filter.submitted_after {
            if submitted_at < after {
                return false;
            }
        }
        if let Some(before) = filter.submitted_before {
            if submitted_at > before {
                return false;
            }
        }
    }
    if let Some(text) = &filter.text {
        let needle = text.to_lowercase();
        let haystacks = [
            request.justification.as_str(),
            request.expense_category.as_str(),
            request.jurisdiction.as_str(),
        ];
        if !haystacks
            .iter()
            .any(|hay| hay.to_lowercase().contains(&needle))
        {
            return false;
        }
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestSortKey {
    SubmittedAt,
    Amount,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort in place. Status order is lifecycle order; unsubmitted requests
/// sort first under `SubmittedAt`.
pub fn sort_requests(rows: &mut [FundRequestModel], key: RequestSortKey, direction: SortDirection) {
    match key {
        RequestSortKey::SubmittedAt => rows.sort_by_key(|row| row.submitted_at),
        RequestSortKey::Amount => rows.sort_by_key(|row| row.amount),
        RequestSortKey::Status => rows.sort_by_key(|row| row.status),
    }
    if direction == SortDirection::Descending {
        rows.reverse();
    }
}

/// Row shape for the request list screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSummary {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub status: RequestStatus,
    pub status_description: String,
    pub expense_category: String,
    pub amount: Decimal,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl From<&FundRequestModel> for RequestSummary {
    fn from(request: &FundRequestModel) -> Self {
        Self {
            id: request.id,
            requester_id: request.requester_id,
            status: request.status,
            status_description: request.status.description().to_string(),
            expense_category: request.expense_category.as_str().to_string(),
            amount: request.amount,
            submitted_at: request.submitted_at,
        }
    }
}

/// Read-side projection over the request collection.
pub struct RequestListing {
    store: Arc<dyn QueryBy<FundRequestModel, RequestFilter>>,
}

impl RequestListing {
    pub fn new(store: Arc<dyn QueryBy<FundRequestModel, RequestFilter>>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        filter: &RequestFilter,
        key: RequestSortKey,
        direction: SortDirection,
    ) -> WorkflowResult<Vec<RequestSummary>> {
        let mut rows = self
            .store
            .query(filter)
            .await
            .map_err(WorkflowError::internal)?;
        sort_requests(&mut rows, key, direction);
        Ok(rows.iter().map(RequestSummary::from).collect())
    }
}
