use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::attachment::AttachmentRef;

fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("amount_not_positive"))
    }
}

/// Command payload for opening a fund-advance request.
///
/// Declarative checks cover field shape; ordering of the usage period is
/// enforced by the request service before the model is built.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FundRequestPayload {
    pub requester_id: Uuid,

    #[validate(length(min = 1, max = 50))]
    pub expense_category: String,

    #[validate(length(min = 1, max = 20))]
    pub cost_center: String,

    /// Comarca / judicial district the advance serves.
    #[validate(length(min = 1, max = 50))]
    pub jurisdiction: String,

    #[validate(custom(function = positive_amount))]
    pub amount: Decimal,

    #[validate(length(min = 1, max = 2000))]
    pub justification: String,

    pub period_start: NaiveDate,
    pub period_end: NaiveDate,

    pub attachment: Option<AttachmentRef>,
}

/// One declared expense line, filled client-side by the requester.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExpenseLineItemPayload {
    /// Client-assigned id, unique within the report.
    pub id: Uuid,

    pub incurred_on: NaiveDate,

    #[validate(length(min = 1, max = 500))]
    pub description: String,

    #[validate(custom(function = positive_amount))]
    pub amount: Decimal,

    pub receipt: AttachmentRef,
}

/// Command payload for submitting or correcting an expense report.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExpenseReportPayload {
    #[validate(length(max = 2000))]
    pub notes: Option<String>,

    /// Total as declared by the requester. When present it must equal the
    /// sum of the line items; the recorded total is always the computed sum.
    pub declared_total: Option<Decimal>,

    #[validate(length(min = 1))]
    #[validate(nested)]
    pub items: Vec<ExpenseLineItemPayload>,
}

/// Command payload for opening a reimbursement.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReimbursementPayload {
    pub requester_id: Uuid,

    #[validate(custom(function = positive_amount))]
    pub amount: Decimal,

    #[validate(length(min = 1, max = 500))]
    pub description: String,

    pub receipt: Option<AttachmentRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_item(amount: &str) -> ExpenseLineItemPayload {
        ExpenseLineItemPayload {
            id: Uuid::new_v4(),
            incurred_on: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            description: "Fuel for official vehicle".to_string(),
            amount: amount.parse().unwrap(),
            receipt: AttachmentRef::new("receipt.pdf", 1024).unwrap(),
        }
    }

    #[test]
    fn rejects_nonpositive_amounts() {
        assert!(line_item("0").validate().is_err());
        assert!(line_item("-5.00").validate().is_err());
        assert!(line_item("85.50").validate().is_ok());
    }

    #[test]
    fn rejects_reports_without_line_items() {
        let payload = ExpenseReportPayload {
            notes: None,
            declared_total: None,
            items: Vec::new(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn form_json_deserializes_into_a_payload() {
        let raw = serde_json::json!({
            "requester_id": Uuid::new_v4(),
            "expense_category": "Consumables",
            "cost_center": "CC-101",
            "jurisdiction": "Capital District",
            "amount": "1500.00",
            "justification": "Small urgent expenses",
            "period_start": "2024-03-05",
            "period_end": "2024-04-04",
            "attachment": null
        });
        let payload: FundRequestPayload = serde_json::from_value(raw).unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.amount, "1500.00".parse().unwrap());
    }

    #[test]
    fn nested_items_are_validated() {
        let payload = ExpenseReportPayload {
            notes: None,
            declared_total: None,
            items: vec![line_item("85.50"), line_item("-1.00")],
        };
        assert!(payload.validate().is_err());
    }
}
