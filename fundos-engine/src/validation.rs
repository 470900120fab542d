use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use uuid::Uuid;

use fundos_api::service::extraction::{ExtractedReceipt, ExtractionProvider};
use fundos_db::models::expense_report::ExpenseLineItemModel;

/// Per-item extraction budget. Providers slower than this degrade the item
/// to `Error` rather than holding the reviewer's screen.
pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Processing,
    Validated,
    Error,
}

/// Mismatch between a declared line item and its extracted receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Discrepancy {
    Amount,
    Date,
}

/// Advisory annotation for one line item. Never persisted with the request
/// and never consulted by the status machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub item_id: Uuid,
    pub status: ValidationStatus,
    pub extracted: Option<ExtractedReceipt>,
    pub discrepancies: Vec<Discrepancy>,
}

impl ValidationResult {
    fn processing(item_id: Uuid) -> Self {
        Self {
            item_id,
            status: ValidationStatus::Processing,
            extracted: None,
            discrepancies: Vec::new(),
        }
    }

    fn error(item_id: Uuid) -> Self {
        Self {
            item_id,
            status: ValidationStatus::Error,
            extracted: None,
            discrepancies: Vec::new(),
        }
    }
}

/// Best-effort receipt checker for a viewing session.
///
/// Results are memoized by (report, item): a resolved item is never
/// re-extracted within the session, and concurrent calls for the same item
/// collapse into a single extraction. Dropping the validator discards the
/// session's results; nothing propagates to the provider.
#[derive(Clone)]
pub struct ReceiptValidator {
    provider: Arc<dyn ExtractionProvider>,
    cache: Cache<(Uuid, Uuid), ValidationResult>,
    timeout: Duration,
}

impl ReceiptValidator {
    pub fn new(provider: Arc<dyn ExtractionProvider>) -> Self {
        Self::with_timeout(provider, DEFAULT_EXTRACTION_TIMEOUT)
    }

    pub fn with_timeout(provider: Arc<dyn ExtractionProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            cache: Cache::builder().max_capacity(10_000).build(),
            timeout,
        }
    }

    /// Validate one line item, returning the memoized result when the item
    /// was already resolved for this report.
    pub async fn validate_item(
        &self,
        report_id: Uuid,
        item: &ExpenseLineItemModel,
    ) -> ValidationResult {
        let key = (report_id, item.id);
        let provider = Arc::clone(&self.provider);
        let budget = self.timeout;
        let subject = item.clone();
        self.cache
            .get_with(key, async move { run_extraction(provider, budget, subject).await })
            .await
    }

    /// Validate a whole report: one concurrent task per line item, no
    /// ordering guarantee between extractions. One item failing never
    /// affects its siblings. Results come back in item order.
    pub async fn validate_report(
        &self,
        report_id: Uuid,
        items: &[ExpenseLineItemModel],
    ) -> Vec<ValidationResult> {
        let mut tasks = JoinSet::new();
        for item in items {
            let validator = self.clone();
            let item = item.clone();
            tasks.spawn(async move { validator.validate_item(report_id, &item).await });
        }

        let mut by_item: HashMap<Uuid, ValidationResult> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(result) = joined {
                by_item.insert(result.item_id, result);
            }
        }
        items
            .iter()
            .filter_map(|item| by_item.remove(&item.id))
            .collect()
    }

    /// Non-blocking view for the reviewer's screen: resolved items return
    /// their result, anything still (or not yet) extracting shows as
    /// `Processing`.
    pub async fn snapshot(
        &self,
        report_id: Uuid,
        items: &[ExpenseLineItemModel],
    ) -> Vec<ValidationResult> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let key = (report_id, item.id);
            match self.cache.get(&key).await {
                Some(resolved) => results.push(resolved),
                None => results.push(ValidationResult::processing(item.id)),
            }
        }
        results
    }
}

async fn run_extraction(
    provider: Arc<dyn ExtractionProvider>,
    budget: Duration,
    item: ExpenseLineItemModel,
) -> ValidationResult {
    match tokio::time::timeout(budget, provider.extract(&item.receipt)).await {
        Ok(Ok(extracted)) => {
            let mut discrepancies = Vec::new();
            // Exact-equality policy: any nonzero delta is a discrepancy.
            if extracted.amount != item.amount {
                discrepancies.push(Discrepancy::Amount);
            }
            if extracted.issued_on != item.incurred_on {
                discrepancies.push(Discrepancy::Date);
            }
            ValidationResult {
                item_id: item.id,
                status: ValidationStatus::Validated,
                extracted: Some(extracted),
                discrepancies,
            }
        }
        Ok(Err(err)) => {
            tracing::debug!(item_id = %item.id, error = %err, "receipt extraction failed");
            ValidationResult::error(item.id)
        }
        Err(_) => {
            tracing::debug!(item_id = %item.id, "receipt extraction timed out");
            ValidationResult::error(item.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::ScriptedExtraction;
    use chrono::NaiveDate;
    use fundos_api::domain::attachment::AttachmentRef;
    use fundos_api::service::extraction::ExtractionError;

    type TestError = Box<dyn std::error::Error + Send + Sync>;

    fn line_item(amount: &str, receipt_name: &str) -> ExpenseLineItemModel {
        ExpenseLineItemModel {
            id: Uuid::new_v4(),
            incurred_on: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            description: "Fuel for official vehicle".to_string(),
            amount: amount.parse().unwrap(),
            receipt: AttachmentRef::new(receipt_name, 2048).unwrap(),
        }
    }

    fn receipt(amount: &str, day: u32) -> ExtractedReceipt {
        ExtractedReceipt {
            amount: amount.parse().unwrap(),
            issued_on: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn matching_receipts_validate_clean() -> Result<(), TestError> {
        let provider = Arc::new(ScriptedExtraction::new());
        provider.script("a.pdf", Ok(receipt("85.50", 11)));
        let validator = ReceiptValidator::new(provider);

        let item = line_item("85.50", "a.pdf");
        let result = validator.validate_item(Uuid::new_v4(), &item).await;

        assert_eq!(result.status, ValidationStatus::Validated);
        assert!(result.discrepancies.is_empty());
        assert_eq!(result.extracted, Some(receipt("85.50", 11)));
        Ok(())
    }

    #[tokio::test]
    async fn any_nonzero_amount_delta_is_flagged() -> Result<(), TestError> {
        let provider = Arc::new(ScriptedExtraction::new());
        provider.script("a.pdf", Ok(receipt("85.51", 11)));
        provider.script("b.pdf", Ok(receipt("60.00", 12)));
        let validator = ReceiptValidator::new(provider);
        let report = Uuid::new_v4();

        let off_by_a_cent = validator
            .validate_item(report, &line_item("85.50", "a.pdf"))
            .await;
        assert_eq!(off_by_a_cent.discrepancies, vec![Discrepancy::Amount]);

        let wrong_day = validator
            .validate_item(report, &line_item("60.00", "b.pdf"))
            .await;
        assert_eq!(wrong_day.discrepancies, vec![Discrepancy::Date]);
        Ok(())
    }

    #[tokio::test]
    async fn extraction_failure_is_an_error_without_flags() -> Result<(), TestError> {
        let provider = Arc::new(ScriptedExtraction::new());
        provider.script(
            "broken.pdf",
            Err(ExtractionError::Unreadable("blank scan".to_string())),
        );
        provider.script("fine.pdf", Ok(receipt("60.00", 11)));
        let validator = ReceiptValidator::new(provider);
        let report = Uuid::new_v4();

        let items = vec![
            line_item("85.50", "broken.pdf"),
            line_item("60.00", "fine.pdf"),
        ];
        let results = validator.validate_report(report, &items).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, ValidationStatus::Error);
        assert!(results[0].discrepancies.is_empty());
        assert!(results[0].extracted.is_none());
        // The sibling item is unaffected.
        assert_eq!(results[1].status, ValidationStatus::Validated);
        Ok(())
    }

    #[tokio::test]
    async fn resolved_items_are_never_re_extracted() -> Result<(), TestError> {
        let provider = Arc::new(ScriptedExtraction::new());
        provider.script("a.pdf", Ok(receipt("85.50", 11)));
        let validator = ReceiptValidator::new(provider.clone());
        let report = Uuid::new_v4();
        let item = line_item("85.50", "a.pdf");

        let first = validator.validate_item(report, &item).await;
        let second = validator.validate_item(report, &item).await;

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);

        // A different report is a different validation run.
        validator.validate_item(Uuid::new_v4(), &item).await;
        assert_eq!(provider.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn slow_providers_degrade_to_error() -> Result<(), TestError> {
        let provider = Arc::new(ScriptedExtraction::new());
        provider.script("slow.pdf", Ok(receipt("85.50", 11)));
        provider.delay("slow.pdf", Duration::from_millis(200));
        let validator =
            ReceiptValidator::with_timeout(provider, Duration::from_millis(20));

        let result = validator
            .validate_item(Uuid::new_v4(), &line_item("85.50", "slow.pdf"))
            .await;

        assert_eq!(result.status, ValidationStatus::Error);
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_reports_unresolved_items_as_processing() -> Result<(), TestError> {
        let provider = Arc::new(ScriptedExtraction::new());
        provider.script("a.pdf", Ok(receipt("85.50", 11)));
        let validator = ReceiptValidator::new(provider);
        let report = Uuid::new_v4();
        let resolved = line_item("85.50", "a.pdf");
        let untouched = line_item("60.00", "b.pdf");

        validator.validate_item(report, &resolved).await;
        let snapshot = validator
            .snapshot(report, &[resolved.clone(), untouched.clone()])
            .await;

        assert_eq!(snapshot[0].status, ValidationStatus::Validated);
        assert_eq!(snapshot[1].status, ValidationStatus::Processing);
        assert_eq!(snapshot[1].item_id, untouched.id);
        Ok(())
    }
}
