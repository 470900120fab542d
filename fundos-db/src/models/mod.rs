pub mod expense_report;
pub mod history;
pub mod identifiable;
pub mod message;
pub mod reimbursement;
pub mod request;
pub mod workflow_entity;

// Re-exports
pub use expense_report::*;
pub use history::*;
pub use identifiable::*;
pub use message::*;
pub use reimbursement::*;
pub use request::*;
pub use workflow_entity::*;
