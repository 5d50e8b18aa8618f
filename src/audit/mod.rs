pub mod audit;
pub mod checks;
pub mod report;

pub use audit::{Audit, AuditResult, CheckId, Finding};
pub use checks::{CodeownersStatus, ProtectionRules, ProtectionStatus, RepoAudit, Toggle};
pub use report::AuditReport;
