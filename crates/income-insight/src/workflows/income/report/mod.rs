mod summary;
pub mod views;

pub use summary::Report;
pub use views::{LegacyReportView, ReportView, ReportViewKind};
