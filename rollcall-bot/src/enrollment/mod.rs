//! Enrollment engine and permission reconciliation

pub mod engine;
pub mod reconciler;

pub use engine::{CourseListError, EnrollmentEngine, EnrollmentStatus};
pub use reconciler::{ReconcileOutcome, ReconcileSummary, Reconciler};
