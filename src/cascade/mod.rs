pub mod batch;
pub mod janitor;
pub mod manager;
pub mod models;
pub mod plan;
pub mod run;
pub mod student;
pub mod sweep;
pub mod teacher;


pub use batch::{delete_batch, unwind_batch};
pub use janitor::BlobJanitor;
pub use manager::CascadeManager;
pub use models::{
    BlobOutcome, CascadeError, CascadeReport, CascadeWarning, ChildCounts, DeletionPlan,
    FailureKind, SweepStats,
};
pub use plan::plan_teacher_deletion;
pub use run::{CascadeOptions, CascadeRun};
pub use student::delete_student;
pub use sweep::sweep_orphans;
pub use teacher::delete_teacher;

#[cfg(test)]
mod tests;
