pub mod balance;
pub mod classes;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod payments;
pub mod profile;
pub mod promotion;
pub mod records;
pub mod report;
pub mod school;
pub mod store;
pub mod types;
pub mod view;

// re-export key types
pub use balance::{compute_balance, outstanding_books, BookBalance, OutstandingBook};
pub use classes::{ClassCategory, ClassSequence};
pub use config::{FieldLimits, SchoolConfig};
pub use decimal::Money;
pub use errors::{FeeError, Result};
pub use events::{Event, EventStore};
pub use payments::{
    allocate, Allocation, AllocationLine, PaymentContext, PaymentOutcome, PaymentReceipt,
    PaymentRequest, ReceiptLine,
};
pub use profile::{
    build_profile, build_profiles, ProfileBook, ProfileFilter, ProfileSummary,
    StudentFinancialProfile,
};
pub use promotion::{plan_batch, plan_promotion, NextState, PromotionPlan, PromotionPreview};
pub use records::{
    AcademicYear, Book, NewBook, NewStudent, Payment, PaymentDraft, Student, StudentPatch,
};
pub use report::{build_totals, AggregateTotals};
pub use school::FeeDesk;
pub use store::{BatchOp, DocumentStore, InMemoryStore, Snapshot, WriteBatch};
pub use types::{
    AcademicYearId, BookId, Collection, PaymentId, PaymentMethod, PaymentStatus, StudentId,
    StudentStatus, WriteOperation,
};
pub use view::{DashboardView, ViewPublisher};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
