use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AcademicYearId, BookId, Collection, PaymentId, StudentId, WriteOperation};

/// all events that can be emitted by the fee desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // student events
    StudentRegistered {
        student_id: StudentId,
        class: String,
        timestamp: DateTime<Utc>,
    },
    StudentUpdated {
        student_id: StudentId,
        timestamp: DateTime<Utc>,
    },
    StudentDeleted {
        student_id: StudentId,
        payments_removed: usize,
        timestamp: DateTime<Utc>,
    },
    StudentsPromoted {
        promoted: usize,
        graduated: usize,
        timestamp: DateTime<Utc>,
    },

    // book events
    BookAdded {
        book_id: BookId,
        class: String,
        price: Money,
        timestamp: DateTime<Utc>,
    },
    BookUpdated {
        book_id: BookId,
        timestamp: DateTime<Utc>,
    },
    BookDeleted {
        book_id: BookId,
        payments_removed: usize,
        timestamp: DateTime<Utc>,
    },

    AcademicYearAdded {
        academic_year_id: AcademicYearId,
        year: String,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRecorded {
        student_id: StudentId,
        academic_year_id: AcademicYearId,
        payment_ids: Vec<PaymentId>,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentRejected {
        student_id: StudentId,
        amount: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    StoreWriteFailed {
        collection: Collection,
        operation: WriteOperation,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
