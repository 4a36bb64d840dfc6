use tracing::{error, info, warn};

use crate::balance::{outstanding_among, outstanding_books};
use crate::config::SchoolConfig;
use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::events::{Event, EventStore};
use crate::payments::{
    PaymentContext, PaymentOutcome, PaymentReceipt, PaymentRequest, ReceiptLine,
};
use crate::profile::{build_profiles, StudentFinancialProfile};
use crate::promotion::{plan_batch, PromotionPlan, PromotionPreview};
use crate::records::{
    validate_book, validate_student, AcademicYear, Book, NewBook, NewStudent, Payment, Student,
    StudentPatch,
};
use crate::store::{DocumentStore, WriteBatch};
use crate::types::{AcademicYearId, PaymentMethod, StudentId};
use crate::view::DashboardView;

/// admin and parent operations over a document store
pub struct FeeDesk<S: DocumentStore> {
    pub config: SchoolConfig,
    store: S,
    pub events: EventStore,
}

impl<S: DocumentStore> FeeDesk<S> {
    pub fn new(config: SchoolConfig, store: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            events: EventStore::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// register a new student
    pub fn register_student(&mut self, draft: NewStudent) -> Result<Student> {
        let draft = draft.normalized();
        draft.validate(&self.config)?;

        if self.store.get_student(&draft.student_id)?.is_some() {
            warn!(student_id = %draft.student_id, "student id already taken");
            return Err(FeeError::DuplicateStudentId {
                student_id: draft.student_id,
            });
        }
        let key = draft.identity_key();
        if self.store.list_students()?.iter().any(|s| s.identity_key() == key) {
            warn!(student_id = %draft.student_id, "student already registered under another id");
            return Err(FeeError::DuplicateStudent {
                name: draft.student_name,
            });
        }

        let student = draft.into_student();
        let written = self.store.create_student(student.clone());
        self.observe(written)?;

        info!(student_id = %student.student_id, class = %student.class, "student registered");
        self.events.emit(Event::StudentRegistered {
            student_id: student.student_id.clone(),
            class: student.class.clone(),
            timestamp: self.store.now(),
        });
        Ok(student)
    }

    /// merge an edit into an existing student
    pub fn update_student(&mut self, mut patch: StudentPatch) -> Result<Student> {
        let current = self.find_student(&patch.student_id)?;
        patch.student_id = current.student_id.clone();
        let candidate = patch.applied_to(&current);
        validate_student(&candidate, &self.config)?;

        let key = candidate.identity_key();
        let clash = self
            .store
            .list_students()?
            .into_iter()
            .any(|s| s.student_id != candidate.student_id && s.identity_key() == key);
        if clash {
            return Err(FeeError::DuplicateStudent {
                name: candidate.student_name,
            });
        }

        let written = self.store.update_student(patch);
        let updated = self.observe(written)?;

        info!(student_id = %updated.student_id, "student updated");
        self.events.emit(Event::StudentUpdated {
            student_id: updated.student_id.clone(),
            timestamp: self.store.now(),
        });
        Ok(updated)
    }

    /// delete a student together with all of their payments
    pub fn delete_student(&mut self, student_id: &str) -> Result<usize> {
        self.find_student(student_id)?;

        let payments = self.store.payments_for_student(student_id)?;
        let mut batch = WriteBatch::new();
        for payment in &payments {
            batch.delete_payment(&payment.payment_id);
        }
        batch.delete_student(student_id);

        let written = self.store.commit(batch);
        self.observe(written)?;

        info!(student_id = %student_id, payments_removed = payments.len(), "student deleted");
        self.events.emit(Event::StudentDeleted {
            student_id: student_id.to_string(),
            payments_removed: payments.len(),
            timestamp: self.store.now(),
        });
        Ok(payments.len())
    }

    pub fn find_student(&self, student_id: &str) -> Result<Student> {
        self.store
            .get_student(student_id.trim())?
            .ok_or_else(|| FeeError::StudentNotFound {
                student_id: student_id.trim().to_string(),
            })
    }

    /// add a book with a time-based id
    pub fn add_book(&mut self, draft: NewBook) -> Result<Book> {
        let draft = draft.normalized();
        draft.validate(&self.config)?;
        self.ensure_unique_book(&draft.book_title, &draft.class, None)?;

        let book_id = self.next_id("B", |store, id| Ok(store.get_book(id)?.is_some()))?;
        let book = draft.into_book(book_id);
        let written = self.store.create_book(book.clone());
        self.observe(written)?;

        info!(book_id = %book.book_id, class = %book.class, price = %book.price, "book added");
        self.events.emit(Event::BookAdded {
            book_id: book.book_id.clone(),
            class: book.class.clone(),
            price: book.price,
            timestamp: self.store.now(),
        });
        Ok(book)
    }

    pub fn update_book(&mut self, book: Book) -> Result<Book> {
        let book = Book {
            book_title: book.book_title.trim().to_string(),
            class: book.class.trim().to_string(),
            ..book
        };
        if self.store.get_book(&book.book_id)?.is_none() {
            return Err(FeeError::BookNotFound {
                book_id: book.book_id,
            });
        }
        validate_book(&book, &self.config)?;
        self.ensure_unique_book(&book.book_title, &book.class, Some(&book.book_id))?;

        let written = self.store.update_book(book.clone());
        self.observe(written)?;

        info!(book_id = %book.book_id, "book updated");
        self.events.emit(Event::BookUpdated {
            book_id: book.book_id.clone(),
            timestamp: self.store.now(),
        });
        Ok(book)
    }

    /// delete a book together with every payment made against it
    pub fn delete_book(&mut self, book_id: &str) -> Result<usize> {
        if self.store.get_book(book_id)?.is_none() {
            return Err(FeeError::BookNotFound {
                book_id: book_id.to_string(),
            });
        }

        let payments = self.store.payments_for_book(book_id)?;
        let mut batch = WriteBatch::new();
        for payment in &payments {
            batch.delete_payment(&payment.payment_id);
        }
        batch.delete_book(book_id);

        let written = self.store.commit(batch);
        self.observe(written)?;

        info!(book_id = %book_id, payments_removed = payments.len(), "book deleted");
        self.events.emit(Event::BookDeleted {
            book_id: book_id.to_string(),
            payments_removed: payments.len(),
            timestamp: self.store.now(),
        });
        Ok(payments.len())
    }

    pub fn add_academic_year(&mut self, year: &str) -> Result<AcademicYear> {
        let year = year.trim();
        AcademicYear::validate_label(year)?;

        let academic_year_id =
            self.next_id("AY", |store, id| Ok(store.get_academic_year(id)?.is_some()))?;
        let record = AcademicYear {
            academic_year_id,
            year: year.to_string(),
        };
        let written = self.store.create_academic_year(record.clone());
        self.observe(written)?;

        info!(academic_year_id = %record.academic_year_id, year = %record.year, "academic year added");
        self.events.emit(Event::AcademicYearAdded {
            academic_year_id: record.academic_year_id.clone(),
            year: record.year.clone(),
            timestamp: self.store.now(),
        });
        Ok(record)
    }

    /// the newest academic year, if any exist
    pub fn current_academic_year(&self) -> Result<Option<AcademicYear>> {
        Ok(self.store.list_academic_years()?.into_iter().next())
    }

    /// everything the student still owes, for the parent pay page
    pub fn outstanding_for_student(&self, student_id: &str) -> Result<PaymentContext> {
        let student = self.find_student(student_id)?;
        let books = self.store.list_books()?;
        let payments = self.store.payments_for_student(&student.student_id)?;
        Ok(PaymentContext::new(
            &student.student_id,
            outstanding_books(&student, &books, &payments),
        ))
    }

    /// admin payment against a chosen set of books
    pub fn record_payment(&mut self, request: PaymentRequest) -> Result<PaymentOutcome> {
        let academic_year_id = request
            .academic_year_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(FeeError::NoAcademicYear)?
            .to_string();
        if self.store.get_academic_year(&academic_year_id)?.is_none() {
            return Err(FeeError::AcademicYearNotFound { academic_year_id });
        }

        let student = self.find_student(&request.student_id)?;
        if request.book_ids.is_empty() {
            return self.reject(&student.student_id, request.amount, FeeError::NoBooksSelected);
        }

        let mut selected = Vec::with_capacity(request.book_ids.len());
        for book_id in &request.book_ids {
            let book = self.store.get_book(book_id)?.ok_or_else(|| FeeError::BookNotFound {
                book_id: book_id.clone(),
            })?;
            if !selected.iter().any(|b: &Book| b.book_id == book.book_id) {
                selected.push(book);
            }
        }

        let payments = self.store.payments_for_student(&student.student_id)?;
        let context = PaymentContext::new(
            &student.student_id,
            outstanding_among(&student.student_id, &selected, &payments),
        );

        self.settle(&student, &academic_year_id, request.method, &context, request.amount)
    }

    /// parent self-service payment, spread over everything the student owes
    ///
    /// Tagged with the newest academic year and recorded as cash.
    pub fn record_parent_payment(&mut self, student_id: &str, amount: Money) -> Result<PaymentOutcome> {
        let year = self.current_academic_year()?.ok_or(FeeError::NoAcademicYear)?;
        let student = self.find_student(student_id)?;
        let context = self.outstanding_for_student(&student.student_id)?;

        self.settle(
            &student,
            &year.academic_year_id,
            PaymentMethod::Cash,
            &context,
            amount,
        )
    }

    /// payments of one student, newest first
    pub fn payment_history(&self, student_id: &str) -> Result<Vec<Payment>> {
        let student = self.find_student(student_id)?;
        self.store.payments_for_student(&student.student_id)
    }

    /// receipt for a past payment showing the balance it left behind
    pub fn receipt_for_payment(&self, payment_id: &str) -> Result<PaymentReceipt> {
        let payment = self
            .store
            .get_payment(payment_id)?
            .ok_or_else(|| FeeError::PaymentNotFound {
                payment_id: payment_id.to_string(),
            })?;
        let student = self.find_student(&payment.student_id)?;
        let book = self
            .store
            .get_book(&payment.book_id)?
            .ok_or_else(|| FeeError::BookNotFound {
                book_id: payment.book_id.clone(),
            })?;
        let history = self.store.payments_for_student(&student.student_id)?;

        PaymentReceipt::for_past_payment(&student, &book, &payment, &history)
    }

    pub fn delete_payment(&mut self, payment_id: &str) -> Result<()> {
        let written = self.store.delete_payment(payment_id);
        self.observe(written)?;
        info!(payment_id = %payment_id, "payment deleted");
        Ok(())
    }

    pub fn preview_promotion(&self, selected: &[StudentId]) -> Result<PromotionPreview> {
        let students = self.store.list_students()?;
        PromotionPreview::build(&students, selected, &self.config.class_sequence)
    }

    /// promote or graduate the selected students in one batch
    pub fn promote_students(&mut self, selected: &[StudentId]) -> Result<PromotionPlan> {
        let students = self.store.list_students()?;
        let plan = plan_batch(&students, selected, &self.config.class_sequence)?;
        if plan.is_empty() {
            return Ok(plan);
        }

        let mut batch = WriteBatch::new();
        for patch in plan.to_patches() {
            batch.update_student(patch);
        }
        let written = self.store.commit(batch);
        self.observe(written)?;

        info!(
            promoted = plan.promoted_count(),
            graduated = plan.graduated_count(),
            "students promoted"
        );
        self.events.emit(Event::StudentsPromoted {
            promoted: plan.promoted_count(),
            graduated: plan.graduated_count(),
            timestamp: self.store.now(),
        });
        Ok(plan)
    }

    /// profiles of active students for the given year
    pub fn profiles(&self, academic_year_id: Option<&str>) -> Result<Vec<StudentFinancialProfile>> {
        let snapshot = self.store.snapshot()?;
        Ok(build_profiles(
            &snapshot.students,
            &snapshot.books,
            &snapshot.payments,
            academic_year_id,
            &self.config.class_sequence,
        ))
    }

    /// dashboard for the given year, or the newest year when `None`
    pub fn dashboard(&self, academic_year_id: Option<&str>) -> Result<DashboardView> {
        let snapshot = self.store.snapshot()?;
        Ok(DashboardView::derive(
            &snapshot,
            academic_year_id,
            &self.config.class_sequence,
        ))
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn settle(
        &mut self,
        student: &Student,
        academic_year_id: &AcademicYearId,
        method: PaymentMethod,
        context: &PaymentContext,
        amount: Money,
    ) -> Result<PaymentOutcome> {
        if let Err(e) = context.validate_amount(amount) {
            return self.reject(&student.student_id, amount, e);
        }
        if context.is_settled() {
            info!(student_id = %student.student_id, "selected books already settled");
            return Ok(PaymentOutcome::NothingToRecord);
        }
        let allocation = match context.allocate(amount) {
            Ok(allocation) => allocation,
            Err(e) => return self.reject(&student.student_id, amount, e),
        };
        if allocation.is_empty() {
            return Ok(PaymentOutcome::NothingToRecord);
        }

        let mut batch = WriteBatch::new();
        for draft in allocation.to_drafts(&student.student_id, academic_year_id, method) {
            batch.create_payment(draft);
        }
        let written = self.store.commit(batch);
        let payment_ids = self.observe(written)?;

        let mut lines = Vec::with_capacity(payment_ids.len());
        for (payment_id, line) in payment_ids.iter().zip(&allocation.lines) {
            let payment = self
                .store
                .get_payment(payment_id)?
                .ok_or_else(|| FeeError::PaymentNotFound {
                    payment_id: payment_id.clone(),
                })?;
            lines.push(ReceiptLine {
                payment,
                book_title: line.book_title.clone(),
                balance_after: line.balance_after,
            });
        }

        let receipt = PaymentReceipt::new(
            student,
            academic_year_id.clone(),
            method,
            self.store.now(),
            lines,
        );

        info!(
            student_id = %student.student_id,
            amount = %receipt.total_paid,
            books = receipt.lines.len(),
            "payment recorded"
        );
        self.events.emit(Event::PaymentRecorded {
            student_id: student.student_id.clone(),
            academic_year_id: academic_year_id.clone(),
            payment_ids,
            amount: receipt.total_paid,
            timestamp: receipt.issued_at,
        });
        Ok(PaymentOutcome::Recorded(receipt))
    }

    fn reject<T>(&mut self, student_id: &str, amount: Money, err: FeeError) -> Result<T> {
        warn!(student_id = %student_id, amount = %amount, error = %err, "payment rejected");
        self.events.emit(Event::PaymentRejected {
            student_id: student_id.to_string(),
            amount,
            reason: err.to_string(),
            timestamp: self.store.now(),
        });
        Err(err)
    }

    fn ensure_unique_book(&self, title: &str, class: &str, except: Option<&str>) -> Result<()> {
        let clash = self
            .store
            .list_books()?
            .iter()
            .any(|b| Some(b.book_id.as_str()) != except && b.same_title_and_class(title, class));
        if clash {
            warn!(title = %title, class = %class, "book already exists");
            return Err(FeeError::DuplicateBook {
                title: title.to_string(),
                class: class.to_string(),
            });
        }
        Ok(())
    }

    /// `{prefix}{millis}` from the store clock, bumped until unused
    fn next_id(&self, prefix: &str, taken: impl Fn(&S, &str) -> Result<bool>) -> Result<String> {
        let mut millis = self.store.now().timestamp_millis();
        loop {
            let id = format!("{}{}", prefix, millis);
            if !taken(&self.store, &id)? {
                return Ok(id);
            }
            millis += 1;
        }
    }

    /// record store write failures before handing them back
    fn observe<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(FeeError::StoreWrite {
            collection,
            operation,
            message,
        }) = &result
        {
            error!(%collection, %operation, %message, "store write failed");
            self.events.emit(Event::StoreWriteFailed {
                collection: *collection,
                operation: *operation,
                message: message.clone(),
                timestamp: self.store.now(),
            });
        }
        result
    }
}
