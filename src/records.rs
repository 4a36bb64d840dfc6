use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchoolConfig;
use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::types::{
    AcademicYearId, BookId, PaymentId, PaymentMethod, StudentId, StudentStatus,
};

/// enrolled student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: StudentId,
    pub student_name: String,
    pub class: String,
    pub parent_name: String,
    pub parent_phone: String,
    #[serde(default)]
    pub status: StudentStatus,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }

    /// (name, parent name, phone) used to detect the same child registered twice
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.student_name, &self.parent_name, &self.parent_phone)
    }
}

/// normalized identity of a student for duplicate detection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    name: String,
    parent_name: String,
    parent_phone: String,
}

impl IdentityKey {
    pub fn new(name: &str, parent_name: &str, parent_phone: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            parent_name: parent_name.trim().to_lowercase(),
            parent_phone: parent_phone.trim().to_string(),
        }
    }
}

/// book sold to a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub book_id: BookId,
    pub book_title: String,
    pub class: String,
    pub price: Money,
}

impl Book {
    /// true when `other` would collide on (title, class)
    pub fn same_title_and_class(&self, title: &str, class: &str) -> bool {
        self.class == class
            && self.book_title.trim().to_lowercase() == title.trim().to_lowercase()
    }
}

/// academic year label such as `2024/2025`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
    pub academic_year_id: AcademicYearId,
    pub year: String,
}

impl AcademicYear {
    /// check the `YYYY/YYYY` format
    pub fn validate_label(year: &str) -> Result<()> {
        let (start, end) = year.split_once('/').ok_or_else(|| FeeError::InvalidAcademicYear {
            year: year.to_string(),
        })?;

        let is_year = |s: &str| s.len() == 4 && s.chars().all(|c| c.is_ascii_digit());
        if !is_year(start) || !is_year(end) {
            return Err(FeeError::InvalidAcademicYear {
                year: year.to_string(),
            });
        }

        Ok(())
    }
}

/// recorded payment against one book for one student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: PaymentId,
    pub date: DateTime<Utc>,
    pub student_id: StudentId,
    pub book_id: BookId,
    pub academic_year_id: AcademicYearId,
    pub amount_paid: Money,
    pub method: PaymentMethod,
}

impl Payment {
    pub fn is_for(&self, student_id: &str, book_id: &str) -> bool {
        self.student_id == student_id && self.book_id == book_id
    }

    pub fn in_year(&self, academic_year_id: &str) -> bool {
        self.academic_year_id == academic_year_id
    }
}

/// payment fields supplied by the writer; the store assigns id and date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
    pub student_id: StudentId,
    pub book_id: BookId,
    pub academic_year_id: AcademicYearId,
    pub amount_paid: Money,
    pub method: PaymentMethod,
}

impl PaymentDraft {
    pub fn into_payment(self, payment_id: PaymentId, date: DateTime<Utc>) -> Payment {
        Payment {
            payment_id,
            date,
            student_id: self.student_id,
            book_id: self.book_id,
            academic_year_id: self.academic_year_id,
            amount_paid: self.amount_paid,
            method: self.method,
        }
    }
}

/// partial student update applied with merge semantics
///
/// `student_id` names the record and is never changed by a patch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub student_id: StudentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StudentStatus>,
}

impl StudentPatch {
    pub fn new(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            ..Self::default()
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    pub fn status(mut self, status: StudentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn apply(&self, student: &mut Student) {
        if let Some(name) = &self.student_name {
            student.student_name = name.trim().to_string();
        }
        if let Some(class) = &self.class {
            student.class = class.trim().to_string();
        }
        if let Some(parent_name) = &self.parent_name {
            student.parent_name = parent_name.trim().to_string();
        }
        if let Some(parent_phone) = &self.parent_phone {
            student.parent_phone = parent_phone.trim().to_string();
        }
        if let Some(status) = self.status {
            student.status = status;
        }
    }

    /// the student as it would look after the patch
    pub fn applied_to(&self, student: &Student) -> Student {
        let mut updated = student.clone();
        self.apply(&mut updated);
        updated
    }
}

/// admin input for registering a student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub student_id: StudentId,
    pub student_name: String,
    pub class: String,
    pub parent_name: String,
    pub parent_phone: String,
}

impl NewStudent {
    /// trim surrounding whitespace from every field
    pub fn normalized(self) -> Self {
        Self {
            student_id: self.student_id.trim().to_string(),
            student_name: self.student_name.trim().to_string(),
            class: self.class.trim().to_string(),
            parent_name: self.parent_name.trim().to_string(),
            parent_phone: self.parent_phone.trim().to_string(),
        }
    }

    pub fn validate(&self, config: &SchoolConfig) -> Result<()> {
        require_len("studentId", &self.student_id, 1)?;
        require_len("studentName", &self.student_name, config.limits.min_student_name_len)?;
        require_len("parentName", &self.parent_name, config.limits.min_parent_name_len)?;
        require_len("parentPhone", &self.parent_phone, config.limits.min_parent_phone_len)?;
        require_class(config, &self.class)
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.student_name, &self.parent_name, &self.parent_phone)
    }

    /// new students always start out active
    pub fn into_student(self) -> Student {
        Student {
            student_id: self.student_id,
            student_name: self.student_name,
            class: self.class,
            parent_name: self.parent_name,
            parent_phone: self.parent_phone,
            status: StudentStatus::Active,
        }
    }
}

/// admin input for registering a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub book_title: String,
    pub class: String,
    pub price: Money,
}

impl NewBook {
    pub fn normalized(self) -> Self {
        Self {
            book_title: self.book_title.trim().to_string(),
            class: self.class.trim().to_string(),
            price: self.price,
        }
    }

    pub fn validate(&self, config: &SchoolConfig) -> Result<()> {
        require_len("bookTitle", &self.book_title, config.limits.min_book_title_len)?;
        require_class(config, &self.class)?;
        require_price(self.price)
    }

    pub fn into_book(self, book_id: BookId) -> Book {
        Book {
            book_id,
            book_title: self.book_title,
            class: self.class,
            price: self.price,
        }
    }
}

/// validate an edited student against the same rules as registration
pub fn validate_student(student: &Student, config: &SchoolConfig) -> Result<()> {
    require_len("studentName", student.student_name.trim(), config.limits.min_student_name_len)?;
    require_len("parentName", student.parent_name.trim(), config.limits.min_parent_name_len)?;
    require_len("parentPhone", student.parent_phone.trim(), config.limits.min_parent_phone_len)?;
    require_class(config, &student.class)
}

/// validate an edited book against the same rules as registration
pub fn validate_book(book: &Book, config: &SchoolConfig) -> Result<()> {
    require_len("bookTitle", book.book_title.trim(), config.limits.min_book_title_len)?;
    require_class(config, &book.class)?;
    require_price(book.price)
}

fn require_len(field: &'static str, value: &str, min: usize) -> Result<()> {
    if value.chars().count() < min {
        return Err(FeeError::InvalidField {
            field,
            message: format!("must be at least {} characters", min),
        });
    }
    Ok(())
}

fn require_class(config: &SchoolConfig, class: &str) -> Result<()> {
    if !config.class_sequence.contains(class) {
        return Err(FeeError::UnknownClass {
            class: class.to_string(),
        });
    }
    Ok(())
}

fn require_price(price: Money) -> Result<()> {
    if price.is_negative() {
        return Err(FeeError::InvalidField {
            field: "price",
            message: format!("must not be negative, got {}", price),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewStudent {
        NewStudent {
            student_id: " S001 ".to_string(),
            student_name: " Ama Mensah ".to_string(),
            class: "Prim1".to_string(),
            parent_name: "Kofi Mensah".to_string(),
            parent_phone: "0244000000".to_string(),
        }
    }

    #[test]
    fn test_new_student_defaults_to_active() {
        let student = draft().normalized().into_student();
        assert_eq!(student.student_id, "S001");
        assert_eq!(student.student_name, "Ama Mensah");
        assert!(student.is_active());
    }

    #[test]
    fn test_student_validation() {
        let config = SchoolConfig::default();
        assert!(draft().normalized().validate(&config).is_ok());

        let mut short_phone = draft();
        short_phone.parent_phone = "024".to_string();
        assert!(matches!(
            short_phone.validate(&config),
            Err(FeeError::InvalidField { field: "parentPhone", .. })
        ));

        let mut bad_class = draft();
        bad_class.class = "Prim9".to_string();
        assert!(matches!(bad_class.validate(&config), Err(FeeError::UnknownClass { .. })));
    }

    #[test]
    fn test_identity_key_ignores_case_and_padding() {
        let student = draft().normalized().into_student();
        let other = IdentityKey::new("AMA MENSAH", " kofi mensah", "0244000000 ");
        assert_eq!(student.identity_key(), other);
    }

    #[test]
    fn test_book_validation() {
        let config = SchoolConfig::default();
        let book = NewBook {
            book_title: "English Reader".to_string(),
            class: "Prim2".to_string(),
            price: Money::from_major(45),
        };
        assert!(book.validate(&config).is_ok());

        let negative = NewBook {
            price: Money::from_major(-1),
            ..book.clone()
        };
        assert!(negative.validate(&config).is_err());

        let stored = book.into_book("B1".to_string());
        assert!(stored.same_title_and_class(" english reader ", "Prim2"));
        assert!(!stored.same_title_and_class("English Reader", "Prim3"));
    }

    #[test]
    fn test_academic_year_label() {
        assert!(AcademicYear::validate_label("2024/2025").is_ok());
        assert!(AcademicYear::validate_label("2024-2025").is_err());
        assert!(AcademicYear::validate_label("24/25").is_err());
        assert!(AcademicYear::validate_label("2024/2025/2026").is_err());
    }

    #[test]
    fn test_student_patch_merges() {
        let mut student = draft().normalized().into_student();
        let patch = StudentPatch::new(&student.student_id).class("Prim2");
        patch.apply(&mut student);
        assert_eq!(student.class, "Prim2");
        assert!(student.is_active());
    }

    #[test]
    fn test_store_field_names() {
        let student = draft().normalized().into_student();
        let json = serde_json::to_value(&student).unwrap();
        assert_eq!(json["studentId"], "S001");
        assert_eq!(json["class"], "Prim1");
        assert_eq!(json["status"], "Active");
    }
}
