use serde::{Deserialize, Serialize};

use crate::classes::ClassSequence;
use crate::errors::{FeeError, Result};

/// school-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolConfig {
    pub school_name: String,
    pub currency_code: String,
    pub class_sequence: ClassSequence,
    pub limits: FieldLimits,
}

/// minimum field lengths enforced on admin input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLimits {
    pub min_student_name_len: usize,
    pub min_parent_name_len: usize,
    pub min_parent_phone_len: usize,
    pub min_book_title_len: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            min_student_name_len: 2,
            min_parent_name_len: 2,
            min_parent_phone_len: 10,
            min_book_title_len: 2,
        }
    }
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            school_name: "School".to_string(),
            currency_code: "GHS".to_string(),
            class_sequence: ClassSequence::standard(),
            limits: FieldLimits::default(),
        }
    }
}

impl SchoolConfig {
    /// default configuration over a custom class sequence
    pub fn with_classes(class_sequence: ClassSequence) -> Self {
        Self {
            class_sequence,
            ..Self::default()
        }
    }

    pub fn named(mut self, school_name: &str) -> Self {
        self.school_name = school_name.to_string();
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SchoolConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.currency_code.trim().is_empty() {
            return Err(FeeError::InvalidConfiguration {
                message: "currency code is blank".to_string(),
            });
        }
        self.class_sequence.validate()
    }
}
