use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::classes::ClassSequence;
use crate::errors::{FeeError, Result};
use crate::records::{Student, StudentPatch};
use crate::types::{StudentId, StudentStatus};

/// where a student ends up after promotion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NextState {
    Promote { next_class: String },
    Graduate,
}

/// next state for one student, independent of payment state
///
/// The last class graduates; every other class in the sequence advances one
/// step. A class outside the sequence is an error.
pub fn plan_promotion(student: &Student, sequence: &ClassSequence) -> Result<NextState> {
    if !sequence.contains(&student.class) {
        return Err(FeeError::UnknownClass {
            class: student.class.clone(),
        });
    }

    Ok(match sequence.next_after(&student.class) {
        Some(next) => NextState::Promote {
            next_class: next.to_string(),
        },
        None => NextState::Graduate,
    })
}

/// planned move for one student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionMove {
    pub student_id: StudentId,
    pub from_class: String,
    pub next: NextState,
}

impl PromotionMove {
    /// graduation only flips the status; the class is left as is
    pub fn to_patch(&self) -> StudentPatch {
        match &self.next {
            NextState::Promote { next_class } => StudentPatch::new(&self.student_id).class(next_class),
            NextState::Graduate => StudentPatch::new(&self.student_id).status(StudentStatus::Graduated),
        }
    }
}

/// moves for every selected student, committed together
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromotionPlan {
    pub moves: Vec<PromotionMove>,
}

impl PromotionPlan {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn promoted_count(&self) -> usize {
        self.moves
            .iter()
            .filter(|m| matches!(m.next, NextState::Promote { .. }))
            .count()
    }

    pub fn graduated_count(&self) -> usize {
        self.moves
            .iter()
            .filter(|m| m.next == NextState::Graduate)
            .count()
    }

    pub fn to_patches(&self) -> Vec<StudentPatch> {
        self.moves.iter().map(PromotionMove::to_patch).collect()
    }
}

/// plan moves for the selected students
///
/// Selected ids that do not exist or are already graduated are skipped.
/// Unselected students are untouched.
pub fn plan_batch(
    students: &[Student],
    selected: &[StudentId],
    sequence: &ClassSequence,
) -> Result<PromotionPlan> {
    let mut moves = Vec::with_capacity(selected.len());
    let mut planned = HashSet::new();

    for student_id in selected {
        if !planned.insert(student_id.as_str()) {
            continue;
        }

        let Some(student) = students.iter().find(|s| &s.student_id == student_id) else {
            warn!(student_id = %student_id, "selected student not found, skipping");
            continue;
        };
        if !student.is_active() {
            warn!(student_id = %student_id, "selected student already graduated, skipping");
            continue;
        }

        moves.push(PromotionMove {
            student_id: student.student_id.clone(),
            from_class: student.class.clone(),
            next: plan_promotion(student, sequence)?,
        });
    }

    Ok(PromotionPlan { moves })
}

/// every active student, which is what the admin starts with selected
pub fn default_selection(students: &[Student]) -> Vec<StudentId> {
    students
        .iter()
        .filter(|s| s.is_active())
        .map(|s| s.student_id.clone())
        .collect()
}

/// counts shown before the admin confirms a promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromotionPreview {
    pub to_promote: usize,
    pub to_graduate: usize,
    pub to_stay: usize,
}

impl PromotionPreview {
    pub fn build(
        students: &[Student],
        selected: &[StudentId],
        sequence: &ClassSequence,
    ) -> Result<Self> {
        let plan = plan_batch(students, selected, sequence)?;
        let active = students.iter().filter(|s| s.is_active()).count();
        Ok(Self {
            to_promote: plan.promoted_count(),
            to_graduate: plan.graduated_count(),
            to_stay: active.saturating_sub(plan.moves.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::fixtures::student;

    fn graduated(id: &str, class: &str) -> Student {
        let mut s = student(id, class);
        s.status = StudentStatus::Graduated;
        s
    }

    #[test]
    fn test_mid_sequence_student_advances() {
        let seq = ClassSequence::standard();
        let next = plan_promotion(&student("S1", "Prim2"), &seq).unwrap();
        assert_eq!(
            next,
            NextState::Promote {
                next_class: "Prim3".to_string()
            }
        );
    }

    #[test]
    fn test_category_boundary_advances() {
        let seq = ClassSequence::standard();
        let next = plan_promotion(&student("S1", "KG2"), &seq).unwrap();
        assert_eq!(
            next,
            NextState::Promote {
                next_class: "Prim1".to_string()
            }
        );
    }

    #[test]
    fn test_last_class_graduates_and_keeps_class() {
        let seq = ClassSequence::standard();
        let s = student("S1", "JHS3");
        assert_eq!(plan_promotion(&s, &seq).unwrap(), NextState::Graduate);

        let plan = plan_batch(&[s.clone()], &["S1".to_string()], &seq).unwrap();
        let patch = &plan.to_patches()[0];
        assert_eq!(patch.class, None);
        assert_eq!(patch.status, Some(StudentStatus::Graduated));

        let mut applied = s;
        patch.apply(&mut applied);
        assert_eq!(applied.class, "JHS3");
        assert_eq!(applied.status, StudentStatus::Graduated);
    }

    #[test]
    fn test_promotion_is_total_over_sequence() {
        let seq = ClassSequence::standard();
        let last = seq.last().unwrap().to_string();
        for class in seq.classes() {
            let next = plan_promotion(&student("S", class), &seq).unwrap();
            assert_eq!(next == NextState::Graduate, class == last);
        }
    }

    #[test]
    fn test_unknown_class_is_rejected() {
        let seq = ClassSequence::standard();
        assert!(matches!(
            plan_promotion(&student("S1", "Form1"), &seq),
            Err(FeeError::UnknownClass { .. })
        ));
    }

    #[test]
    fn test_batch_skips_missing_and_graduated() {
        let seq = ClassSequence::standard();
        let students = vec![
            student("S1", "Prim1"),
            student("S2", "JHS3"),
            graduated("S3", "JHS3"),
            student("S4", "Prim4"),
        ];
        let selected = vec![
            "S1".to_string(),
            "S2".to_string(),
            "S3".to_string(),
            "S1".to_string(),
            "S9".to_string(),
        ];
        let plan = plan_batch(&students, &selected, &seq).unwrap();
        assert_eq!(plan.moves.len(), 2);
        assert_eq!(plan.promoted_count(), 1);
        assert_eq!(plan.graduated_count(), 1);
    }

    #[test]
    fn test_preview_counts() {
        let seq = ClassSequence::standard();
        let students = vec![
            student("S1", "Prim1"),
            student("S2", "JHS3"),
            student("S3", "Prim5"),
            graduated("S4", "JHS3"),
        ];
        assert_eq!(default_selection(&students).len(), 3);

        let preview =
            PromotionPreview::build(&students, &["S1".to_string(), "S2".to_string()], &seq).unwrap();
        assert_eq!(preview.to_promote, 1);
        assert_eq!(preview.to_graduate, 1);
        assert_eq!(preview.to_stay, 1);
    }
}
