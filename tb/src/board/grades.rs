//! Assessments and their results

use burststore::{Store, now_ms};
use eyre::{Result, eyre};
use tracing::{debug, info};

use super::collection::Collection;
use crate::domain::{Assessment, AssessmentType};

/// Assessments with their types
pub struct Gradebook {
    assessments: Collection<Assessment>,
    types: Collection<AssessmentType>,
}

impl Gradebook {
    pub fn new(store: Store) -> Self {
        Self {
            assessments: Collection::new(store.clone()),
            types: Collection::new(store),
        }
    }

    pub fn assessments(&self) -> &Collection<Assessment> {
        &self.assessments
    }

    pub fn types(&self) -> &Collection<AssessmentType> {
        &self.types
    }

    pub fn add(&self, assessment: Assessment) -> Result<Assessment> {
        debug!(title = %assessment.title, "Gradebook::add: called");
        if let Some(type_id) = &assessment.assessment_type_id
            && self.types.get(type_id)?.is_none()
        {
            return Err(eyre!("Assessment type not found: {}", type_id));
        }
        self.assessments.insert(assessment.clone())?;
        Ok(assessment)
    }

    pub fn add_type(&self, name: &str) -> Result<AssessmentType> {
        let kind = AssessmentType::new(name);
        self.types.insert(kind.clone())?;
        Ok(kind)
    }

    /// Record a result; `out_of` replaces the stored maximum when given
    pub fn grade(&self, id: &str, score: f64, out_of: Option<f64>) -> Result<Assessment> {
        debug!(%id, score, ?out_of, "Gradebook::grade: called");
        let current = self
            .assessments
            .get(id)?
            .ok_or_else(|| eyre!("Assessment not found: {}", id))?;
        let max = out_of
            .or(current.max_score)
            .ok_or_else(|| eyre!("'{}' has no maximum score; pass --out-of", current.title))?;
        if max <= 0.0 || score < 0.0 {
            return Err(eyre!("Score must be at least 0 and the maximum above 0"));
        }

        self.assessments
            .update(id, |a| {
                a.score = Some(score);
                a.max_score = Some(max);
            })?
            .ok_or_else(|| eyre!("Assessment not found: {}", id))
    }

    /// Soft-delete: stamp deletedAt
    pub fn delete(&self, id: &str) -> Result<Assessment> {
        let now = now_ms();
        let deleted = self
            .assessments
            .update(id, |a| a.deleted_at = Some(now))?
            .ok_or_else(|| eyre!("Assessment not found: {}", id))?;
        info!(%id, "Deleted assessment");
        Ok(deleted)
    }

    /// Live assessments, by due date (undated last) then creation
    pub fn list(&self, subject: Option<&str>) -> Result<Vec<Assessment>> {
        let mut items: Vec<Assessment> = self
            .assessments
            .all()?
            .into_iter()
            .filter(|a| a.deleted_at.is_none())
            .filter(|a| subject.is_none_or(|s| a.subject.as_deref() == Some(s)))
            .collect();
        items.sort_by_key(|a| (a.due.is_none(), a.due, a.created_at));
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::weighted_average;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Gradebook) {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        (temp, Gradebook::new(store))
    }

    #[test]
    fn test_grade_uses_stored_maximum() {
        let (_temp, book) = setup();
        let mut essay = Assessment::new("Essay");
        essay.max_score = Some(40.0);
        let essay = book.add(essay).unwrap();

        let graded = book.grade(&essay.id, 30.0, None).unwrap();
        assert_eq!(graded.percentage(), Some(75.0));

        let regraded = book.grade(&essay.id, 9.0, Some(10.0)).unwrap();
        assert_eq!(regraded.max_score, Some(10.0));
    }

    #[test]
    fn test_grade_needs_a_maximum() {
        let (_temp, book) = setup();
        let quiz = book.add(Assessment::new("Quiz")).unwrap();
        assert!(book.grade(&quiz.id, 5.0, None).is_err());
        assert!(book.grade(&quiz.id, 5.0, Some(0.0)).is_err());
        assert!(book.grade("missing", 5.0, Some(10.0)).is_err());
    }

    #[test]
    fn test_add_checks_type() {
        let (_temp, book) = setup();
        let mut exam = Assessment::new("Final");
        exam.assessment_type_id = Some("nope".into());
        assert!(book.add(exam.clone()).is_err());

        let kind = book.add_type("Exam").unwrap();
        exam.assessment_type_id = Some(kind.id);
        assert!(book.add(exam).is_ok());
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let (_temp, book) = setup();
        let mut late = Assessment::new("late");
        late.subject = Some("Maths".into());
        late.due = NaiveDate::from_ymd_opt(2026, 6, 1);
        let mut early = Assessment::new("early");
        early.subject = Some("Maths".into());
        early.due = NaiveDate::from_ymd_opt(2026, 3, 1);
        let mut undated = Assessment::new("undated");
        undated.subject = Some("Maths".into());
        let mut other = Assessment::new("other");
        other.subject = Some("Art".into());
        for a in [undated, late, other, early] {
            book.add(a).unwrap();
        }

        let titles: Vec<String> = book.list(Some("Maths")).unwrap().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["early", "late", "undated"]);
        assert_eq!(book.list(None).unwrap().len(), 4);
    }

    #[test]
    fn test_deleted_leaves_average() {
        let (_temp, book) = setup();
        let mut a = Assessment::new("a");
        a.max_score = Some(100.0);
        let mut b = a.clone();
        b.id = "b".into();
        let a = book.add(a).unwrap();
        let b = book.add(b).unwrap();
        book.grade(&a.id, 90.0, None).unwrap();
        book.grade(&b.id, 10.0, None).unwrap();

        book.delete(&b.id).unwrap();
        let live = book.list(None).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(weighted_average(&live), Some(90.0));
        assert!(book.assessments().get(&b.id).unwrap().unwrap().deleted_at.is_some());
    }
}
