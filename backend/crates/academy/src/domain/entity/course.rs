//! Course Entity

use chrono::{DateTime, Utc};
use kernel::id::{CourseId, LessonId};

use crate::domain::entity::lesson::Lesson;
use crate::domain::value_object::{localized_text::LocalizedText, money::Money};
use crate::error::{AcademyError, AcademyResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub course_id: CourseId,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub price: Money,
    pub original_price: Money,
    /// Percent off `original_price`, derived from the two prices
    pub discount: i32,
    pub published: bool,
    pub featured: bool,
    pub is_new_course: bool,
    pub new_until: Option<DateTime<Utc>>,
    pub lessons: Vec<Lesson>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upper bound for either course price, in minor units
pub const MAX_PRICE_MINOR: i64 = 1_000_000_000_000;

impl Course {
    /// `round((original - price) / original * 100)`, or 0 when there is no
    /// markdown.
    pub fn compute_discount(price: Money, original_price: Money) -> i32 {
        let (price, original) = (price.minor(), original_price.minor());
        if original <= 0 || price >= original {
            return 0;
        }
        let (price, original) = (i128::from(price), i128::from(original));
        let percent = ((original - price) * 200 + original) / (2 * original);
        percent.clamp(0, 100) as i32
    }

    /// Update both prices and recompute the discount
    pub fn set_prices(&mut self, price: Money, original_price: Money) -> AcademyResult<()> {
        if price.minor() < 0 || original_price.minor() < 0 {
            return Err(AcademyError::ValidationFailed(
                "prices must not be negative".into(),
            ));
        }
        if price.minor() > MAX_PRICE_MINOR || original_price.minor() > MAX_PRICE_MINOR {
            return Err(AcademyError::ValidationFailed(format!(
                "prices must not exceed {MAX_PRICE_MINOR}"
            )));
        }
        self.price = price;
        self.original_price = original_price;
        self.discount = Self::compute_discount(price, original_price);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// The "new" badge expires on its own once `new_until` passes
    pub fn is_still_new(&self, now: DateTime<Utc>) -> bool {
        self.is_new_course && self.new_until.is_some_and(|until| until > now)
    }

    pub fn find_lesson(&self, lesson_id: &LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|l| &l.lesson_id == lesson_id)
    }

    pub fn has_lesson(&self, lesson_id: &LessonId) -> bool {
        self.find_lesson(lesson_id).is_some()
    }

    /// Lessons in display order; ties keep their stored order
    pub fn ordered_lessons(&self) -> Vec<&Lesson> {
        let mut lessons: Vec<&Lesson> = self.lessons.iter().collect();
        lessons.sort_by_key(|l| l.order);
        lessons
    }

    /// Previous and next lesson ids by strictly increasing `order`.
    ///
    /// Lessons sharing the current lesson's order are neither previous nor
    /// next, so navigation can never loop.
    pub fn adjacent_lessons(&self, lesson_id: &LessonId) -> (Option<LessonId>, Option<LessonId>) {
        let Some(current) = self.find_lesson(lesson_id) else {
            return (None, None);
        };

        let previous = self
            .lessons
            .iter()
            .filter(|l| l.order < current.order)
            .max_by_key(|l| l.order)
            .map(|l| l.lesson_id);

        let next = self
            .lessons
            .iter()
            .filter(|l| l.order > current.order)
            .min_by_key(|l| l.order)
            .map(|l| l.lesson_id);

        (previous, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> Course {
        let now = Utc::now();
        Course {
            course_id: CourseId::new(),
            title: LocalizedText::new("Курс", "Course"),
            description: LocalizedText::new("О курсе", "About"),
            price: Money::from_minor(1000),
            original_price: Money::from_minor(1000),
            discount: 0,
            published: true,
            featured: false,
            is_new_course: false,
            new_until: None,
            lessons: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_compute_discount() {
        let discount = |price, original| {
            Course::compute_discount(Money::from_minor(price), Money::from_minor(original))
        };
        assert_eq!(discount(800, 1000), 20);
        assert_eq!(discount(1000, 1000), 0);
        assert_eq!(discount(1200, 1000), 0);
        assert_eq!(discount(500, 0), 0);
        // 1/3 off rounds to 33, 2/3 off rounds to 67
        assert_eq!(discount(2000, 3000), 33);
        assert_eq!(discount(1000, 3000), 67);
    }

    #[test]
    fn test_compute_discount_on_extreme_prices() {
        let discount = |price, original| {
            Course::compute_discount(Money::from_minor(price), Money::from_minor(original))
        };
        assert_eq!(discount(0, i64::MAX / 100), 100);
        assert_eq!(discount(0, i64::MAX), 100);
        assert_eq!(discount(i64::MAX / 2, i64::MAX), 50);
    }

    #[test]
    fn test_set_prices_rejects_out_of_range() {
        let mut course = course();

        let err = course
            .set_prices(Money::from_minor(-1), Money::from_minor(1000))
            .unwrap_err();
        assert!(matches!(err, AcademyError::ValidationFailed(_)));

        let err = course
            .set_prices(Money::from_minor(1000), Money::from_minor(MAX_PRICE_MINOR + 1))
            .unwrap_err();
        assert!(matches!(err, AcademyError::ValidationFailed(_)));

        let err = course
            .set_prices(Money::from_minor(i64::MAX / 50), Money::from_minor(i64::MAX / 50))
            .unwrap_err();
        assert!(matches!(err, AcademyError::ValidationFailed(_)));

        assert_eq!(course.price, Money::from_minor(1000));
        assert_eq!(course.discount, 0);
    }

    #[test]
    fn test_set_prices_at_cap() {
        let mut course = course();
        course
            .set_prices(Money::from_minor(MAX_PRICE_MINOR / 2), Money::from_minor(MAX_PRICE_MINOR))
            .unwrap();
        assert_eq!(course.discount, 50);
        assert_eq!(course.price.apply_discount(10).minor(), MAX_PRICE_MINOR / 2 / 10 * 9);
    }
}
