//! Learner Entity
//!
//! The academy's view of a user: role plus the course sets it owns. Always
//! loaded fresh for each check.

use std::collections::HashSet;

use kernel::id::{CourseId, UserId};

use crate::domain::value_object::learner_role::LearnerRole;

#[derive(Debug, Clone, PartialEq)]
pub struct Learner {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: LearnerRole,
    /// Append-only grant list
    pub courses_owned: HashSet<CourseId>,
    pub favorites: HashSet<CourseId>,
}

impl Learner {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn owns(&self, course_id: &CourseId) -> bool {
        self.courses_owned.contains(course_id)
    }
}
