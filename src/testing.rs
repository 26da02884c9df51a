//! Fixture builders shared by the unit tests.

use crate::data::{LessonRequest, LessonType, ScheduleInfo, SchedulingInput, StudentDemand};
use crate::demand::{Demand, normalize};
use std::collections::BTreeMap;

pub struct StudentFixture {
    id: String,
    demand: StudentDemand,
}

pub fn student(id: &str) -> StudentFixture {
    StudentFixture {
        id: id.to_string(),
        demand: StudentDemand::default(),
    }
}

impl StudentFixture {
    pub fn lesson(self, name: &str, lesson_type: LessonType, count: u32) -> Self {
        self.labelled(name, label_of(lesson_type), count)
    }

    /// A lesson request carrying an arbitrary type label.
    pub fn labelled(mut self, name: &str, type_label: &str, count: u32) -> Self {
        self.demand.lessons.push(LessonRequest {
            name: name.to_string(),
            type_label: type_label.to_string(),
            count,
        });
        self
    }

    pub fn unavailable(mut self, date: &str) -> Self {
        self.demand.unavailable_dates.insert(date.to_string());
        self
    }
}

/// The canonical request label for a lesson type.
pub fn label_of(lesson_type: LessonType) -> &'static str {
    match lesson_type {
        LessonType::FaceToFace => "FACE_TO_FACE",
        LessonType::HighSchoolFaceToFace => "HIGH_SCHOOL_FACE_TO_FACE",
        LessonType::Other => "OTHER",
    }
}

pub fn students_of(students: Vec<StudentFixture>) -> BTreeMap<String, StudentDemand> {
    students.into_iter().map(|s| (s.id, s.demand)).collect()
}

pub fn demand_of(students: Vec<StudentFixture>) -> Demand {
    normalize(&students_of(students))
}

pub fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn input_of(
    students: Vec<StudentFixture>,
    dates: &[&str],
    slots_per_day: &[&str],
    timeout: u64,
) -> SchedulingInput {
    SchedulingInput {
        students: students_of(students),
        schedule_info: ScheduleInfo {
            dates: labels(dates),
            slots_per_day: labels(slots_per_day),
        },
        timeout: Some(timeout),
        weights: Default::default(),
    }
}
