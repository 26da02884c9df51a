use crate::data::{Date, LessonType, StudentDemand, StudentId};
use log::trace;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Students with at least this many lessons must get two or more lessons
/// on every day they attend.
pub const HEAVY_LOAD_THRESHOLD: u32 = 20;

/// One atomic lesson that needs exactly one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonInstance {
    /// `<student>_<lesson name>_<ordinal>`
    pub id: String,
    /// Index into [`Demand::students`].
    pub student: usize,
    pub lesson_name: String,
    /// 1-based, counted per (student, lesson name).
    pub ordinal: u32,
    /// Type label as requested.
    pub type_label: String,
    pub lesson_type: LessonType,
}

impl LessonInstance {
    pub fn display_name(&self) -> String {
        format!("{}_{}", self.lesson_name, self.ordinal)
    }
}

#[derive(Debug, Clone)]
pub struct Student {
    pub id: StudentId,
    pub unavailable_dates: HashSet<Date>,
    pub total_lesson_count: u32,
    /// Indices into [`Demand::lessons`], in demand order.
    pub lessons: Vec<usize>,
}

impl Student {
    pub fn is_heavy_load(&self) -> bool {
        self.total_lesson_count >= HEAVY_LOAD_THRESHOLD
    }

    pub fn is_available(&self, date: &str) -> bool {
        !self.unavailable_dates.contains(date)
    }
}

/// Normalized demand: students in iteration order and their expanded lessons.
#[derive(Debug, Clone, Default)]
pub struct Demand {
    pub students: Vec<Student>,
    pub lessons: Vec<LessonInstance>,
}

impl Demand {
    pub fn student_of(&self, lesson: &LessonInstance) -> &Student {
        &self.students[lesson.student]
    }
}

/// Expands every lesson request into `count` lesson instances.
pub fn normalize(students: &BTreeMap<StudentId, StudentDemand>) -> Demand {
    let mut demand = Demand::default();

    for (student_idx, (student_id, request)) in students.iter().enumerate() {
        let mut ordinals: HashMap<&str, u32> = HashMap::new();
        let mut own_lessons = Vec::new();

        for lesson in &request.lessons {
            let lesson_type = lesson.lesson_type();
            let ordinal = ordinals.entry(lesson.name.as_str()).or_insert(0);
            for _ in 0..lesson.count {
                *ordinal += 1;
                own_lessons.push(demand.lessons.len());
                demand.lessons.push(LessonInstance {
                    id: format!("{}_{}_{}", student_id, lesson.name, ordinal),
                    student: student_idx,
                    lesson_name: lesson.name.clone(),
                    ordinal: *ordinal,
                    type_label: lesson.type_label.clone(),
                    lesson_type,
                });
            }
        }

        let total_lesson_count = request.lessons.iter().map(|l| l.count).sum();
        trace!(
            "Student {} requests {} lessons ({} unavailable dates).",
            student_id,
            total_lesson_count,
            request.unavailable_dates.len()
        );
        demand.students.push(Student {
            id: student_id.clone(),
            unavailable_dates: request.unavailable_dates.clone(),
            total_lesson_count,
            lessons: own_lessons,
        });
    }

    demand
}
