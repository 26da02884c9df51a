use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

// Type aliases for clarity
pub type StudentId = String;
pub type Date = String;
pub type SlotLabel = String;

/// How the capacity rules see a lesson type label. The face-to-face kinds
/// share the per-slot room capacity; any other label is [`LessonType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LessonType {
    FaceToFace,
    HighSchoolFaceToFace,
    Other,
}

impl LessonType {
    pub fn from_label(label: &str) -> Self {
        match label {
            "FACE_TO_FACE" | "対面" => LessonType::FaceToFace,
            "HIGH_SCHOOL_FACE_TO_FACE" | "高校対面" => LessonType::HighSchoolFaceToFace,
            _ => LessonType::Other,
        }
    }

    /// Whether a lesson of this type takes a seat in the shared classroom.
    pub fn uses_room(self) -> bool {
        matches!(self, LessonType::FaceToFace | LessonType::HighSchoolFaceToFace)
    }
}

/// One line of a student's lesson demand, e.g. "Math, face to face, 3 times".
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LessonRequest {
    pub name: String,
    /// Free-form type label, echoed back unchanged in the schedule.
    #[serde(rename = "type")]
    pub type_label: String,
    pub count: u32,
}

impl LessonRequest {
    pub fn lesson_type(&self) -> LessonType {
        LessonType::from_label(&self.type_label)
    }
}

/// Everything a student asks for, plus the dates they cannot attend.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StudentDemand {
    pub lessons: Vec<LessonRequest>,
    #[serde(default)]
    pub unavailable_dates: HashSet<Date>,
}

/// Schedule geometry: ordered dates, and the slot labels every date offers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleInfo {
    #[serde(default)]
    pub dates: Vec<Date>,
    #[serde(default)]
    pub slots_per_day: Vec<SlotLabel>,
}

/// Weights of the soft constraints in the minimised objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PenaltyWeights {
    pub consecutive_days: u32,
    pub two_slot_gap: u32,
    pub distribution: u32,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            consecutive_days: 200,
            two_slot_gap: 100,
            distribution: 1,
        }
    }
}

/// The complete input for the timetabling problem.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulingInput {
    #[serde(default)]
    pub students: BTreeMap<StudentId, StudentDemand>,
    pub schedule_info: ScheduleInfo,
    /// Solver budget in seconds; the service default applies when absent.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub weights: PenaltyWeights,
}

/// A lesson as it appears in a schedule cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedLesson {
    pub student: StudentId,
    pub lesson_name: String,
    /// The label the request used for this lesson's type.
    #[serde(rename = "type")]
    pub type_label: String,
    #[serde(skip)]
    pub lesson_type: LessonType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCell {
    pub label: SlotLabel,
    pub lessons: Vec<PlacedLesson>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySchedule {
    pub date: Date,
    pub slots: Vec<SlotCell>,
}

/// date -> slot label -> lessons, keeping the order of the request geometry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schedule {
    pub days: Vec<DaySchedule>,
}

impl Schedule {
    /// A grid with every (date, slot label) cell present and empty.
    pub fn empty(dates: &[Date], labels: &[SlotLabel]) -> Self {
        let days = dates
            .iter()
            .map(|date| DaySchedule {
                date: date.clone(),
                slots: labels
                    .iter()
                    .map(|label| SlotCell {
                        label: label.clone(),
                        lessons: Vec::new(),
                    })
                    .collect(),
            })
            .collect();
        Self { days }
    }

    #[cfg(test)]
    pub fn cell(&self, date: &str, label: &str) -> Option<&[PlacedLesson]> {
        self.days
            .iter()
            .find(|d| d.date == date)?
            .slots
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.lessons.as_slice())
    }

    /// Every placed lesson with its (date index, slot index).
    pub fn placements(&self) -> impl Iterator<Item = (usize, usize, &PlacedLesson)> {
        self.days.iter().enumerate().flat_map(|(d, day)| {
            day.slots.iter().enumerate().flat_map(move |(s, cell)| {
                cell.lessons.iter().map(move |lesson| (d, s, lesson))
            })
        })
    }
}

impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.days.iter().map(|day| (&day.date, day)))
    }
}

impl Serialize for DaySchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.slots.iter().map(|cell| (&cell.label, &cell.lessons)))
    }
}

/// Describes a soft constraint that was not met in the final schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmetSoftConstraint {
    pub constraint_type: String,
    pub description: String,
    pub penalty: u64,
}

impl fmt::Display for UnmetSoftConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (+{})", self.constraint_type, self.description, self.penalty)
    }
}

/// The final output of the solver.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulingOutput {
    pub schedule: Schedule,
    pub penalty: u64,
    pub unmet_soft_constraints: Vec<UnmetSoftConstraint>,
}
