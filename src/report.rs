use crate::aggregate::MIN_DAILY_LOAD;
use crate::data::{LessonType, PenaltyWeights, Schedule, UnmetSoftConstraint};
use crate::demand::Demand;
use crate::model::SlotCapacity;
use itertools::Itertools;
use std::collections::{HashMap, HashSet};

/// Per student: lesson count per date and occupied flags per (date, slot).
struct Occupancy {
    loads: Vec<Vec<u32>>,
    occupied: Vec<Vec<Vec<bool>>>,
}

fn occupancy(demand: &Demand, schedule: &Schedule) -> Occupancy {
    let index: HashMap<&str, usize> = demand
        .students
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();
    let dates = schedule.days.len();
    let per_day = schedule.days.first().map_or(0, |d| d.slots.len());
    let mut loads = vec![vec![0u32; dates]; demand.students.len()];
    let mut occupied = vec![vec![vec![false; per_day]; dates]; demand.students.len()];

    for (d, s, lesson) in schedule.placements() {
        if let Some(&student) = index.get(lesson.student.as_str()) {
            loads[student][d] += 1;
            occupied[student][d][s] = true;
        }
    }
    Occupancy { loads, occupied }
}

/// Recomputes the objective on a decoded schedule and lists every soft
/// constraint it violates.
pub fn score_and_unmet_constraints(
    demand: &Demand,
    schedule: &Schedule,
    weights: PenaltyWeights,
) -> (u64, Vec<UnmetSoftConstraint>) {
    let Occupancy { loads, occupied } = occupancy(demand, schedule);
    let mut unmet = Vec::new();

    for (student, daily) in demand.students.iter().zip(&loads) {
        if let itertools::MinMaxResult::MinMax(lo, hi) = daily.iter().minmax() {
            let spread = (hi - lo) as u64;
            if spread > 0 && weights.distribution > 0 {
                unmet.push(UnmetSoftConstraint {
                    constraint_type: "Even Distribution".to_string(),
                    description: format!(
                        "Student {} has between {} and {} lessons per day.",
                        student.id, lo, hi
                    ),
                    penalty: spread * weights.distribution as u64,
                });
            }
        }
    }

    if weights.consecutive_days > 0 {
        for (student, daily) in demand.students.iter().zip(&loads) {
            for (i, window) in daily.windows(3).enumerate() {
                if window.iter().all(|&n| n > 0) {
                    unmet.push(UnmetSoftConstraint {
                        constraint_type: "Avoid Three Consecutive Days".to_string(),
                        description: format!(
                            "Student {} has lessons on {}, {} and {}.",
                            student.id,
                            schedule.days[i].date,
                            schedule.days[i + 1].date,
                            schedule.days[i + 2].date
                        ),
                        penalty: weights.consecutive_days as u64,
                    });
                }
            }
        }
    }

    if weights.two_slot_gap > 0 {
        for (student, days) in demand.students.iter().zip(&occupied) {
            for (d, slots) in days.iter().enumerate() {
                for (s, window) in slots.windows(4).enumerate() {
                    if *window == [true, false, false, true] {
                        let day = &schedule.days[d];
                        unmet.push(UnmetSoftConstraint {
                            constraint_type: "Avoid Two-Slot Gaps".to_string(),
                            description: format!(
                                "Student {} has a two-slot gap on {} between {} and {}.",
                                student.id, day.date, day.slots[s].label, day.slots[s + 3].label
                            ),
                            penalty: weights.two_slot_gap as u64,
                        });
                    }
                }
            }
        }
    }

    let penalty = unmet.iter().map(|u| u.penalty).sum();
    (penalty, unmet)
}

/// Hard-constraint audit of a decoded schedule; returns one line per breach.
pub fn hard_violations(
    demand: &Demand,
    schedule: &Schedule,
    capacity: SlotCapacity,
) -> Vec<String> {
    let mut violations = Vec::new();

    // each lesson instance exactly once
    let mut expected: HashSet<(&str, String)> = demand
        .lessons
        .iter()
        .map(|l| (demand.student_of(l).id.as_str(), l.display_name()))
        .collect();
    for (_, _, lesson) in schedule.placements() {
        if !expected.remove(&(lesson.student.as_str(), lesson.lesson_name.clone())) {
            violations.push(format!(
                "{} {} is placed twice or was never requested",
                lesson.student, lesson.lesson_name
            ));
        }
    }
    for (student, name) in expected.iter().sorted() {
        violations.push(format!("{} {} is not placed", student, name));
    }

    let students: HashMap<&str, _> = demand.students.iter().map(|s| (s.id.as_str(), s)).collect();
    for day in &schedule.days {
        for cell in &day.slots {
            for (student, count) in cell.lessons.iter().map(|l| l.student.as_str()).counts() {
                if count > 1 {
                    violations.push(format!(
                        "{} has {} lessons at {} {}",
                        student, count, day.date, cell.label
                    ));
                }
            }

            let seated = cell.lessons.iter().filter(|l| l.lesson_type.uses_room()).count() as u32;
            let high_school = cell
                .lessons
                .iter()
                .any(|l| l.lesson_type == LessonType::HighSchoolFaceToFace);
            let limit = if high_school {
                capacity.with_high_school.min(capacity.face_to_face)
            } else {
                capacity.face_to_face
            };
            if seated > limit {
                violations.push(format!(
                    "{} {} seats {} face-to-face lessons (limit {})",
                    day.date, cell.label, seated, limit
                ));
            }

            for lesson in &cell.lessons {
                let unavailable = students
                    .get(lesson.student.as_str())
                    .is_some_and(|s| !s.is_available(&day.date));
                if unavailable {
                    violations.push(format!(
                        "{} is placed on unavailable date {}",
                        lesson.student, day.date
                    ));
                }
            }
        }
    }

    let Occupancy { loads, .. } = occupancy(demand, schedule);
    for (student, daily) in demand.students.iter().zip(&loads) {
        if !student.is_heavy_load() {
            continue;
        }
        for (d, &load) in daily.iter().enumerate() {
            if load > 0 && load < MIN_DAILY_LOAD {
                violations.push(format!(
                    "{} has only {} lesson on {}",
                    student.id, load, schedule.days[d].date
                ));
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PlacedLesson;
    use crate::testing::{demand_of, label_of, labels, student};

    fn place(
        schedule: &mut Schedule,
        date: usize,
        slot: usize,
        who: &str,
        name: &str,
        kind: LessonType,
    ) {
        schedule.days[date].slots[slot].lessons.push(PlacedLesson {
            student: who.to_string(),
            lesson_name: name.to_string(),
            type_label: label_of(kind).to_string(),
            lesson_type: kind,
        });
    }

    #[test]
    fn scores_every_soft_constraint() {
        let demand = demand_of(vec![student("alice").lesson("Math", LessonType::Other, 5)]);
        let mut schedule = Schedule::empty(
            &labels(&["d1", "d2", "d3", "d4"]),
            &labels(&["1", "2", "3", "4"]),
        );
        place(&mut schedule, 0, 0, "alice", "Math_1", LessonType::Other);
        place(&mut schedule, 0, 3, "alice", "Math_2", LessonType::Other);
        place(&mut schedule, 1, 0, "alice", "Math_3", LessonType::Other);
        place(&mut schedule, 2, 1, "alice", "Math_4", LessonType::Other);
        place(&mut schedule, 2, 2, "alice", "Math_5", LessonType::Other);

        let (penalty, unmet) =
            score_and_unmet_constraints(&demand, &schedule, PenaltyWeights::default());
        // spread 2 - 0, one triple d1..d3, one gap on d1
        assert_eq!(penalty, 2 + 200 + 100);
        let kinds: Vec<&str> = unmet.iter().map(|u| u.constraint_type.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["Even Distribution", "Avoid Three Consecutive Days", "Avoid Two-Slot Gaps"]
        );
        assert!(unmet[2].to_string().contains("between 1 and 4"));
        assert!(hard_violations(&demand, &schedule, SlotCapacity::default()).is_empty());
    }

    #[test]
    fn three_slot_gap_is_not_penalised() {
        let demand = demand_of(vec![student("alice").lesson("Math", LessonType::Other, 2)]);
        let mut schedule = Schedule::empty(&labels(&["d1"]), &labels(&["1", "2", "3", "4", "5"]));
        place(&mut schedule, 0, 0, "alice", "Math_1", LessonType::Other);
        place(&mut schedule, 0, 4, "alice", "Math_2", LessonType::Other);
        let (penalty, unmet) =
            score_and_unmet_constraints(&demand, &schedule, PenaltyWeights::default());
        assert_eq!(penalty, 0);
        assert!(unmet.is_empty());
    }

    #[test]
    fn audit_flags_hard_breaches() {
        let demand = demand_of(vec![
            student("alice")
                .lesson("Math", LessonType::FaceToFace, 20)
                .unavailable("d2"),
            student("bob").lesson("Art", LessonType::HighSchoolFaceToFace, 1),
            student("carol").lesson("Art", LessonType::FaceToFace, 1),
            student("dave").lesson("Art", LessonType::FaceToFace, 1),
        ]);
        let mut schedule = Schedule::empty(&labels(&["d1", "d2"]), &labels(&["1", "2"]));
        place(&mut schedule, 0, 0, "alice", "Math_1", LessonType::FaceToFace);
        place(&mut schedule, 0, 0, "alice", "Math_2", LessonType::FaceToFace);
        place(&mut schedule, 0, 0, "bob", "Art_1", LessonType::HighSchoolFaceToFace);
        place(&mut schedule, 0, 0, "carol", "Art_1", LessonType::FaceToFace);
        place(&mut schedule, 1, 0, "alice", "Math_3", LessonType::FaceToFace);

        let violations = hard_violations(&demand, &schedule, SlotCapacity::default());
        let has = |needle: &str| violations.iter().any(|v| v.contains(needle));
        assert!(has("alice has 2 lessons at d1 1"));
        assert!(has("seats 4 face-to-face lessons (limit 3)"));
        assert!(has("alice is placed on unavailable date d2"));
        assert!(has("alice has only 1 lesson on d2"));
        assert!(has("dave Art_1 is not placed"));
        assert!(has("alice Math_20 is not placed"));
    }
}
