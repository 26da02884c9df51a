use crate::data::LessonType;
use crate::demand::Demand;
use crate::slots::SlotSpace;
use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint, variable};
use log::{debug, info};

/// Room capacity per time slot, counted over face-to-face lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCapacity {
    pub face_to_face: u32,
    /// Tighter bound that applies once a high-school lesson is in the slot.
    pub with_high_school: u32,
}

impl Default for SlotCapacity {
    fn default() -> Self {
        Self {
            face_to_face: 4,
            with_high_school: 3,
        }
    }
}

/// Variables and linear constraints of one timetabling model.
///
/// Every declared variable is recorded so that a solver can hand back a full
/// valuation.
pub struct Formulation {
    pub(crate) variables: ProblemVariables,
    pub(crate) declared: Vec<Variable>,
    pub(crate) constraints: Vec<Constraint>,
}

impl Default for Formulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Formulation {
    pub fn new() -> Self {
        Self {
            variables: ProblemVariables::new(),
            declared: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn add_bool(&mut self) -> Variable {
        let var = self.variables.add(variable().binary());
        self.declared.push(var);
        var
    }

    pub fn add_integer(&mut self, min: f64, max: f64) -> Variable {
        let var = self.variables.add(variable().integer().min(min).max(max));
        self.declared.push(var);
        var
    }

    pub fn leq(&mut self, lhs: impl Into<Expression>, rhs: impl Into<Expression>) {
        let (lhs, rhs) = (lhs.into(), rhs.into());
        self.constraints.push(constraint!(lhs <= rhs));
    }

    pub fn geq(&mut self, lhs: impl Into<Expression>, rhs: impl Into<Expression>) {
        self.leq(rhs, lhs);
    }

    pub fn eq(&mut self, lhs: impl Into<Expression>, rhs: impl Into<Expression>) {
        let (lhs, rhs) = (lhs.into(), rhs.into());
        self.constraints.push(constraint!(lhs == rhs));
    }

    pub fn fix(&mut self, var: Variable, value: f64) {
        self.eq(var, value);
    }

    /// `indicator <=> sum > 0`, for a sum of non-negative integers that never
    /// exceeds `upper`.
    pub fn reify_positive(&mut self, indicator: Variable, sum: Expression, upper: f64) {
        if upper <= 0.0 {
            self.fix(indicator, 0.0);
            return;
        }
        // indicator -> sum >= 1
        self.geq(sum.clone(), indicator);
        // sum >= 1 -> indicator
        self.leq(sum, upper * indicator);
    }

    /// `indicator <=> all(positive) && none(negative)` over booleans.
    pub fn reify_and(&mut self, indicator: Variable, positive: &[Variable], negative: &[Variable]) {
        for &p in positive {
            self.leq(indicator, p);
        }
        for &n in negative {
            self.leq(indicator + n, 1.0);
        }
        let terms = (positive.len() + negative.len()) as f64;
        let satisfied: Expression = positive.iter().copied().sum::<Expression>()
            - negative.iter().copied().sum::<Expression>()
            + negative.len() as f64;
        self.geq(indicator, satisfied - (terms - 1.0));
    }

    pub fn variable_count(&self) -> usize {
        self.declared.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

/// Decision booleans: `assign[lesson][slot]` is true iff the lesson takes the slot.
#[derive(Debug, Clone)]
pub struct AssignmentVariables {
    pub assign: Vec<Vec<Variable>>,
    /// Per slot, the "a high-school lesson is here" indicator, when the
    /// demand has any high-school lesson at all.
    pub high_school_present: Vec<Option<Variable>>,
}

impl AssignmentVariables {
    /// Sum of a student's assignments over the given slot positions.
    pub fn student_sum(
        &self,
        lessons: &[usize],
        slots: impl IntoIterator<Item = usize> + Clone,
    ) -> Expression {
        lessons
            .iter()
            .flat_map(|&i| slots.clone().into_iter().map(move |j| self.assign[i][j]))
            .sum()
    }
}

/// Declares the assignment variables and adds the hard constraints on them:
/// exactly one slot per lesson, room capacity per slot, student unavailability
/// and at most one lesson per student per slot.
pub fn build_assignments(
    formulation: &mut Formulation,
    demand: &Demand,
    space: &SlotSpace,
    capacity: SlotCapacity,
) -> AssignmentVariables {
    info!(
        "Declaring {} assignment variables ({} lessons x {} slots)...",
        demand.lessons.len() * space.len(),
        demand.lessons.len(),
        space.len()
    );
    let mut assign: Vec<Vec<Variable>> = Vec::with_capacity(demand.lessons.len());
    for _ in &demand.lessons {
        assign.push((0..space.len()).map(|_| formulation.add_bool()).collect());
    }

    info!("Adding 'lesson placed exactly once' constraints...");
    for row in &assign {
        let placed: Expression = row.iter().copied().sum();
        formulation.eq(placed, 1.0);
    }

    info!("Adding 'slot capacity' constraints...");
    let room_lessons: Vec<usize> = (0..demand.lessons.len())
        .filter(|&i| demand.lessons[i].lesson_type.uses_room())
        .collect();
    let high_school_lessons: Vec<usize> = (0..demand.lessons.len())
        .filter(|&i| demand.lessons[i].lesson_type == LessonType::HighSchoolFaceToFace)
        .collect();
    let cap = capacity.face_to_face as f64;
    let tightening = capacity.face_to_face.saturating_sub(capacity.with_high_school) as f64;
    let mut high_school_present = Vec::with_capacity(space.len());
    for j in 0..space.len() {
        if room_lessons.is_empty() {
            high_school_present.push(None);
            continue;
        }
        let seated: Expression = room_lessons.iter().map(|&i| assign[i][j]).sum();
        formulation.leq(seated.clone(), cap);

        if high_school_lessons.is_empty() {
            high_school_present.push(None);
            continue;
        }
        let present = formulation.add_bool();
        let high_school: Expression = high_school_lessons.iter().map(|&i| assign[i][j]).sum();
        formulation.reify_positive(present, high_school, high_school_lessons.len() as f64);
        formulation.leq(seated + tightening * present, cap);
        high_school_present.push(Some(present));
    }

    info!("Adding 'unavailable dates' constraints...");
    let mut excluded = 0usize;
    for (i, lesson) in demand.lessons.iter().enumerate() {
        let student = demand.student_of(lesson);
        for (j, slot) in space.slots.iter().enumerate() {
            if !student.is_available(&space.dates[slot.date]) {
                formulation.fix(assign[i][j], 0.0);
                excluded += 1;
            }
        }
    }
    debug!("Excluded {} assignment variables on unavailable dates.", excluded);

    info!("Adding 'one lesson per student per slot' constraints...");
    for student in &demand.students {
        if student.lessons.len() < 2 {
            continue;
        }
        for j in 0..space.len() {
            let busy: Expression = student.lessons.iter().map(|&i| assign[i][j]).sum();
            formulation.leq(busy, 1.0);
        }
    }

    AssignmentVariables {
        assign,
        high_school_present,
    }
}
