use crate::aggregate::Aggregates;
use crate::data::PenaltyWeights;
use crate::demand::Demand;
use crate::model::Formulation;
use crate::slots::SlotSpace;
use good_lp::{Expression, Variable};
use log::{debug, info};

/// Upper bound of the min/max daily-load helpers of the evenness penalty.
pub const SPREAD_BOUND: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyKind {
    /// max - min daily load of a student.
    Distribution,
    /// Lessons on three positionally consecutive dates.
    ConsecutiveDays,
    /// Occupied, empty, empty, occupied within a day.
    TwoSlotGap,
}

/// `weight * expr`, one entry of the minimised objective.
#[derive(Debug, Clone)]
pub struct PenaltyTerm {
    pub kind: PenaltyKind,
    pub weight: f64,
    pub expr: Expression,
}

/// Builds every soft-constraint term. Each builder only adds its own helper
/// variables and returns its terms; nothing is accumulated in place.
pub fn build_penalties(
    formulation: &mut Formulation,
    demand: &Demand,
    space: &SlotSpace,
    aggregates: &Aggregates,
    weights: PenaltyWeights,
) -> Vec<PenaltyTerm> {
    let mut terms = Vec::new();
    terms.extend(distribution_terms(formulation, demand, space, aggregates, weights.distribution));
    terms.extend(consecutive_day_terms(
        formulation,
        demand,
        space,
        aggregates,
        weights.consecutive_days,
    ));
    terms.extend(two_slot_gap_terms(formulation, demand, space, aggregates, weights.two_slot_gap));
    info!(
        "Objective built from {} penalty terms ({} distribution, {} consecutive-day, {} gap).",
        terms.len(),
        terms.iter().filter(|t| t.kind == PenaltyKind::Distribution).count(),
        terms.iter().filter(|t| t.kind == PenaltyKind::ConsecutiveDays).count(),
        terms.iter().filter(|t| t.kind == PenaltyKind::TwoSlotGap).count()
    );
    terms
}

/// Sum of all weighted terms.
pub fn objective(terms: &[PenaltyTerm]) -> Expression {
    terms.iter().map(|t| t.weight * t.expr.clone()).sum()
}

fn distribution_terms(
    formulation: &mut Formulation,
    demand: &Demand,
    space: &SlotSpace,
    aggregates: &Aggregates,
    weight: u32,
) -> Vec<PenaltyTerm> {
    if weight == 0 || space.dates.is_empty() {
        return Vec::new();
    }
    let bound = SPREAD_BOUND.max(space.slots_per_day() as u32) as f64;
    let mut terms = Vec::with_capacity(demand.students.len());

    for loads in &aggregates.daily_load {
        let highest = formulation.add_integer(0.0, bound);
        let lowest = formulation.add_integer(0.0, bound);
        equal_to_extreme(formulation, highest, loads, bound, Extreme::Max);
        equal_to_extreme(formulation, lowest, loads, bound, Extreme::Min);

        terms.push(PenaltyTerm {
            kind: PenaltyKind::Distribution,
            weight: weight as f64,
            expr: highest - lowest,
        });
    }
    terms
}

enum Extreme {
    Max,
    Min,
}

/// `target == max(values)` (or min): bounded on one side by every value and
/// pinned to exactly one of them through a selector boolean.
fn equal_to_extreme(
    formulation: &mut Formulation,
    target: Variable,
    values: &[Variable],
    big_m: f64,
    extreme: Extreme,
) {
    let mut selectors = Vec::with_capacity(values.len());
    for &value in values {
        let picked = formulation.add_bool();
        match extreme {
            Extreme::Max => {
                formulation.geq(target, value);
                formulation.leq(target, value + big_m - big_m * picked);
            }
            Extreme::Min => {
                formulation.leq(target, value);
                formulation.geq(target, value - big_m + big_m * picked);
            }
        }
        selectors.push(picked);
    }
    let picked_once: Expression = selectors.iter().copied().sum();
    formulation.eq(picked_once, 1.0);
}

fn consecutive_day_terms(
    formulation: &mut Formulation,
    demand: &Demand,
    space: &SlotSpace,
    aggregates: &Aggregates,
    weight: u32,
) -> Vec<PenaltyTerm> {
    if weight == 0 {
        return Vec::new();
    }
    let mut terms = Vec::new();
    for attends in &aggregates.has_lesson {
        // adjacency is by position in the date list
        for window in attends.windows(3) {
            let streak = formulation.add_bool();
            formulation.reify_and(streak, window, &[]);
            terms.push(PenaltyTerm {
                kind: PenaltyKind::ConsecutiveDays,
                weight: weight as f64,
                expr: Expression::from(streak),
            });
        }
    }
    debug!(
        "{} consecutive-day indicators over {} students and {} dates.",
        terms.len(),
        demand.students.len(),
        space.dates.len()
    );
    terms
}

fn two_slot_gap_terms(
    formulation: &mut Formulation,
    demand: &Demand,
    space: &SlotSpace,
    aggregates: &Aggregates,
    weight: u32,
) -> Vec<PenaltyTerm> {
    if weight == 0 {
        return Vec::new();
    }
    let mut terms = Vec::new();
    for days in &aggregates.occupied {
        for day in days {
            for window in day.windows(4) {
                let gap = formulation.add_bool();
                formulation.reify_and(gap, &[window[0], window[3]], &[window[1], window[2]]);
                terms.push(PenaltyTerm {
                    kind: PenaltyKind::TwoSlotGap,
                    weight: weight as f64,
                    expr: Expression::from(gap),
                });
            }
        }
    }
    debug!(
        "{} two-slot gap indicators over {} students and {} slots per day.",
        terms.len(),
        demand.students.len(),
        space.slots_per_day()
    );
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::build_aggregates;
    use crate::data::LessonType;
    use crate::model::{SlotCapacity, build_assignments};
    use crate::testing::{demand_of, labels, student};

    fn terms_for(dates: &[&str], slots: &[&str], weights: PenaltyWeights) -> Vec<PenaltyTerm> {
        let demand = demand_of(vec![
            student("alice").lesson("Math", LessonType::Other, 2),
            student("bob").lesson("English", LessonType::FaceToFace, 1),
        ]);
        let space = SlotSpace::build(&labels(dates), &labels(slots));
        let mut formulation = Formulation::new();
        let vars = build_assignments(&mut formulation, &demand, &space, SlotCapacity::default());
        let aggregates = build_aggregates(&mut formulation, &demand, &space, &vars);
        build_penalties(&mut formulation, &demand, &space, &aggregates, weights)
    }

    fn count(terms: &[PenaltyTerm], kind: PenaltyKind) -> usize {
        terms.iter().filter(|t| t.kind == kind).count()
    }

    #[test]
    fn one_term_per_window() {
        let terms = terms_for(
            &["d1", "d2", "d3", "d4"],
            &["1", "2", "3", "4", "5"],
            PenaltyWeights::default(),
        );
        assert_eq!(count(&terms, PenaltyKind::Distribution), 2);
        // 2 students x 2 date triples
        assert_eq!(count(&terms, PenaltyKind::ConsecutiveDays), 4);
        // 2 students x 4 dates x 2 four-slot windows
        assert_eq!(count(&terms, PenaltyKind::TwoSlotGap), 16);
        assert!(
            terms
                .iter()
                .filter(|t| t.kind == PenaltyKind::ConsecutiveDays)
                .all(|t| t.weight == 200.0)
        );
        assert!(
            terms
                .iter()
                .filter(|t| t.kind == PenaltyKind::TwoSlotGap)
                .all(|t| t.weight == 100.0)
        );
    }

    #[test]
    fn short_geometry_has_no_window_terms() {
        let terms = terms_for(&["d1", "d2"], &["1", "2", "3"], PenaltyWeights::default());
        assert_eq!(count(&terms, PenaltyKind::ConsecutiveDays), 0);
        assert_eq!(count(&terms, PenaltyKind::TwoSlotGap), 0);
        assert_eq!(count(&terms, PenaltyKind::Distribution), 2);
    }

    #[test]
    fn zero_weight_drops_terms() {
        let weights = PenaltyWeights {
            consecutive_days: 0,
            two_slot_gap: 100,
            distribution: 0,
        };
        let terms = terms_for(&["d1", "d2", "d3"], &["1", "2", "3", "4"], weights);
        assert_eq!(count(&terms, PenaltyKind::ConsecutiveDays), 0);
        assert_eq!(count(&terms, PenaltyKind::Distribution), 0);
        assert_eq!(count(&terms, PenaltyKind::TwoSlotGap), 6);
    }
}
