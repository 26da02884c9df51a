use crate::data::{Date, SlotLabel};

/// A (date, slot label) pair, stored as positions into the geometry lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    pub date: usize,
    pub slot: usize,
}

/// The ordered cross product dates x slot labels, date-major.
///
/// Dates are taken in the order given; position in this list is what the
/// consecutive-day penalty treats as adjacency.
#[derive(Debug, Clone)]
pub struct SlotSpace {
    pub dates: Vec<Date>,
    pub labels: Vec<SlotLabel>,
    pub slots: Vec<TimeSlot>,
}

impl SlotSpace {
    pub fn build(dates: &[Date], labels: &[SlotLabel]) -> Self {
        let slots = (0..dates.len())
            .flat_map(|date| (0..labels.len()).map(move |slot| TimeSlot { date, slot }))
            .collect();
        Self {
            dates: dates.to_vec(),
            labels: labels.to_vec(),
            slots,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn slots_per_day(&self) -> usize {
        self.labels.len()
    }

    /// Position of (date, slot) in [`SlotSpace::slots`], if the pair exists.
    pub fn index_of(&self, date: usize, slot: usize) -> Option<usize> {
        if date < self.dates.len() && slot < self.labels.len() {
            Some(date * self.labels.len() + slot)
        } else {
            None
        }
    }

    /// Slot positions belonging to one date.
    pub fn day(&self, date: usize) -> impl Iterator<Item = usize> + Clone + '_ {
        (0..self.labels.len()).filter_map(move |slot| self.index_of(date, slot))
    }
}
