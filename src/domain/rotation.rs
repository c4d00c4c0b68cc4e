//! Deterministic mapping from calendar dates to daily photo slots.
//!
//! The rotation runs on a fixed cycle: day one is the configured start date,
//! and every later date maps to exactly one index inside the cycle. Each day
//! owns a fixed grid of slots (two pictures per category), and a slot is
//! satisfied by an on-disk filename that embeds the day index, the category
//! ordinal, and the picture number. Everything here is pure so the resolution
//! rules can be tested without a filesystem.

use std::fmt;

use time::Date;

use super::error::DomainError;

/// Number of pictures served per category per day.
pub const SLOTS_PER_CATEGORY: u8 = 2;

/// Address of one daily picture position: category ordinal plus picture index,
/// both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub ordinal: u8,
    pub picture: u8,
}

impl SlotKey {
    pub fn new(ordinal: u8, picture: u8) -> Self {
        Self { ordinal, picture }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cat{}_pic{}", self.ordinal, self.picture)
    }
}

/// A slot resolved to a concrete file inside one category directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPhoto {
    pub category: String,
    pub filename: String,
}

/// The fixed rotation window: a start date and a cycle length in days.
#[derive(Debug, Clone)]
pub struct RotationSchedule {
    start: Date,
    cycle_days: u32,
}

impl RotationSchedule {
    pub fn new(start: Date, cycle_days: u32) -> Result<Self, DomainError> {
        if cycle_days == 0 {
            return Err(DomainError::validation(
                "rotation cycle must span at least one day",
            ));
        }
        Ok(Self { start, cycle_days })
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn cycle_days(&self) -> u32 {
        self.cycle_days
    }

    /// 1-based index of `date` inside the cycle, or `None` when the date falls
    /// before the start or after the final day. Out-of-range dates are not an
    /// error: they are days without content.
    pub fn day_index(&self, date: Date) -> Option<u32> {
        let offset = (date - self.start).whole_days();
        let index = offset + 1;
        if index < 1 || index > i64::from(self.cycle_days) {
            return None;
        }
        u32::try_from(index).ok()
    }
}

/// Iterate the full slot grid for a category list of the given size, in
/// listing order: every picture of category 1, then category 2, and so on.
pub fn slot_keys(category_count: usize) -> impl Iterator<Item = SlotKey> {
    (1..=category_count as u8)
        .flat_map(|ordinal| (1..=SLOTS_PER_CATEGORY).map(move |picture| SlotKey::new(ordinal, picture)))
}

/// The filename stem a slot file must carry on the given day, extension
/// excluded: `pic{day}(cat{ordinal}-pic{picture})`.
pub fn slot_stem(day_index: u32, slot: SlotKey) -> String {
    format!("pic{day_index}(cat{}-pic{})", slot.ordinal, slot.picture)
}

/// All filenames satisfying the slot on the given day, sorted
/// lexicographically. A name matches when it is exactly the slot stem followed
/// by a dot and a non-empty extension.
pub fn matching_slot_files<'a, I>(filenames: I, day_index: u32, slot: SlotKey) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let stem = slot_stem(day_index, slot);
    let mut matches: Vec<&str> = filenames
        .into_iter()
        .filter(|name| matches_stem(name, &stem))
        .collect();
    matches.sort_unstable();
    matches
}

/// Pick the filename serving the slot on the given day. When several files
/// match, the lexicographically smallest wins so repeated scans of the same
/// directory always agree.
pub fn select_slot_file<'a, I>(filenames: I, day_index: u32, slot: SlotKey) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    matching_slot_files(filenames, day_index, slot)
        .first()
        .copied()
}

fn matches_stem(filename: &str, stem: &str) -> bool {
    filename
        .strip_prefix(stem)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn schedule() -> RotationSchedule {
        RotationSchedule::new(date!(2024 - 01 - 01), 730).expect("valid schedule")
    }

    #[test]
    fn day_index_is_one_based_from_the_start_date() {
        let schedule = schedule();
        assert_eq!(schedule.day_index(date!(2024 - 01 - 01)), Some(1));
        assert_eq!(schedule.day_index(date!(2024 - 01 - 02)), Some(2));
        assert_eq!(schedule.day_index(date!(2024 - 12 - 31)), Some(366));
    }

    #[test]
    fn day_index_covers_the_cycle_contiguously() {
        let schedule = schedule();
        let mut previous = 0;
        let mut date = schedule.start();
        for _ in 0..schedule.cycle_days() {
            let index = schedule.day_index(date).expect("inside the cycle");
            assert_eq!(index, previous + 1);
            previous = index;
            date = date.next_day().expect("date within range");
        }
        assert_eq!(previous, 730);
    }

    #[test]
    fn dates_outside_the_cycle_have_no_index() {
        let schedule = schedule();
        assert_eq!(schedule.day_index(date!(2023 - 12 - 31)), None);
        assert_eq!(schedule.day_index(date!(2025 - 12 - 31)), None);
        assert_eq!(schedule.day_index(date!(2026 - 01 - 02)), None);
    }

    #[test]
    fn final_cycle_day_is_included() {
        let schedule = schedule();
        assert_eq!(schedule.day_index(date!(2025 - 12 - 30)), Some(730));
    }

    #[test]
    fn zero_length_cycle_is_rejected() {
        assert!(RotationSchedule::new(date!(2024 - 01 - 01), 0).is_err());
    }

    #[test]
    fn slot_keys_enumerate_categories_in_order() {
        let keys: Vec<String> = slot_keys(2).map(|slot| slot.to_string()).collect();
        assert_eq!(keys, ["cat1_pic1", "cat1_pic2", "cat2_pic1", "cat2_pic2"]);
    }

    #[test]
    fn slot_stem_embeds_day_and_slot() {
        assert_eq!(slot_stem(412, SlotKey::new(2, 1)), "pic412(cat2-pic1)");
    }

    #[test]
    fn matching_requires_the_exact_stem_and_an_extension() {
        let names = [
            "pic1(cat1-pic1).jpg",
            "pic1(cat1-pic1).",
            "pic1(cat1-pic1)",
            "pic1(cat1-pic11).jpg",
            "pic11(cat1-pic1).jpg",
            "unrelated.jpg",
        ];
        let matches = matching_slot_files(names, 1, SlotKey::new(1, 1));
        assert_eq!(matches, ["pic1(cat1-pic1).jpg"]);
    }

    #[test]
    fn duplicate_matches_resolve_to_the_smallest_name() {
        let names = [
            "pic7(cat1-pic2).png",
            "pic7(cat1-pic2).jpg",
            "pic7(cat1-pic2).webp",
        ];
        let selected = select_slot_file(names, 7, SlotKey::new(1, 2));
        assert_eq!(selected, Some("pic7(cat1-pic2).jpg"));
    }

    #[test]
    fn missing_slot_selects_nothing() {
        let names = ["pic7(cat1-pic1).jpg"];
        assert_eq!(select_slot_file(names, 7, SlotKey::new(1, 2)), None);
    }
}
