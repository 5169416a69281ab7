use crate::week::{DaySlot, PeriodError, WeekLayout};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const MODALITY_IN_PERSON: &str = "présentiel";

/// One scheduled course occurrence as returned by the scheduling service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Assignment {
    #[serde(deserialize_with = "lenient_string")]
    pub group: String,
    #[serde(deserialize_with = "lenient_string")]
    pub subject: String,
    #[serde(deserialize_with = "lenient_string")]
    pub teacher: String,
    #[serde(deserialize_with = "lenient_string")]
    pub room: String,
    #[serde(deserialize_with = "lenient_string")]
    pub period: String,
    #[serde(deserialize_with = "lenient_string")]
    pub modality: String,
}

// Numbers and booleans keep their text form; null and nested values read as "".
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

impl Assignment {
    /// Anything other than the in-person sentinel counts as remote.
    pub fn is_in_person(&self) -> bool {
        self.modality == MODALITY_IN_PERSON
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarGrid {
    cells: Vec<Vec<Vec<Assignment>>>,
}

impl CalendarGrid {
    fn empty(layout: &WeekLayout) -> Self {
        let cells = (0..layout.day_count())
            .map(|_| (0..layout.slots_per_day()).map(|_| Vec::new()).collect())
            .collect();
        Self { cells }
    }

    #[cfg(test)]
    pub fn day_count(&self) -> usize {
        self.cells.len()
    }

    #[cfg(test)]
    pub fn slots_per_day(&self) -> usize {
        self.cells.first().map(|d| d.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn cell(&self, day: usize, slot: usize) -> &[Assignment] {
        self.cells
            .get(day)
            .and_then(|d| d.get(slot))
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    pub fn days(&self) -> &[Vec<Vec<Assignment>>] {
        &self.cells
    }

    /// Walks every cell day by day, slots in order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (DaySlot, &[Assignment])> {
        self.cells.iter().enumerate().flat_map(|(day, slots)| {
            slots
                .iter()
                .enumerate()
                .map(move |(slot, c)| (DaySlot { day, slot }, c.as_slice()))
        })
    }

    pub fn assignment_count(&self) -> usize {
        self.iter_cells().map(|(_, c)| c.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedAssignment {
    /// Position in the input list.
    pub index: usize,
    pub period: String,
    pub reason: String,
    pub code: &'static str,
}

impl SkippedAssignment {
    fn new(index: usize, period: &str, e: PeriodError) -> Self {
        Self {
            index,
            period: period.to_string(),
            reason: e.to_string(),
            code: e.code(),
        }
    }
}

fn of_group<'a>(
    assignments: &'a [Assignment],
    group: &'a str,
) -> impl Iterator<Item = (usize, &'a Assignment)> + 'a {
    assignments
        .iter()
        .enumerate()
        .filter(move |(_, a)| a.group == group)
}

/// Places the selected group's assignments into their cells, in input order.
/// Records whose period does not decode are left out.
pub fn build_calendar(
    layout: &WeekLayout,
    assignments: &[Assignment],
    selected_group: &str,
) -> CalendarGrid {
    let mut grid = CalendarGrid::empty(layout);
    for (_, item) in of_group(assignments, selected_group) {
        if let Ok(DaySlot { day, slot }) = layout.decode(&item.period) {
            grid.cells[day][slot].push(item.clone());
        }
    }
    grid
}

/// The selected group's records that `build_calendar` leaves out.
pub fn skipped_assignments(
    layout: &WeekLayout,
    assignments: &[Assignment],
    selected_group: &str,
) -> Vec<SkippedAssignment> {
    of_group(assignments, selected_group)
        .filter_map(|(index, item)| {
            layout
                .decode(&item.period)
                .err()
                .map(|e| SkippedAssignment::new(index, &item.period, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(group: &str, period: &str, subject: &str) -> Assignment {
        Assignment {
            group: group.into(),
            subject: subject.into(),
            teacher: "Mme Camila".into(),
            room: "A".into(),
            period: period.into(),
            modality: MODALITY_IN_PERSON.into(),
        }
    }

    #[test]
    fn empty_input_gives_full_empty_grid() {
        let layout = WeekLayout::default();
        let grid = build_calendar(&layout, &[], "DIA1");
        assert_eq!(grid.day_count(), 5);
        assert_eq!(grid.slots_per_day(), 4);
        assert_eq!(grid.iter_cells().count(), 20);
        assert_eq!(grid.assignment_count(), 0);
    }

    #[test]
    fn end_to_end_example_places_two_courses() {
        let layout = WeekLayout::default();
        let input = vec![
            Assignment {
                group: "DIA1".into(),
                period: "Période 1".into(),
                subject: "Maths CM".into(),
                teacher: "Mme Camila".into(),
                room: "A".into(),
                modality: "présentiel".into(),
            },
            Assignment {
                group: "DIA1".into(),
                period: "Période 5".into(),
                subject: "Physique CM".into(),
                teacher: "Mr Boyer".into(),
                room: "B".into(),
                modality: "distanciel".into(),
            },
        ];
        let grid = build_calendar(&layout, &input, "DIA1");

        assert_eq!(grid.cell(0, 0), &input[0..1]);
        assert_eq!(grid.cell(1, 0), &input[1..2]);
        let non_empty = grid.iter_cells().filter(|(_, c)| !c.is_empty()).count();
        assert_eq!(non_empty, 2);
        assert!(grid.cell(0, 0)[0].is_in_person());
        assert!(!grid.cell(1, 0)[0].is_in_person());
    }

    #[test]
    fn other_groups_are_filtered_out() {
        let layout = WeekLayout::default();
        let input = vec![
            assignment("A", "Période 1", "Maths CM"),
            assignment("B", "Période 1", "Maths TD"),
            assignment("B", "Période 2", "Physique TD"),
            assignment("A", "Période 3", "Physique CM"),
        ];
        let grid = build_calendar(&layout, &input, "A");
        assert!(grid
            .iter_cells()
            .all(|(_, c)| c.iter().all(|a| a.group == "A")));
        assert_eq!(grid.assignment_count(), 2);
        assert!(skipped_assignments(&layout, &input, "A").is_empty());
    }

    #[test]
    fn same_cell_keeps_input_order() {
        let layout = WeekLayout::default();
        let input = vec![
            assignment("A", "Période 7", "first"),
            assignment("B", "Période 7", "other"),
            assignment("A", "Période 7", "second"),
            assignment("A", "Période 7", "third"),
        ];
        let grid = build_calendar(&layout, &input, "A");
        let subjects: Vec<&str> = grid.cell(1, 2).iter().map(|a| a.subject.as_str()).collect();
        assert_eq!(subjects, vec!["first", "second", "third"]);
    }

    #[test]
    fn malformed_periods_are_skipped_not_fatal() {
        let layout = WeekLayout::default();
        let input = vec![
            assignment("A", "Période 1", "s1"),
            assignment("A", "Période 99", "bad"),
            assignment("A", "Période 2", "s2"),
            assignment("A", "Période 3", "s3"),
            assignment("A", "Période 20", "s4"),
        ];
        let grid = build_calendar(&layout, &input, "A");
        assert_eq!(grid.assignment_count(), 4);
        assert!(grid
            .iter_cells()
            .all(|(_, c)| c.iter().all(|a| a.subject != "bad")));
        let skipped = skipped_assignments(&layout, &input, "A");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].index, 1);
        assert_eq!(skipped[0].code, "period_out_of_range");
    }

    #[test]
    fn unparsable_period_of_other_group_is_not_reported() {
        let layout = WeekLayout::default();
        let input = vec![
            assignment("A", "garbage", "x"),
            assignment("B", "", "y"),
        ];
        assert_eq!(build_calendar(&layout, &input, "A").assignment_count(), 0);
        let skipped = skipped_assignments(&layout, &input, "A");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].code, "unparsable_period");
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let layout = WeekLayout::default();
        let input = vec![
            assignment("A", "Période 4", "s1"),
            assignment("A", "Période 9", "s2"),
        ];
        assert_eq!(
            build_calendar(&layout, &input, "A"),
            build_calendar(&layout, &input, "A")
        );
    }

    #[test]
    fn missing_fields_deserialize_as_empty() {
        let a: Assignment =
            serde_json::from_value(serde_json::json!({ "group": "DIA1", "period": "Période 2" }))
                .expect("parse assignment");
        assert_eq!(a.subject, "");
        assert!(!a.is_in_person());
    }

    #[test]
    fn non_string_fields_are_read_as_text() {
        let a: Assignment = serde_json::from_value(serde_json::json!({
            "group": "DIA2", "subject": "Maths TD", "teacher": null,
            "room": null, "period": 7, "modality": true
        }))
        .expect("parse assignment");
        assert_eq!(a.teacher, "");
        assert_eq!(a.room, "");
        assert_eq!(a.period, "7");
        assert_eq!(a.modality, "true");

        let layout = WeekLayout::default();
        let skipped = skipped_assignments(&layout, &[a], "DIA2");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].code, "unparsable_period");
    }
}
