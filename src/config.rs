use crate::week::WeekLayout;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const COURSE_TYPE_LECTURE: &str = "CM";
pub const COURSE_TYPE_TUTORIAL: &str = "TD";

/// Inputs the user fills in before asking for a timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub group_names: Vec<String>,
    pub rooms: Vec<String>,
    pub subjects: Vec<String>,
    pub teachers: Vec<String>,
    pub teacher_specialties: BTreeMap<String, Vec<String>>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            group_names: strings(&["DIA1", "DIA2"]),
            rooms: strings(&["A", "B", "C", "D"]),
            subjects: strings(&["Maths CM", "Maths TD", "Physique CM", "Physique TD"]),
            teachers: strings(&["Mme Camila", "Mr Boyer", "Mme Krika"]),
            teacher_specialties: BTreeMap::new(),
        }
    }
}

/// Body posted to the scheduling service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleRequest {
    pub group_names: Vec<String>,
    pub rooms: Vec<String>,
    pub subjects: Vec<String>,
    pub teachers: Vec<String>,
    pub teacher_specialties: BTreeMap<String, Vec<String>>,
    pub course_type: BTreeMap<String, String>,
    pub periods_per_day: usize,
    pub days_per_week: usize,
}

pub fn course_type(subject: &str) -> &'static str {
    if subject.contains(COURSE_TYPE_LECTURE) {
        COURSE_TYPE_LECTURE
    } else {
        COURSE_TYPE_TUTORIAL
    }
}

impl ScheduleConfig {
    /// Replaces the teacher list, keeping specialties in step with it.
    pub fn set_teachers(&mut self, teachers: Vec<String>) {
        for t in &teachers {
            self.teacher_specialties.entry(t.clone()).or_default();
        }
        self.teacher_specialties.retain(|t, _| teachers.contains(t));
        self.teachers = teachers;
    }

    fn specialties_mut(&mut self, teacher: &str) -> Result<&mut Vec<String>, String> {
        if !self.teachers.iter().any(|t| t == teacher) {
            return Err(format!("unknown teacher: {}", teacher));
        }
        Ok(self
            .teacher_specialties
            .entry(teacher.to_string())
            .or_default())
    }

    pub fn specialties_of(&self, teacher: &str) -> &[String] {
        self.teacher_specialties
            .get(teacher)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn add_specialty(&mut self, teacher: &str, subject: &str) -> Result<(), String> {
        let list = self.specialties_mut(teacher)?;
        if !list.iter().any(|s| s == subject) {
            list.push(subject.to_string());
        }
        Ok(())
    }

    pub fn remove_specialty(&mut self, teacher: &str, subject: &str) -> Result<(), String> {
        let list = self.specialties_mut(teacher)?;
        list.retain(|s| s != subject);
        Ok(())
    }

    /// Returns whether the subject is a specialty after the toggle.
    pub fn toggle_specialty(&mut self, teacher: &str, subject: &str) -> Result<bool, String> {
        let list = self.specialties_mut(teacher)?;
        if let Some(pos) = list.iter().position(|s| s == subject) {
            list.remove(pos);
            Ok(false)
        } else {
            list.push(subject.to_string());
            Ok(true)
        }
    }

    pub fn course_types(&self) -> BTreeMap<String, String> {
        self.subjects
            .iter()
            .map(|s| (s.clone(), course_type(s).to_string()))
            .collect()
    }

    pub fn to_request(&self, layout: &WeekLayout) -> ScheduleRequest {
        ScheduleRequest {
            group_names: self.group_names.clone(),
            rooms: self.rooms.clone(),
            subjects: self.subjects.clone(),
            teachers: self.teachers.clone(),
            teacher_specialties: self.teacher_specialties.clone(),
            course_type: self.course_types(),
            periods_per_day: layout.slots_per_day(),
            days_per_week: layout.day_count(),
        }
    }

    /// SHA-256 over the request body, used to flag plannings made from older inputs.
    pub fn fingerprint(&self, layout: &WeekLayout) -> String {
        let body = serde_json::to_vec(&self.to_request(layout)).unwrap_or_default();
        format!("{:x}", Sha256::digest(&body))
    }
}
