use serde::{Deserialize, Serialize};

use crate::models::{Activity, Level, Pillar};

/// Conjunctive filter over saved activities. Unset fields match everything;
/// text comparisons ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityFilter {
    /// Whole subject name
    pub subject: Option<String>,
    pub pillar: Option<Pillar>,
    pub level: Option<Level>,
    /// Substring of the topic
    pub topic: Option<String>,
    /// Substring of the title or description
    pub query: Option<String>,
}

impl ActivityFilter {
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_pillar(mut self, pillar: Pillar) -> Self {
        self.pillar = Some(pillar);
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        let subject = non_blank(self.subject.as_deref())
            .is_none_or(|s| activity.subject.trim().to_lowercase() == s.trim().to_lowercase());
        let pillar = self.pillar.is_none_or(|p| activity.pillar == p);
        let level = self.level.is_none_or(|l| activity.level == l);
        let topic = contains_folded(&activity.topic, self.topic.as_deref());
        let query = match non_blank(self.query.as_deref()) {
            None => true,
            Some(q) => {
                contains_folded(activity.title(), Some(q))
                    || contains_folded(activity.description(), Some(q))
            }
        };
        subject && pillar && level && topic && query
    }

    pub fn apply<'a>(&self, activities: &'a [Activity]) -> Vec<&'a Activity> {
        activities.iter().filter(|a| self.matches(a)).collect()
    }
}

/// Distinct subjects in first-seen order.
pub fn available_subjects(activities: &[Activity]) -> Vec<String> {
    let mut subjects: Vec<String> = Vec::new();
    for activity in activities {
        if !subjects.contains(&activity.subject) {
            subjects.push(activity.subject.clone());
        }
    }
    subjects
}

fn non_blank(needle: Option<&str>) -> Option<&str> {
    needle.filter(|n| !n.trim().is_empty())
}

fn contains_folded(haystack: &str, needle: Option<&str>) -> bool {
    match non_blank(needle) {
        None => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}
