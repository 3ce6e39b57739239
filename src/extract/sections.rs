use crate::{models::GeneratedActivity, prompt::REQUIRED_SECTIONS};

/// Mandatory description sections that do not appear as a heading-like
/// mention (`**Seção:**`, `## Seção`, or `Seção:`) in the description.
pub fn missing_sections(activity: &GeneratedActivity) -> Vec<&'static str> {
    let description = activity.description.to_lowercase();
    REQUIRED_SECTIONS
        .iter()
        .copied()
        .filter(|section| !mentions_section(&description, &section.to_lowercase()))
        .collect()
}

fn mentions_section(description: &str, section: &str) -> bool {
    description.match_indices(section).any(|(pos, _)| {
        let after = description[pos + section.len()..].trim_start_matches('*');
        let before = description[..pos].trim_end_matches('*').trim_end_matches(' ');
        after.starts_with(':') || before.ends_with('#')
    })
}
