use std::fmt::Write as _;

use crate::{
    error::{Error, Result},
    models::Activity,
};

pub const DOCUMENT_TITLE: &str = "Plano de Atividades Gerado por IA";
/// File name suggested when writing the export to disk.
pub const DEFAULT_FILE_NAME: &str = "atividades-bncc.md";

/// Printable rendering of a list of activities, in list order.
pub fn to_markdown(activities: &[Activity]) -> Result<String> {
    if activities.is_empty() {
        return Err(Error::NothingToExport);
    }

    let mut out = format!("# {DOCUMENT_TITLE}\n");
    for (index, activity) in activities.iter().enumerate() {
        if index > 0 {
            out.push_str("\n---\n");
        }
        render_activity(&mut out, activity);
    }
    Ok(out)
}

fn render_activity(out: &mut String, activity: &Activity) {
    let generated = &activity.generated;
    // Writing into a String cannot fail.
    let _ = writeln!(out, "\n## {}\n", generated.title.trim());
    let _ = writeln!(
        out,
        "*{} | Turma: {} | Nível: {} | Pilar: {} | Duração: {} min*",
        activity.subject, activity.grade, activity.level, activity.pillar, generated.estimated_duration
    );

    section(out, "Descrição da Atividade", generated.description.trim());
    section(out, "Competência BNCC", generated.bncc_competency.trim());
    section(
        out,
        "Competência BNCC Computação",
        generated.bncc_computing_competency.trim(),
    );

    let _ = writeln!(out, "\n### Recursos Necessários\n");
    if generated.required_resources.is_empty() {
        out.push_str("- (nenhum)\n");
    }
    for resource in &generated.required_resources {
        let _ = writeln!(out, "- {}", resource.trim());
    }
}

fn section(out: &mut String, heading: &str, body: &str) {
    let _ = writeln!(out, "\n### {heading}\n\n{body}");
}
