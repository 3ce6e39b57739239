use crate::models::FormConfiguration;

pub const NOT_FOUND_SENTINEL: &str = "Não encontrado no material de apoio";

pub const CONTEXT_START: &str = "### CONTEXTO DOS DOCUMENTOS ###";
pub const CONTEXT_END: &str = "### FIM DO CONTEXTO ###";

pub const SECTION_CONTEXT: &str = "Contextualização";
pub const SECTION_OBJECTIVES: &str = "Objetivos de Aprendizagem";
pub const SECTION_STEPS: &str = "Passo a Passo da Atividade";
pub const SECTION_ASSESSMENT: &str = "Avaliação";

pub const REQUIRED_SECTIONS: [&str; 4] = [
    SECTION_CONTEXT,
    SECTION_OBJECTIVES,
    SECTION_STEPS,
    SECTION_ASSESSMENT,
];

pub fn build_system_prompt() -> String {
    "Você é um designer instrucional sênior e especialista em pedagogia, com profundo \
     conhecimento do currículo brasileiro (BNCC e BNCC Computação). Sua missão é criar planos \
     de aula completos, detalhados e prontos para serem aplicados por um professor. Cada plano \
     de aula deve ser criativo, engajador e eficaz. Se um contexto de documentos for fornecido, \
     suas respostas devem ser estritamente baseadas nele."
        .to_string()
}

pub fn build_task_prompt(form: &FormConfiguration) -> String {
    let plans = if form.quantity > 1 {
        "planos de aula detalhados"
    } else {
        "plano de aula detalhado"
    };

    format!(
        r#"Gere {} {} para a disciplina de "{}" sobre o tópico "{}".
As atividades são destinadas a uma turma de "{}" e devem ter um nível de dificuldade "{}".
Cada plano de aula deve obrigatoriamente integrar o pilar do pensamento computacional: "{}"."#,
        form.quantity,
        plans,
        form.subject,
        form.topic,
        form.grade,
        form.level.label(),
        form.pillar.label()
    )
}

/// Wraps retrieved material so the model can tell it apart from instructions.
/// With an empty `context` only the fixed wrapper is returned, which is what
/// the budget calculation needs.
pub fn build_context_block(context: &str) -> String {
    format!(
        "Use estritamente as informações do contexto abaixo como fonte primária para criar as \
         atividades. Não invente informações que não estejam nos documentos fornecidos.\n\n\
         {CONTEXT_START}\n{context}\n{CONTEXT_END}\n\n\
         Com base no contexto acima, elabore a seguinte solicitação:\n"
    )
}

pub fn build_output_contract(quantity: u8, grounded: bool) -> String {
    let citation = if grounded {
        format!(
            "string (copie literalmente do contexto o código e a descrição da competência; se o \
             contexto não contiver uma competência aplicável, use exatamente \"{NOT_FOUND_SENTINEL}\")"
        )
    } else {
        "string (código e descrição completa da competência)".to_string()
    };

    format!(
        r#"Sua resposta DEVE SER APENAS um objeto JSON válido, sem nenhum texto adicional antes ou depois.
A lista "atividades" deve conter exatamente {quantity} {entries}. O JSON deve ter a seguinte estrutura:
{{
  "atividades": [
    {{
      "titulo": "string",
      "descricao": "string (texto longo em Markdown contendo OBRIGATORIAMENTE as seções '**{SECTION_CONTEXT}:**' (introdução ao tema e sua relevância), '**{SECTION_OBJECTIVES}:**' (lista com marcadores), '**{SECTION_STEPS}:**' (instruções sequenciais para professor e alunos) e '**{SECTION_ASSESSMENT}:**' (como avaliar o aprendizado))",
      "competenciaBNCC": "{citation}",
      "competenciaBNCCComputacao": "{citation}",
      "duracaoEstimada": "integer (em minutos)",
      "recursosNecessarios": ["string", "string"]
    }}
  ]
}}"#,
        entries = if quantity > 1 { "entradas" } else { "entrada" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Level, Pillar};

    #[test]
    fn task_prompt_interpolates_every_field() {
        let form = FormConfiguration::new("Matemática", "Frações", "6º Ano", Pillar::Algorithms, Level::Medium, 2);
        let prompt = build_task_prompt(&form);
        assert!(prompt.starts_with("Gere 2 planos de aula detalhados"));
        for needle in ["\"Matemática\"", "\"Frações\"", "\"6º Ano\"", "\"Médio\"", "\"Algoritmos\""] {
            assert!(prompt.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn single_activity_uses_singular() {
        let prompt = build_task_prompt(&FormConfiguration::default());
        assert!(prompt.starts_with("Gere 1 plano de aula detalhado "));
    }

    #[test]
    fn grounded_contract_mentions_sentinel() {
        assert!(build_output_contract(3, true).contains(NOT_FOUND_SENTINEL));
        assert!(!build_output_contract(3, false).contains(NOT_FOUND_SENTINEL));
        assert!(build_output_contract(3, false).contains("exatamente 3 entradas"));
    }

    #[test]
    fn context_block_is_delimited() {
        let block = build_context_block("texto de apoio");
        let start = block.find(CONTEXT_START).unwrap();
        let body = block.find("texto de apoio").unwrap();
        let end = block.find(CONTEXT_END).unwrap();
        assert!(start < body && body < end);
    }
}
