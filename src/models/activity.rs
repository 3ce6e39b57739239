use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use crate::models::form::{FormConfiguration, Level, Pillar};

/// One lesson plan as returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedActivity {
    #[serde(rename = "titulo")]
    pub title: String,

    /// Markdown body with the four mandatory sections
    #[serde(rename = "descricao")]
    pub description: String,

    #[serde(rename = "competenciaBNCC")]
    pub bncc_competency: String,

    #[serde(rename = "competenciaBNCCComputacao")]
    pub bncc_computing_competency: String,

    /// Minutes
    #[serde(rename = "duracaoEstimada", deserialize_with = "deserialize_minutes")]
    pub estimated_duration: u32,

    #[serde(rename = "recursosNecessarios")]
    pub required_resources: Vec<String>,
}

/// A generated activity after the consumer gave it an identity and merged the
/// form it was generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,

    #[serde(flatten)]
    pub generated: GeneratedActivity,

    pub subject: String,
    pub topic: String,
    pub grade: String,
    pub level: Level,
    pub pillar: Pillar,

    #[serde(default = "chrono::Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn from_generated(generated: GeneratedActivity, form: &FormConfiguration) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            generated,
            subject: form.subject.clone(),
            topic: form.topic.clone(),
            grade: form.grade.clone(),
            level: form.level,
            pillar: form.pillar,
            created_at: Utc::now(),
        }
    }

    pub fn title(&self) -> &str {
        &self.generated.title
    }

    pub fn description(&self) -> &str {
        &self.generated.description
    }
}

// Models regularly quote integers ("45") or emit floats (45.0).
fn deserialize_minutes<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let minutes = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s
            .trim()
            .trim_end_matches("minutos")
            .trim_end_matches("min")
            .trim()
            .parse::<u64>()
            .ok(),
        _ => None,
    };
    minutes
        .and_then(|m| u32::try_from(m).ok())
        .ok_or_else(|| de::Error::custom(format!("invalid duration in minutes: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity_json(duration: Value) -> Value {
        serde_json::json!({
            "titulo": "Receita de bolo",
            "descricao": "texto",
            "competenciaBNCC": "EF06MA07",
            "competenciaBNCCComputacao": "EF06CO01",
            "duracaoEstimada": duration,
            "recursosNecessarios": ["quadro"]
        })
    }

    #[test]
    fn duration_accepts_numbers_and_numeric_strings() {
        for raw in [serde_json::json!(50), serde_json::json!(50.0), serde_json::json!("50 min")] {
            let parsed: GeneratedActivity = serde_json::from_value(activity_json(raw)).unwrap();
            assert_eq!(parsed.estimated_duration, 50);
        }
    }

    #[test]
    fn negative_duration_is_rejected() {
        let parsed = serde_json::from_value::<GeneratedActivity>(activity_json(serde_json::json!(-5)));
        assert!(parsed.is_err());
    }

    #[test]
    fn activity_flattens_generated_fields() {
        let generated: GeneratedActivity =
            serde_json::from_value(activity_json(serde_json::json!(30))).unwrap();
        let activity = Activity::from_generated(generated, &FormConfiguration::default());
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["titulo"], "Receita de bolo");
        assert_eq!(value["subject"], "Matemática");
        assert_eq!(value["pillar"], "Algoritmos");
    }
}
