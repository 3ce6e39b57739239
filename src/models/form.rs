use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

pub const MIN_QUANTITY: u8 = 1;
pub const MAX_QUANTITY: u8 = 5;

/// Computational-thinking pillar every activity must integrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pillar {
    #[serde(rename = "Decomposição")]
    Decomposition,
    #[serde(rename = "Abstração")]
    Abstraction,
    #[serde(rename = "Reconhecimento de Padrões")]
    PatternRecognition,
    #[serde(rename = "Algoritmos")]
    Algorithms,
}

impl Pillar {
    pub const ALL: [Pillar; 4] = [
        Pillar::Decomposition,
        Pillar::Abstraction,
        Pillar::PatternRecognition,
        Pillar::Algorithms,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Pillar::Decomposition => "Decomposição",
            Pillar::Abstraction => "Abstração",
            Pillar::PatternRecognition => "Reconhecimento de Padrões",
            Pillar::Algorithms => "Algoritmos",
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Pillar {
    type Err = GenerationError;

    /// Accepts the Portuguese label or the variant name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Pillar::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(wanted) || format!("{p:?}").eq_ignore_ascii_case(wanted))
            .ok_or_else(|| GenerationError::InvalidForm(format!("unknown pillar: {wanted}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "Fácil")]
    Easy,
    #[serde(rename = "Médio")]
    Medium,
    #[serde(rename = "Difícil")]
    Hard,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Easy, Level::Medium, Level::Hard];

    pub fn label(&self) -> &'static str {
        match self {
            Level::Easy => "Fácil",
            Level::Medium => "Médio",
            Level::Hard => "Difícil",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Level {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Level::ALL
            .into_iter()
            .find(|l| l.label().eq_ignore_ascii_case(wanted) || format!("{l:?}").eq_ignore_ascii_case(wanted))
            .ok_or_else(|| GenerationError::InvalidForm(format!("unknown level: {wanted}")))
    }
}

/// What the educator asked for. Read-only once handed to a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormConfiguration {
    /// Discipline, e.g. "Matemática"
    pub subject: String,

    /// Topic inside the discipline, e.g. "Frações"
    pub topic: String,

    /// Class label, e.g. "6º Ano"
    pub grade: String,

    pub pillar: Pillar,

    pub level: Level,

    /// Number of activities requested, 1..=5
    pub quantity: u8,
}

impl FormConfiguration {
    pub fn new(
        subject: impl Into<String>,
        topic: impl Into<String>,
        grade: impl Into<String>,
        pillar: Pillar,
        level: Level,
        quantity: u8,
    ) -> Self {
        Self {
            subject: subject.into(),
            topic: topic.into(),
            grade: grade.into(),
            pillar,
            level,
            quantity,
        }
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&self.quantity) {
            return Err(GenerationError::InvalidForm(format!(
                "quantity must be between {MIN_QUANTITY} and {MAX_QUANTITY}, got {}",
                self.quantity
            )));
        }
        for (field, value) in [
            ("subject", &self.subject),
            ("topic", &self.topic),
            ("grade", &self.grade),
        ] {
            if value.trim().is_empty() {
                return Err(GenerationError::InvalidForm(format!("{field} is empty")));
            }
        }
        Ok(())
    }
}

impl Default for FormConfiguration {
    fn default() -> Self {
        Self {
            subject: "Matemática".to_owned(),
            topic: "Frações".to_owned(),
            grade: "6º Ano".to_owned(),
            pillar: Pillar::Algorithms,
            level: Level::Medium,
            quantity: 1,
        }
    }
}
