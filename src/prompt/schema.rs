use once_cell::sync::Lazy;
use serde_json::{Value, json};

pub const ACTIVITIES_FIELD: &str = "atividades";

static ACTIVITY_ITEM_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "titulo": { "type": "string" },
            "descricao": { "type": "string" },
            "competenciaBNCC": { "type": "string" },
            "competenciaBNCCComputacao": { "type": "string" },
            "duracaoEstimada": { "type": "integer", "minimum": 0 },
            "recursosNecessarios": {
                "type": "array",
                "items": { "type": "string", "minLength": 1 }
            }
        },
        "required": [
            "titulo",
            "descricao",
            "competenciaBNCC",
            "competenciaBNCCComputacao",
            "duracaoEstimada",
            "recursosNecessarios"
        ],
        "additionalProperties": false
    })
});

/// JSON schema of the whole answer for backends that constrain output.
pub fn activities_schema(quantity: u8) -> Value {
    json!({
        "type": "object",
        "properties": {
            "atividades": {
                "type": "array",
                "items": ACTIVITY_ITEM_SCHEMA.clone(),
                "minItems": 1,
                "maxItems": quantity
            }
        },
        "required": ["atividades"],
        "additionalProperties": false
    })
}
