use serde::{Deserialize, Serialize};

/// What a free-form user message is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Create,
    Modify,
    Chat,
}

const MODIFY_KEYWORDS: &[&str] = &[
    "añade", "agrega", "añadir", "agregar", "add",
    "modifica", "modificar", "modify", "cambiar", "change",
    "elimina", "eliminar", "delete", "remove", "quitar",
    "actualiza", "actualizar", "update", "relación", "relacion",
];

const CREATE_KEYWORDS: &[&str] = &[
    "crea", "crear", "create", "generar", "generate",
    "diseña", "diseñar", "design", "sistema", "diagrama",
];

/// Keyword routing. Without a diagram everything is a creation; edit verbs
/// win over creation verbs; anything else is conversation.
pub fn detect_user_intent(message: &str, has_current_diagram: bool) -> Intent {
    if !has_current_diagram {
        return Intent::Create;
    }
    let lower = message.to_lowercase();
    if MODIFY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Intent::Modify
    } else if CREATE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Intent::Create
    } else {
        Intent::Chat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_diagram_means_create() {
        assert_eq!(detect_user_intent("hola", false), Intent::Create);
    }

    #[test]
    fn edit_verbs_win() {
        assert_eq!(detect_user_intent("Agrega la clase Pago al sistema", true), Intent::Modify);
        assert_eq!(detect_user_intent("ELIMINA la relación", true), Intent::Modify);
        assert_eq!(detect_user_intent("Diseña un sistema de ventas", true), Intent::Create);
        assert_eq!(detect_user_intent("¿qué es una composición?", true), Intent::Chat);
    }
}
