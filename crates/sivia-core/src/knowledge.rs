use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Topic key → canned answer. Serialized as a flat JSON object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeBase {
    entries: BTreeMap<String, String>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries shipped with the assistant, used when nothing is persisted yet.
    pub fn builtin() -> Self {
        let entries = [
            (
                "planes_ce",
                "🏛️ **Planes del Centro de Estudiantes:**\n\n⚠️ Aún no se han cargado planes oficiales.",
            ),
            (
                "ce_presidente",
                "🏛️ **Presidente:** Solo pueden postularse estudiantes de los cursos superiores.",
            ),
            (
                "ce_funciones",
                "🎯 **Funciones del Centro:** Representamos a los alumnos, organizamos eventos y gestionamos el kiosco.",
            ),
            (
                "kiosco_pago",
                "💳 **Kiosco - Pago:** Consultar en el lugar los métodos aceptados.",
            ),
            (
                "kiosco_productos",
                "🛍️ **Kiosco - Productos:** Útiles, snacks y bebidas básicas.",
            ),
        ];
        entries.into_iter().collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or replace an entry. Returns the previous answer, if any.
    pub fn insert(&mut self, key: &str, answer: &str) -> Option<String> {
        self.entries.insert(key.to_string(), answer.to_string())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pretty JSON, non-ASCII kept as-is.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KnowledgeBase {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entries() {
        let kb = KnowledgeBase::builtin();
        assert_eq!(kb.len(), 5);
        assert!(kb.get("kiosco_pago").unwrap().contains("Kiosco"));
    }

    #[test]
    fn test_json_is_flat_object() {
        let kb: KnowledgeBase = [("a", "uno")].into_iter().collect();
        let value: serde_json::Value = serde_json::from_str(&kb.to_json().unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"a": "uno"}));
    }

    #[test]
    fn test_non_ascii_not_escaped() {
        let kb: KnowledgeBase = [("saludo", "¡Hola, niño! 🎯")].into_iter().collect();
        let json = kb.to_json().unwrap();
        assert!(json.contains("¡Hola, niño! 🎯"));
    }

    #[test]
    fn test_json_roundtrip() {
        let kb = KnowledgeBase::builtin();
        let back = KnowledgeBase::from_json(&kb.to_json().unwrap()).unwrap();
        assert_eq!(back, kb);
    }

    #[test]
    fn test_insert_replaces() {
        let mut kb = KnowledgeBase::new();
        assert!(kb.insert("k", "v1").is_none());
        assert_eq!(kb.insert("k", "v2").as_deref(), Some("v1"));
        assert_eq!(kb.len(), 1);
        assert_eq!(kb.remove("k").as_deref(), Some("v2"));
        assert!(kb.is_empty());
    }
}
