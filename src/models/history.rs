use serde::{Deserialize, Serialize};

/// Patient intake form stored at `/patients/{id}/history`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub demographics: Demographics,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub medications: Vec<MedicationEntry>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub surgeries: Vec<String>,
    #[serde(default)]
    pub family_history: Vec<String>,
    #[serde(default)]
    pub social_history: SocialHistory,
    #[serde(default)]
    pub current_symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_incidents: Option<Vec<PastIncident>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: u32,
    /// `M`, `F` or `Other`.
    pub sex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialHistory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alcohol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastIncident {
    pub title: String,
    pub date: String,
    pub description: String,
    /// Upload file ids.
    #[serde(default)]
    pub files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_history_fills_defaults() {
        let json = r#"{"demographics":{"age":52,"sex":"M"},"allergies":["penicillin"]}"#;
        let history: MedicalHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.demographics.age, 52);
        assert_eq!(history.allergies, vec!["penicillin"]);
        assert!(history.medications.is_empty());
        assert!(history.past_incidents.is_none());
    }

    #[test]
    fn optional_fields_are_omitted_on_write() {
        let history = MedicalHistory {
            demographics: Demographics {
                age: 30,
                sex: "F".into(),
                ..Demographics::default()
            },
            ..MedicalHistory::default()
        };
        let json = serde_json::to_value(&history).unwrap();
        assert!(json["demographics"].get("height_cm").is_none());
        assert!(json.get("additional_info").is_none());
    }
}
