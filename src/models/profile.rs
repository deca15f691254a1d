use serde::{Deserialize, Serialize};

use super::enums::Role;

/// Application identity returned by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub sub: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
}

impl Profile {
    /// A patient without age or sex must finish onboarding before using
    /// any other page. Zero age and blank sex count as missing.
    pub fn is_incomplete(&self) -> bool {
        if self.role != Role::Patient {
            return false;
        }
        let has_age = self.age.is_some_and(|age| age > 0);
        let has_sex = self.sex.as_deref().is_some_and(|sex| !sex.trim().is_empty());
        !(has_age && has_sex)
    }

    /// Overwrite every field present in `update`.
    pub fn merge(&mut self, update: &ProfileUpdate) {
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(patient_id) = &update.patient_id {
            self.patient_id = Some(patient_id.clone());
        }
        if let Some(name) = &update.name {
            self.name = Some(name.clone());
        }
        if let Some(age) = update.age {
            self.age = Some(age);
        }
        if let Some(sex) = &update.sex {
            self.sex = Some(sex.clone());
        }
    }

    /// Display name, falling back to the local part of the email.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

/// Partial profile change. Also the body of `PUT /patients/{id}/profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
}

impl ProfileUpdate {
    /// Demographics collected by the onboarding form.
    pub fn demographics(name: &str, age: u32, sex: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            age: Some(age),
            sex: Some(sex.to_string()),
            ..Self::default()
        }
    }
}

/// Body of `POST /auth/google/verify`.
///
/// A bare `id_token` is a login attempt. Supplying `role` (and, for
/// patients, demographics) registers the identity during onboarding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub id_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
}

impl LoginRequest {
    pub fn new(id_token: impl Into<String>) -> Self {
        Self {
            id_token: id_token.into(),
            ..Self::default()
        }
    }

    /// Registration variant sent from the onboarding flow.
    pub fn onboarding(id_token: impl Into<String>, role: Role, update: &ProfileUpdate) -> Self {
        Self {
            id_token: id_token.into(),
            role: Some(role),
            name: update.name.clone(),
            age: update.age,
            sex: update.sex.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub jwt: String,
    pub profile: Profile,
}

/// Body of `PUT /doctor/profile`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DoctorProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(age: Option<u32>, sex: Option<&str>) -> Profile {
        Profile {
            sub: "u1".into(),
            email: "ada@example.com".into(),
            role: Role::Patient,
            patient_id: Some("p1".into()),
            name: None,
            age,
            sex: sex.map(String::from),
        }
    }

    #[test]
    fn complete_patient_is_not_incomplete() {
        assert!(!patient(Some(34), Some("F")).is_incomplete());
    }

    #[test]
    fn patient_missing_demographics_is_incomplete() {
        assert!(patient(None, Some("F")).is_incomplete());
        assert!(patient(Some(34), None).is_incomplete());
        assert!(patient(Some(0), Some("F")).is_incomplete());
        assert!(patient(Some(34), Some("  ")).is_incomplete());
    }

    #[test]
    fn doctor_never_incomplete() {
        let mut doctor = patient(None, None);
        doctor.role = Role::Doctor;
        assert!(!doctor.is_incomplete());
    }

    #[test]
    fn merge_only_touches_present_fields() {
        let mut profile = patient(None, None);
        profile.name = Some("Ada".into());
        profile.merge(&ProfileUpdate {
            age: Some(40),
            sex: Some("F".into()),
            ..ProfileUpdate::default()
        });
        assert_eq!(profile.age, Some(40));
        assert_eq!(profile.sex.as_deref(), Some("F"));
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert!(!profile.is_incomplete());
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let profile = patient(None, None);
        assert_eq!(profile.display_name(), "ada");
    }

    #[test]
    fn profile_parses_backend_shape() {
        let json = r#"{"sub":"abc","role":"patient","patient_id":null,"email":"a@b.c","name":"A","age":null,"sex":null}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.role, Role::Patient);
        assert!(profile.patient_id.is_none());
        assert!(profile.is_incomplete());
    }

    #[test]
    fn login_request_omits_absent_fields() {
        let body = serde_json::to_value(LoginRequest::new("tok")).unwrap();
        assert_eq!(body, serde_json::json!({ "id_token": "tok" }));

        let onboarding = LoginRequest::onboarding(
            "tok",
            Role::Patient,
            &ProfileUpdate::demographics("Ada", 34, "F"),
        );
        let body = serde_json::to_value(onboarding).unwrap();
        assert_eq!(body["role"], "patient");
        assert_eq!(body["age"], 34);
    }
}
