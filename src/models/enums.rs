use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unknown string value for a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Doctor => "doctor",
    Admin => "admin",
});

// Message author as displayed by the client.
str_enum!(ChatRole {
    Patient => "patient",
    Agent => "agent",
});

// Message author as stored by the backend. The backend writes `user` for
// patient turns; `patient` is accepted for messages echoed by newer builds.
str_enum!(WireRole {
    User => "user",
    Patient => "patient",
    Agent => "agent",
    System => "system",
});

impl WireRole {
    /// Display role for a stored message. `user` is shown as `patient`;
    /// system turns are shown as agent output.
    pub fn to_chat_role(self) -> ChatRole {
        match self {
            Self::User | Self::Patient => ChatRole::Patient,
            Self::Agent | Self::System => ChatRole::Agent,
        }
    }
}

str_enum!(ReviewStatus {
    Approved => "approved",
    Rejected => "rejected",
});

// Client-side delivery state of a chat message.
str_enum!(Delivery {
    Sent => "sent",
    Pending => "pending",
    Failed => "failed",
});

impl Default for Delivery {
    fn default() -> Self {
        Self::Sent
    }
}

/// Coarse urgency groups used by the doctor dashboard filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyBucket {
    Critical,
    Routine,
    Other,
}

/// Urgency label attached to a diagnostic or report.
///
/// The diagnosis engine emits `emergency | critical | routine`, but older
/// reports carry `urgent`, `high`, `normal` or `low`, in any letter case.
/// Unrecognised labels are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UrgencyLevel {
    Emergency,
    Critical,
    Urgent,
    High,
    Routine,
    Normal,
    Low,
    Other(String),
}

impl UrgencyLevel {
    /// Case-insensitive parse; never fails. An empty label reads as routine.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "emergency" => Self::Emergency,
            "critical" => Self::Critical,
            "urgent" => Self::Urgent,
            "high" => Self::High,
            "routine" | "" => Self::Routine,
            "normal" => Self::Normal,
            "low" => Self::Low,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Emergency => "emergency",
            Self::Critical => "critical",
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Routine => "routine",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Other(label) => label,
        }
    }

    pub fn bucket(&self) -> UrgencyBucket {
        match self {
            Self::Emergency | Self::Critical | Self::Urgent | Self::High => UrgencyBucket::Critical,
            Self::Routine | Self::Normal | Self::Low => UrgencyBucket::Routine,
            Self::Other(_) => UrgencyBucket::Other,
        }
    }

    /// Human label, as the urgency badge shows it.
    pub fn label(&self) -> String {
        let raw = self.as_str();
        let mut chars = raw.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl Default for UrgencyLevel {
    fn default() -> Self {
        Self::Routine
    }
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UrgencyLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UrgencyLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| Self::parse(&s)).unwrap_or_default())
    }
}
