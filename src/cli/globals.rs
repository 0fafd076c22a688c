use secrecy::SecretString;
use std::{fmt, str::FromStr};

/// Deployment environment, gates the one-time admin bootstrap route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            _ => Err(format!("invalid environment: {value}")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Provider credentials shared across the process.
///
/// The service-role key is optional on purpose: its absence is only an error
/// at the moment a privileged call is attempted, never at startup.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub supabase_url: String,
    pub anon_key: String,
    pub service_role_key: Option<SecretString>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(supabase_url: String, anon_key: String) -> Self {
        Self {
            supabase_url,
            anon_key,
            service_role_key: None,
        }
    }

    pub fn set_service_role_key(&mut self, key: SecretString) {
        self.service_role_key = Some(key);
    }
}
