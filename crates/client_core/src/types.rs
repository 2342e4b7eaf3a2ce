use shared::domain::{FormInput, Patient, Prediction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    Success,
    #[default]
    Info,
    Error,
}

/// The single status line shown to the user, tagged with how it should be styled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Result of the one-shot reachability probe, kept apart from [`StatusMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiStatus {
    #[default]
    Checking,
    Connected,
    RespondedWithError,
    Unreachable,
}

impl ApiStatus {
    pub fn text(self) -> &'static str {
        match self {
            ApiStatus::Checking => "Checking...",
            ApiStatus::Connected => "API connected successfully",
            ApiStatus::RespondedWithError => "API responded with error",
            ApiStatus::Unreachable => "Could not connect to API",
        }
    }
}

/// Everything the controller owns. A fresh value is the state of a newly opened page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub form: FormInput,
    pub token: Option<String>,
    pub status: StatusMessage,
    pub prediction: Option<Prediction>,
    pub patients: Vec<Patient>,
    pub api_status: ApiStatus,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
