use crate::error::AppError;

/// Who is signed in, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub uid: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            avatar_url: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Profile")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// The provider has not reported yet.
    #[default]
    Pending,
    SignedIn(Profile),
    SignedOut,
}

impl AuthState {
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            AuthState::SignedIn(profile) => Some(profile),
            _ => None,
        }
    }

    /// Gate for favorites and anything else that needs a user.
    pub fn require(&self) -> Result<&Profile, AppError> {
        self.profile().ok_or(AppError::AuthRequired)
    }

    /// Like [`require`](Self::require), but only for the signed-in user
    /// themselves. Anyone else sharing the chat is treated as signed out.
    pub fn require_user(&self, uid: &str) -> Result<&Profile, AppError> {
        match self.require()? {
            profile if profile.uid == uid => Ok(profile),
            _ => Err(AppError::AuthRequired),
        }
    }
}
