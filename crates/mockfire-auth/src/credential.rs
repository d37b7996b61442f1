use serde::{Deserialize, Serialize};

/// Credentials handed to a credential sign-in handler.
///
/// These are plain tagged values. Nothing here is verified; the handler
/// decides which identity a credential maps to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "providerId")]
pub enum AuthCredential {
    #[serde(rename = "password")]
    EmailPassword { email: String, password: String },

    #[serde(rename = "google.com", rename_all = "camelCase")]
    Google {
        id_token: Option<String>,
        access_token: Option<String>,
    },

    #[serde(rename = "facebook.com", rename_all = "camelCase")]
    Facebook { access_token: String },

    #[serde(rename = "twitter.com")]
    Twitter { token: String, secret: String },

    #[serde(rename = "github.com", rename_all = "camelCase")]
    GitHub { access_token: String },
}

impl AuthCredential {
    /// The provider id, e.g. `"password"` or `"google.com"`.
    pub fn provider_id(&self) -> &'static str {
        match self {
            Self::EmailPassword { .. } => "password",
            Self::Google { .. } => "google.com",
            Self::Facebook { .. } => "facebook.com",
            Self::Twitter { .. } => "twitter.com",
            Self::GitHub { .. } => "github.com",
        }
    }

    pub fn email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::EmailPassword {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn google(id_token: Option<String>, access_token: Option<String>) -> Self {
        Self::Google {
            id_token,
            access_token,
        }
    }

    pub fn facebook(access_token: impl Into<String>) -> Self {
        Self::Facebook {
            access_token: access_token.into(),
        }
    }

    pub fn twitter(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Twitter {
            token: token.into(),
            secret: secret.into(),
        }
    }

    pub fn github(access_token: impl Into<String>) -> Self {
        Self::GitHub {
            access_token: access_token.into(),
        }
    }
}
