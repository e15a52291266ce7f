//! Start screen: display name, background color and anonymous sign-in.

use serde::{Deserialize, Serialize};

use crate::auth::IdentityProvider;
use crate::models::Author;

pub const COLOR_OPTIONS: [&str; 4] = ["#3D2C8D", "#0C134F", "#183D3D", "#A21232"];
pub const DEFAULT_COLOR: &str = COLOR_OPTIONS[0];

pub const SIGNED_IN_NOTICE: &str = "Signed in Successfully!";
pub const SIGN_IN_FAILED_NOTICE: &str = "Unable to sign in, try again later.";

/// Surface for transient user-visible messages.
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Values collected on the start screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartForm {
    pub display_name: String,
    pub color: String,
}

impl StartForm {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            color: DEFAULT_COLOR.to_string(),
        }
    }

    /// Pick a palette color. Matching ignores case; unknown values are
    /// rejected.
    pub fn with_color(mut self, color: &str) -> crate::Result<Self> {
        let color = COLOR_OPTIONS
            .iter()
            .find(|option| option.eq_ignore_ascii_case(color.trim()))
            .ok_or_else(|| {
                crate::Error::InvalidInput(format!(
                    "Unknown color {color}; expected one of {}",
                    COLOR_OPTIONS.join(", ")
                ))
            })?;
        self.color = (*color).to_string();
        Ok(self)
    }
}

/// Parameters handed to the chat screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoute {
    pub user_id: String,
    pub background_color: String,
    pub display_name: String,
}

impl ChatRoute {
    pub fn author(&self) -> Author {
        Author::new(self.user_id.clone(), self.display_name.clone())
    }
}

/// Sign in anonymously and build the chat route. Failure leaves the caller on
/// the start screen.
pub async fn start_chat<I, N>(identity: &I, form: &StartForm, notifier: &N) -> Option<ChatRoute>
where
    I: IdentityProvider,
    N: Notifier + ?Sized,
{
    match identity.sign_in_anonymously().await {
        Ok(user) => {
            notifier.notify(SIGNED_IN_NOTICE);
            Some(ChatRoute {
                user_id: user.id,
                background_color: form.color.clone(),
                display_name: form.display_name.clone(),
            })
        }
        Err(error) => {
            tracing::error!("Anonymous sign-in failed: {}", error);
            notifier.notify(SIGN_IN_FAILED_NOTICE);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, AuthResult, AuthUser};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeIdentity {
        result: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl IdentityProvider for FakeIdentity {
        async fn sign_in_anonymously(&self) -> AuthResult<AuthUser> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result {
                Some(id) => Ok(AuthUser {
                    id: id.to_string(),
                    is_anonymous: true,
                }),
                None => Err(AuthError::Api("unavailable".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<String>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn form_defaults_to_first_palette_color() {
        assert_eq!(StartForm::new("Ada").color, "#3D2C8D");
        assert_eq!(
            StartForm::new("Ada").with_color("#a21232").unwrap().color,
            "#A21232"
        );
        assert!(StartForm::new("Ada").with_color("#FFFFFF").is_err());
    }

    #[tokio::test]
    async fn successful_sign_in_routes_to_chat() {
        let identity = FakeIdentity {
            result: Some("anon-7"),
            calls: AtomicUsize::new(0),
        };
        let notifier = RecordingNotifier::default();
        let form = StartForm::new("Ada").with_color("#183D3D").unwrap();

        let route = start_chat(&identity, &form, &notifier).await;

        assert_eq!(
            route,
            Some(ChatRoute {
                user_id: "anon-7".to_string(),
                background_color: "#183D3D".to_string(),
                display_name: "Ada".to_string(),
            })
        );
        assert_eq!(*notifier.0.lock().unwrap(), vec![SIGNED_IN_NOTICE]);
    }

    #[tokio::test]
    async fn failed_sign_in_stays_on_start_without_retry() {
        let identity = FakeIdentity {
            result: None,
            calls: AtomicUsize::new(0),
        };
        let notifier = RecordingNotifier::default();

        let route = start_chat(&identity, &StartForm::new("Ada"), &notifier).await;

        assert!(route.is_none());
        assert_eq!(identity.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*notifier.0.lock().unwrap(), vec![SIGN_IN_FAILED_NOTICE]);
    }

    #[test]
    fn route_serializes_camel_case() {
        let route = ChatRoute {
            user_id: "u".to_string(),
            background_color: DEFAULT_COLOR.to_string(),
            display_name: "Ada".to_string(),
        };
        let value = serde_json::to_value(&route).unwrap();
        assert_eq!(value["userId"], "u");
        assert_eq!(value["backgroundColor"], "#3D2C8D");
        assert_eq!(route.author().display_name, "Ada");
    }
}
