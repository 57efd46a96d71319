//! Auth-state consumption.
//!
//! Sign-in and token handling live in an external collaborator. This layer
//! only consumes a push-based "current signed-in identity" stream, read-only,
//! to scope queries by user. The producer half exists so the embedding
//! application (or a test) can drive the stream.

use tokio::sync::watch;

/// The signed-in identity, as far as this layer cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub uid: String,
    pub display_name: Option<String>,
}

/// Read-only handle on the identity stream.
#[derive(Debug, Clone)]
pub struct AuthState {
    rx: watch::Receiver<Option<CurrentUser>>,
}

impl AuthState {
    pub fn current(&self) -> Option<CurrentUser> {
        self.rx.borrow().clone()
    }

    pub fn uid(&self) -> Option<String> {
        self.rx.borrow().as_ref().map(|user| user.uid.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Completes when the signed-in identity changes. Returns `false` once
    /// the producer is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Producer half, owned by the auth collaborator.
#[derive(Debug)]
pub struct AuthController {
    tx: watch::Sender<Option<CurrentUser>>,
}

impl AuthController {
    pub fn sign_in(&self, user: CurrentUser) {
        let _ = self.tx.send(Some(user));
    }

    pub fn sign_out(&self) {
        let _ = self.tx.send(None);
    }

    pub fn state(&self) -> AuthState {
        AuthState {
            rx: self.tx.subscribe(),
        }
    }
}

/// Creates a connected producer/consumer pair, signed out initially.
pub fn auth_channel() -> (AuthController, AuthState) {
    let (tx, rx) = watch::channel(None);
    (AuthController { tx }, AuthState { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identity_stream() {
        let (controller, state) = auth_channel();
        assert!(!state.is_signed_in());
        assert!(state.uid().is_none());

        controller.sign_in(CurrentUser {
            uid: "u-1".to_string(),
            display_name: Some("Rita".to_string()),
        });
        assert_eq!(state.uid().as_deref(), Some("u-1"));

        controller.sign_out();
        assert!(state.current().is_none());
    }

    #[tokio::test]
    async fn test_changed_wakes_on_new_identity() {
        let (controller, mut state) = auth_channel();
        controller.sign_in(CurrentUser {
            uid: "u-2".to_string(),
            display_name: None,
        });
        assert!(state.changed().await);
        assert_eq!(state.uid().as_deref(), Some("u-2"));
    }
}
