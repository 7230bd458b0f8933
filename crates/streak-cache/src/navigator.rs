//! Navigation capability

use tokio::sync::watch;
use url::Url;

/// Sends the user back to sign in when the server stops accepting our
/// credentials.
pub trait Navigator: Send + Sync {
    fn redirect_to_sign_in(&self);
}

/// Publishes the sign-in location on a watch channel for whatever owns the
/// user interface to act on.
pub struct SignInRedirect {
    location: Url,
    tx: watch::Sender<Option<Url>>,
}

impl SignInRedirect {
    /// Sign-in lives at the root of the service origin.
    pub fn new(base_url: &Url) -> Self {
        let mut location = base_url.clone();
        location.set_path("/");
        location.set_query(None);
        location.set_fragment(None);

        let (tx, _) = watch::channel(None);
        Self { location, tx }
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Url>> {
        self.tx.subscribe()
    }

    /// Whether a redirect has been requested since creation
    pub fn is_pending(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

impl Navigator for SignInRedirect {
    fn redirect_to_sign_in(&self) {
        tracing::warn!(location = %self.location, "Authentication expired, redirecting to sign-in");
        self.tx.send_replace(Some(self.location.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_targets_origin_root() {
        let base = Url::parse("https://timer.example.com/app/?tab=1").unwrap();
        let navigator = SignInRedirect::new(&base);
        let rx = navigator.subscribe();

        assert!(!navigator.is_pending());
        navigator.redirect_to_sign_in();

        assert!(navigator.is_pending());
        assert_eq!(
            rx.borrow().as_ref().map(Url::as_str),
            Some("https://timer.example.com/")
        );
    }
}
