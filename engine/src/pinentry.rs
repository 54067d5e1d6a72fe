//! Passphrase and confirmation prompts.

/// Source of passphrases and confirmations for engine operations.
///
/// Returning `None` from [`Pinentry::passphrase`] or `false` from
/// [`Pinentry::confirm`] cancels the operation that asked.
pub trait Pinentry: Send + Sync {
    /// Ask for the passphrase described by `description`.
    fn passphrase(&self, description: &str) -> Option<String>;

    /// Ask the user to confirm `description`.
    fn confirm(&self, description: &str) -> bool {
        let _ = description;
        false
    }
}

/// A pinentry with a fixed answer, for batch use.
#[derive(Debug, Clone)]
pub struct FixedPinentry {
    passphrase: Option<String>,
    confirm: bool,
}

impl FixedPinentry {
    /// Answer every passphrase prompt with `passphrase` and confirm everything.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Some(passphrase.into()),
            confirm: true,
        }
    }

    /// Decline every prompt.
    pub fn declining() -> Self {
        Self {
            passphrase: None,
            confirm: false,
        }
    }

    /// Override the answer to confirmation prompts.
    pub fn with_confirm(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }
}

impl Pinentry for FixedPinentry {
    fn passphrase(&self, _description: &str) -> Option<String> {
        self.passphrase.clone()
    }

    fn confirm(&self, _description: &str) -> bool {
        self.confirm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl Pinentry for Silent {
        fn passphrase(&self, _description: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_fixed_pinentry() {
        let pinentry = FixedPinentry::new("secret");
        assert_eq!(pinentry.passphrase("unlock").as_deref(), Some("secret"));
        assert!(pinentry.confirm("delete"));

        let pinentry = FixedPinentry::new("secret").with_confirm(false);
        assert!(!pinentry.confirm("delete"));

        let pinentry = FixedPinentry::declining();
        assert!(pinentry.passphrase("unlock").is_none());
    }

    #[test]
    fn test_confirm_defaults_to_decline() {
        assert!(!Silent.confirm("delete"));
    }
}
