//! Admin token check
//!
//! The token is a provider-scoped shared secret set once at construction.
//! Comparison is a plain byte equality: it is not constant-time and leaks
//! timing information, so deployments exposed to untrusted networks should
//! front the provider with a proper authentication layer.

/// Token gating administrative operations of one provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminToken(Option<String>);

impl AdminToken {
    /// An empty string disables the check, same as `None`
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.is_empty()))
    }

    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    /// Check a token supplied by an admin
    pub fn check(&self, supplied: Option<&str>) -> bool {
        check_token(self.0.as_deref(), supplied)
    }
}

/// Authorized iff no token is configured or the supplied one is byte-equal
pub fn check_token(configured: Option<&str>, supplied: Option<&str>) -> bool {
    match configured {
        None => true,
        Some(expected) => supplied.map_or(false, |s| s.as_bytes() == expected.as_bytes()),
    }
}
