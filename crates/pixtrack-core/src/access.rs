//! Shared-secret access check.
//!
//! One static key gates both the tracking and the stats paths. An empty key
//! disables the check entirely. Comparison is constant-time over the bytes.

use subtle::ConstantTimeEq;

#[derive(Clone, Default)]
pub struct AccessKey {
    secret: Option<String>,
}

impl AccessKey {
    /// Empty `secret` disables access control.
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Some(secret.to_string()).filter(|s| !s.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Whether `supplied` grants access. Missing counts as empty.
    pub fn permits(&self, supplied: Option<&str>) -> bool {
        match &self.secret {
            None => true,
            Some(secret) => {
                let supplied = supplied.unwrap_or_default();
                supplied.as_bytes().ct_eq(secret.as_bytes()).into()
            }
        }
    }
}

impl std::fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKey")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
