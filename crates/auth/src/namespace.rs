//! Config-store key layout
//!
//! All gateway state shares one namespace in the config store. The prefix is
//! configurable (the `CONFIG_PREFIX` environment variable) so several
//! gateway deployments can coexist in a single store.

const ACCOUNTS_PATH: &str = "mrplotter/accounts/";
const TAGS_PATH: &str = "mrplotter/tags/";
const KEYS_PATH: &str = "mrplotter/keys/";

/// Key-path builder for one gateway deployment's slice of the store.
#[derive(Debug, Clone, Default)]
pub struct StoreNamespace {
    prefix: String,
}

impl StoreNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Key holding one account record.
    pub fn account_key(&self, username: &str) -> String {
        format!("{}{}{}", self.prefix, ACCOUNTS_PATH, username)
    }

    /// Prefix under which all account records live.
    pub fn accounts_prefix(&self) -> String {
        format!("{}{}", self.prefix, ACCOUNTS_PATH)
    }

    /// Key holding one tag definition.
    pub fn tag_key(&self, tag: &str) -> String {
        format!("{}{}{}", self.prefix, TAGS_PATH, tag)
    }

    /// Prefix under which all tag definitions live; the permission cache
    /// watches this subtree.
    pub fn tags_prefix(&self) -> String {
        format!("{}{}", self.prefix, TAGS_PATH)
    }

    /// Key holding the session encryption/MAC key pair.
    pub fn session_keys_key(&self) -> String {
        format!("{}{}session", self.prefix, KEYS_PATH)
    }

    /// Prefix under which key material lives; the authenticator watches this
    /// subtree for rotations.
    pub fn keys_prefix(&self) -> String {
        format!("{}{}", self.prefix, KEYS_PATH)
    }

    /// Key holding the hardcoded TLS certificate and private key.
    pub fn tls_certificate_key(&self) -> String {
        format!("{}{}hardcoded", self.prefix, KEYS_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unprefixed_keys() {
        let ns = StoreNamespace::default();
        assert_eq!(ns.account_key("sam"), "mrplotter/accounts/sam");
        assert_eq!(ns.tag_key("public"), "mrplotter/tags/public");
        assert_eq!(ns.session_keys_key(), "mrplotter/keys/session");
    }

    #[test]
    fn test_prefixed_keys() {
        let ns = StoreNamespace::new("deploys/west/");
        assert_eq!(ns.account_key("sam"), "deploys/west/mrplotter/accounts/sam");
        assert_eq!(ns.tags_prefix(), "deploys/west/mrplotter/tags/");
        assert_eq!(
            ns.tls_certificate_key(),
            "deploys/west/mrplotter/keys/hardcoded"
        );
    }
}
