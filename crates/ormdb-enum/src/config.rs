//! Enumeration cache configuration.

use std::borrow::Cow;
use std::time::Duration;

/// How row names are compared during lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatching {
    /// Names match regardless of letter case (`"FL"`, `"fl"` and `:Fl` are one row).
    #[default]
    CaseInsensitive,
    /// Names must match byte for byte.
    Exact,
}

impl NameMatching {
    /// Normalize a name into its index key.
    pub fn normalize<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self {
            NameMatching::CaseInsensitive => {
                if name.chars().any(char::is_uppercase) {
                    Cow::Owned(name.to_lowercase())
                } else {
                    Cow::Borrowed(name)
                }
            }
            NameMatching::Exact => Cow::Borrowed(name),
        }
    }
}

/// Configuration for an enumeration cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Name comparison mode for `find_by_name`.
    pub name_matching: NameMatching,

    /// Rebuild once when a stored id is missing on read before reporting a
    /// consistency fault.
    pub refresh_on_miss: bool,

    /// After a failed rebuild, serve the previous snapshot without touching
    /// the source until this much time has passed.
    pub rebuild_retry_after: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name_matching: NameMatching::CaseInsensitive,
            refresh_on_miss: true,
            rebuild_retry_after: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name comparison mode.
    pub fn name_matching(mut self, matching: NameMatching) -> Self {
        self.name_matching = matching;
        self
    }

    /// Require exact (case-sensitive) name matches.
    pub fn case_sensitive(self) -> Self {
        self.name_matching(NameMatching::Exact)
    }

    /// Set whether a read miss triggers a rebuild.
    pub fn refresh_on_miss(mut self, refresh: bool) -> Self {
        self.refresh_on_miss = refresh;
        self
    }

    /// Set the wait between rebuild attempts while the source is failing.
    pub fn rebuild_retry_after(mut self, interval: Duration) -> Self {
        self.rebuild_retry_after = interval;
        self
    }
}
