//! Page activation and logical-page navigation

use crate::config::ActivationConfig;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use url::Url;

/// Source of the current page address
pub trait Location: Send + Sync {
    fn href(&self) -> String;
}

/// A settable location, shared between the page and the watcher
#[derive(Debug, Clone, Default)]
pub struct SharedLocation {
    href: Arc<Mutex<String>>,
}

impl SharedLocation {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Arc::new(Mutex::new(href.into())),
        }
    }

    pub fn set(&self, href: impl Into<String>) {
        *self.href.lock().unwrap_or_else(PoisonError::into_inner) = href.into();
    }
}

impl Location for SharedLocation {
    fn href(&self) -> String {
        self.href.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Activation predicate over page addresses
#[derive(Debug, Clone)]
pub struct PageActivation {
    config: ActivationConfig,
}

impl PageActivation {
    pub fn new(config: ActivationConfig) -> Self {
        Self { config }
    }

    /// Host matches, path carries a marker and the key parameter is present
    pub fn is_active(&self, url: &Url) -> bool {
        url.host_str() == Some(self.config.host.as_str())
            && self
                .config
                .path_markers
                .iter()
                .any(|marker| url.path().contains(marker.as_str()))
            && self.navigation_key(url).is_some()
    }

    /// Like [`is_active`](Self::is_active), for an unparsed address
    pub fn is_active_href(&self, href: &str) -> bool {
        Url::parse(href).is_ok_and(|url| self.is_active(&url))
    }

    /// Value of the query parameter that identifies a logical page
    pub fn navigation_key(&self, url: &Url) -> Option<String> {
        url.query_pairs()
            .find(|(name, _)| name == self.config.query_param.as_str())
            .map(|(_, value)| value.into_owned())
    }

    /// Whether the page lists builds
    pub fn is_build_page(&self, url: &Url) -> bool {
        url.path().contains(self.config.build_path_marker.as_str())
    }

    pub fn is_build_page_href(&self, href: &str) -> bool {
        Url::parse(href).is_ok_and(|url| self.is_build_page(&url))
    }
}

/// A navigation to a logically new page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChange {
    pub href: String,
    pub key: String,
}

/// Remembers the last address and page key seen
#[derive(Debug, Clone)]
pub struct NavigationDetector {
    activation: PageActivation,
    last_href: Option<String>,
    last_key: Option<String>,
}

impl NavigationDetector {
    pub fn new(activation: PageActivation) -> Self {
        Self {
            activation,
            last_href: None,
            last_key: None,
        }
    }

    pub fn last_key(&self) -> Option<&str> {
        self.last_key.as_deref()
    }

    /// Record `href`; returns the change if it starts a new logical page
    ///
    /// A new page is an address that differs from the last one, is active,
    /// lies under the build path marker and carries a key that differs from
    /// the last key seen.
    pub fn observe(&mut self, href: &str) -> Option<PageChange> {
        if self.last_href.as_deref() == Some(href) {
            return None;
        }
        self.last_href = Some(href.to_string());

        let url = Url::parse(href).ok()?;
        if !self.activation.is_active(&url) || !self.activation.is_build_page(&url) {
            return None;
        }
        let key = self.activation.navigation_key(&url)?;
        if self.last_key.as_deref() == Some(key.as_str()) {
            debug!(key = %key, "address changed within the same page");
            return None;
        }
        self.last_key = Some(key.clone());
        Some(PageChange {
            href: href.to_string(),
            key,
        })
    }
}
