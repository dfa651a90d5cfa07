//! # Business identifiers for queue items.
//!
//! An [`ItemId`] names the downstream record one item updates (typically a
//! product). It is cheap to clone (`Arc<str>`) and is what executors,
//! events and admission checks key on.
//!
//! Product global ids (`gid://shopify/Product/7981234`) are reduced to the
//! numeric product id so the same product submitted in either form maps to one
//! id. Other global ids (collections, variants, ...) name different records and
//! are kept verbatim.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

const PRODUCT_GID_PREFIX: &str = "gid://shopify/Product/";

/// Stable identifier of the business record an item updates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(Arc<str>);

impl ItemId {
    /// Creates an identifier, normalising `gid://shopify/Product/<n>` to `<n>`.
    ///
    /// # Example
    /// ```
    /// use bulkvisor::ItemId;
    ///
    /// assert_eq!(ItemId::new("gid://shopify/Product/42").as_str(), "42");
    /// assert_eq!(ItemId::new("gid://shopify/Collection/42").as_str(), "gid://shopify/Collection/42");
    /// assert_eq!(ItemId::new("sku-001").as_str(), "sku-001");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().trim();
        let id = match raw.strip_prefix(PRODUCT_GID_PREFIX) {
            Some(product) if !product.is_empty() => product,
            _ => raw,
        };
        Self(Arc::from(id))
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no identifier was supplied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Generated identifier for items appended without one.
    pub(crate) fn generated(n: u64) -> Self {
        Self(Arc::from(format!("bulk-{n}")))
    }

    #[inline]
    pub(crate) fn shared(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ItemId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&String> for ItemId {
    fn from(raw: &String) -> Self {
        Self::new(raw)
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        Self(Arc::from(n.to_string()))
    }
}
