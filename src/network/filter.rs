//! Record filtering for enumeration and event selection.
//!
//! # Design
//!
//! - **Inclusion flags**: [`EnumerationFilter`] carries the three boolean
//!   filters of an enumeration call (IPv6, loopback, down interfaces).
//! - **Pure Matchers**: [`NameRegexFilter`] only answers "does this interface
//!   name match?" without include/exclude semantics.
//! - **Filter Chain**: [`FilterChain`] combines matchers with correct semantics:
//!   - Exclude filters: AND logic (must pass ALL excludes)
//!   - Include filters: OR logic (pass ANY include, empty = match all)

use regex::Regex;

use super::{AddressFamily, AddressRecord};

/// Trait for filtering address records.
///
/// Implementations decide whether a record is kept.
pub trait RecordFilter {
    /// Returns `true` if the record should be kept, `false` to filter it out.
    fn matches(&self, record: &AddressRecord) -> bool;
}

/// Interface names can be matched directly, so the same matchers filter
/// both enumeration records and monitor events.
pub trait NameMatcher {
    /// Returns `true` if the interface name matches.
    fn matches_name(&self, interface: &str) -> bool;
}

// ============================================================================
// EnumerationFilter - the three inclusion flags
// ============================================================================

/// The inclusion flags of an enumeration call.
///
/// Each flag only ever widens the result: with every flag `false`, only IPv4
/// addresses of up, non-loopback interfaces are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct EnumerationFilter {
    /// Keep IPv6 addresses.
    pub include_ipv6: bool,
    /// Keep addresses of loopback interfaces.
    pub include_loopback: bool,
    /// Keep addresses of interfaces that are down.
    pub include_down: bool,
}

impl EnumerationFilter {
    /// IPv4 only, up and non-loopback.
    pub const IPV4: Self = Self::new(false, false, false);

    /// IPv4 and IPv6, up and non-loopback.
    pub const ALL_FAMILIES: Self = Self::new(true, false, false);

    /// Everything the OS reports.
    pub const EVERYTHING: Self = Self::new(true, true, true);

    /// Creates a filter from the three inclusion flags.
    #[must_use]
    pub const fn new(include_ipv6: bool, include_loopback: bool, include_down: bool) -> Self {
        Self {
            include_ipv6,
            include_loopback,
            include_down,
        }
    }
}

impl RecordFilter for EnumerationFilter {
    fn matches(&self, record: &AddressRecord) -> bool {
        if !self.include_ipv6 && record.family() == AddressFamily::V6 {
            return false;
        }
        if !self.include_down && !record.is_up() {
            return false;
        }
        if !self.include_loopback && record.is_loopback() {
            return false;
        }
        true
    }
}

// ============================================================================
// FilterChain - Include OR / Exclude AND semantics
// ============================================================================

/// Filter chain with include/exclude semantics over interface names.
///
/// Evaluation order:
/// 1. **Exclude filters (AND)**: Any match → reject.
/// 2. **Include filters (OR)**: Any match → accept. Empty includes = match all.
///
/// An optional base [`EnumerationFilter`] is applied to records before the
/// name filters.
///
/// # Examples
///
/// ```
/// use netut::network::filter::{FilterChain, NameRegexFilter, RecordFilter};
/// use netut::network::AddressRecord;
///
/// let chain = FilterChain::new()
///     .exclude(NameRegexFilter::new("^docker").unwrap())
///     .include(NameRegexFilter::new("^eth").unwrap());
///
/// let eth = AddressRecord::new("eth0", "10.0.0.2".parse().unwrap(), 24, true, false);
/// let docker = AddressRecord::new("docker0", "172.17.0.1".parse().unwrap(), 16, true, false);
///
/// assert!(chain.matches(&eth));
/// assert!(!chain.matches(&docker));
/// ```
#[derive(Default)]
pub struct FilterChain {
    base: Option<EnumerationFilter>,
    includes: Vec<Box<dyn NameMatcher + Send + Sync>>,
    excludes: Vec<Box<dyn NameMatcher + Send + Sync>>,
}

impl FilterChain {
    /// Creates an empty filter chain (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the inclusion flags before the name filters.
    #[must_use]
    pub fn with_base(mut self, base: EnumerationFilter) -> Self {
        self.base = Some(base);
        self
    }

    /// Adds an include filter (OR semantics).
    #[must_use]
    pub fn include<F: NameMatcher + Send + Sync + 'static>(mut self, filter: F) -> Self {
        self.includes.push(Box::new(filter));
        self
    }

    /// Adds an exclude filter (any match rejects).
    #[must_use]
    pub fn exclude<F: NameMatcher + Send + Sync + 'static>(mut self, filter: F) -> Self {
        self.excludes.push(Box::new(filter));
        self
    }

    /// Returns the number of include filters.
    #[must_use]
    pub fn include_count(&self) -> usize {
        self.includes.len()
    }

    /// Returns the number of exclude filters.
    #[must_use]
    pub fn exclude_count(&self) -> usize {
        self.excludes.len()
    }

    /// Returns true if no name filters are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }
}

impl NameMatcher for FilterChain {
    fn matches_name(&self, interface: &str) -> bool {
        // 1. Any exclude match → reject
        if self.excludes.iter().any(|f| f.matches_name(interface)) {
            return false;
        }

        // 2. No includes = all pass; otherwise any include match → accept
        self.includes.is_empty() || self.includes.iter().any(|f| f.matches_name(interface))
    }
}

impl RecordFilter for FilterChain {
    fn matches(&self, record: &AddressRecord) -> bool {
        if let Some(base) = &self.base {
            if !base.matches(record) {
                return false;
            }
        }
        self.matches_name(record.interface())
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("base", &self.base)
            .field("include_count", &self.includes.len())
            .field("exclude_count", &self.excludes.len())
            .finish()
    }
}

// ============================================================================
// NameRegexFilter - Pure matcher by name pattern
// ============================================================================

/// Matches interface names against a regex pattern.
///
/// Use with [`FilterChain`] to apply include/exclude logic.
#[derive(Debug, Clone)]
pub struct NameRegexFilter {
    pattern: Regex,
}

impl NameRegexFilter {
    /// Creates a name filter with the given regex pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Returns the pattern string.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl NameMatcher for NameRegexFilter {
    fn matches_name(&self, interface: &str) -> bool {
        self.pattern.is_match(interface)
    }
}

impl RecordFilter for NameRegexFilter {
    fn matches(&self, record: &AddressRecord) -> bool {
        self.matches_name(record.interface())
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
