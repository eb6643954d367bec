//! Managed attack-signature catalogs.

use std::collections::{HashMap, HashSet};

use crate::error::{AdmissionError, Result};
use crate::request::RequestView;

/// Predicate applied by a single sub-rule within a signature group.
type SubRulePredicate = Box<dyn Fn(&RequestView) -> bool + Send + Sync>;

/// A versioned catalog of attack-signature predicates, keyed by vendor and
/// group name.
///
/// Signature groups are maintained outside the engine; a `SignatureGroup`
/// statement delegates to the catalog and may exclude individual sub-rules
/// known to false-positive on legitimate payloads.
pub trait SignatureCatalog: Send + Sync {
    /// Whether the catalog knows the given vendor/group pair.
    fn contains(&self, vendor: &str, group: &str) -> bool;

    /// Tests a request against every non-excluded sub-rule in a group.
    ///
    /// Returns `true` if any sub-rule matches.
    ///
    /// # Errors
    ///
    /// Returns `AdmissionError::Catalog` if the group is unknown or the
    /// catalog backend fails.
    fn inspect(
        &self,
        vendor: &str,
        group: &str,
        excluded: &HashSet<String>,
        request: &RequestView,
    ) -> Result<bool>;
}

/// A named sub-rule inside a signature group.
struct SubRule {
    name: String,
    predicate: SubRulePredicate,
}

impl std::fmt::Debug for SubRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubRule").field("name", &self.name).finish()
    }
}

/// In-process [`SignatureCatalog`] backed by registered predicates.
#[derive(Debug, Default)]
pub struct StaticSignatureCatalog {
    groups: HashMap<(String, String), Vec<SubRule>>,
}

impl StaticSignatureCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-loaded with the baseline `pulse` vendor groups.
    ///
    /// - `common-threats`: crude path-traversal and script-injection checks,
    ///   plus an `oversized_upload` sub-rule that trips on bodies over 1 MiB.
    ///   Deployments that accept large medical file uploads exclude
    ///   `oversized_upload` and rely on the explicit size rule instead.
    /// - `bad-inputs`: malformed request-line checks.
    #[must_use]
    pub fn with_baseline_groups() -> Self {
        let mut catalog = Self::new();

        catalog.register("pulse", "common-threats", "path_traversal", |req| {
            req.path().contains("../") || req.path().contains("..%2f")
        });
        catalog.register("pulse", "common-threats", "script_injection", |req| {
            let body = String::from_utf8_lossy(req.body()).to_ascii_lowercase();
            body.contains("<script")
        });
        catalog.register("pulse", "common-threats", "oversized_upload", |req| {
            req.body_len() > 1_048_576
        });

        catalog.register("pulse", "bad-inputs", "null_byte_path", |req| {
            req.path().contains('\0') || req.path().contains("%00")
        });
        catalog.register("pulse", "bad-inputs", "empty_host", |req| {
            req.header("host").is_none_or(str::is_empty)
        });

        catalog
    }

    /// Registers a sub-rule predicate under a vendor/group pair.
    pub fn register(
        &mut self,
        vendor: impl Into<String>,
        group: impl Into<String>,
        sub_rule: impl Into<String>,
        predicate: impl Fn(&RequestView) -> bool + Send + Sync + 'static,
    ) {
        self.groups
            .entry((vendor.into(), group.into()))
            .or_default()
            .push(SubRule {
                name: sub_rule.into(),
                predicate: Box::new(predicate),
            });
    }

    /// Number of registered groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl SignatureCatalog for StaticSignatureCatalog {
    fn contains(&self, vendor: &str, group: &str) -> bool {
        self.groups
            .contains_key(&(vendor.to_string(), group.to_string()))
    }

    fn inspect(
        &self,
        vendor: &str,
        group: &str,
        excluded: &HashSet<String>,
        request: &RequestView,
    ) -> Result<bool> {
        let sub_rules = self
            .groups
            .get(&(vendor.to_string(), group.to_string()))
            .ok_or_else(|| AdmissionError::Catalog {
                vendor: vendor.to_string(),
                group: group.to_string(),
                reason: "unknown signature group".to_string(),
            })?;

        Ok(sub_rules
            .iter()
            .filter(|s| !excluded.contains(&s.name))
            .any(|s| (s.predicate)(request)))
    }
}
