//! Reconciliation planner - turns desired specs into brew batches.
//!
//! Classification for an upgrade pass:
//!
//! | installed | pin                      | outcome                          |
//! |-----------|--------------------------|----------------------------------|
//! | no        | none                     | install plain name               |
//! | no        | some                     | install via resolver             |
//! | yes       | equals installed         | satisfied                        |
//! | yes       | differs                  | install via resolver (unpin)     |
//! | yes       | none, at stable          | satisfied                        |
//! | yes       | none, behind or unknown  | upgrade plain name               |
//!
//! A pinned spec whose `name@version` formula is already installed is
//! satisfied too, so a second pass over the converged state is a no-op.

use crate::info::PackageInfoClient;
use crate::resolver::VersionResolver;
use crate::types::{OperationBatch, PackageSpec, UpgradePlan};
use std::collections::HashSet;

/// Computes operation batches from desired specs.
pub struct ReconciliationPlanner<'a> {
    resolver: &'a VersionResolver<'a>,
}

impl<'a> ReconciliationPlanner<'a> {
    /// Create a planner on top of a resolver.
    pub fn new(resolver: &'a VersionResolver<'a>) -> Self {
        Self { resolver }
    }

    fn info(&self) -> &PackageInfoClient<'a> {
        self.resolver.info()
    }

    /// Resolved formula names to install.
    pub fn plan_install(&self, specs: &[PackageSpec]) -> Vec<String> {
        self.resolver.formulae_for(&unique(specs))
    }

    /// Batch removing the resolved formulae, or `None` if nothing resolved.
    pub fn plan_remove(&self, specs: &[PackageSpec]) -> Option<OperationBatch> {
        let formulae = self.plan_install(specs);
        (!formulae.is_empty()).then_some(OperationBatch::Remove(formulae))
    }

    /// Batch force-removing the resolved formulae, or `None` if nothing resolved.
    pub fn plan_purge(&self, specs: &[PackageSpec]) -> Option<OperationBatch> {
        let formulae = self.plan_install(specs);
        (!formulae.is_empty()).then_some(OperationBatch::Purge(formulae))
    }

    /// Split specs into plain upgrades and resolved installs.
    pub fn plan_upgrade(&self, specs: &[PackageSpec]) -> UpgradePlan {
        let mut plan = UpgradePlan::default();
        let mut install_specs = Vec::new();

        for spec in unique(specs) {
            let info = self.info().query(&spec.name);
            let installed = info.installed_version();
            let pin = spec.pinned_version.clone();

            match (installed.as_deref(), pin.as_deref()) {
                (None, None) => install_specs.push(spec),
                (Some(current), Some(pin)) if current == pin => {
                    plan.satisfied.push(spec.name.clone());
                }
                (current, Some(pin)) => {
                    if self.versioned_installed(&spec) {
                        plan.satisfied.push(spec.name.clone());
                    } else {
                        if let Some(current) = current {
                            log::debug!(
                                "{} is at {current} but pinned to {pin}; installing the pinned formula",
                                spec.name
                            );
                        }
                        install_specs.push(spec);
                    }
                }
                (Some(current), None) => {
                    if info.stable_version.as_deref() == Some(current) {
                        plan.satisfied.push(spec.name.clone());
                    } else {
                        plan.upgrade.push(spec.name.clone());
                    }
                }
            }
        }

        plan.install = self.resolver.formulae_for(&install_specs);
        plan
    }

    fn versioned_installed(&self, spec: &PackageSpec) -> bool {
        spec.versioned_name()
            .is_some_and(|name| self.info().query(&name).has_installed())
    }
}

/// Drop nameless specs and repeated names, keeping the first occurrence.
fn unique(specs: &[PackageSpec]) -> Vec<PackageSpec> {
    let mut seen = HashSet::new();
    specs
        .iter()
        .filter(|s| s.has_name())
        .filter(|s| {
            let first = seen.insert(s.name.clone());
            if !first {
                log::debug!("Ignoring duplicate spec for {}", s.name);
            }
            first
        })
        .cloned()
        .collect()
}
