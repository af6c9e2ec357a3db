//! Execution-kernel probing and the per-run availability cache.
//!
//! [`KernelProber`] is the seam to the machine's installed Jupyter kernels.
//! The probe is a pure query and never errors: a kernel that cannot be
//! enumerated is simply unavailable. Memoization lives in
//! [`KernelAvailability`], owned by the caller, so a run probes each distinct
//! kernel name exactly once.

use std::collections::{BTreeMap, BTreeSet};

/// Queries whether a named execution kernel is installed.
pub trait KernelProber: Send + Sync {
    fn installed(&self, kernel_name: &str) -> bool;
}

// ---------------------------------------------------------------------------
// JupyterProber — live implementation
// ---------------------------------------------------------------------------

/// Probes kernels by shelling out to `jupyter kernelspec list --json`.
pub struct JupyterProber;

impl JupyterProber {
    fn installed_kernels() -> Option<BTreeSet<String>> {
        let output = std::process::Command::new("jupyter")
            .args(["kernelspec", "list", "--json"])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
        let specs = parsed.get("kernelspecs")?.as_object()?;
        Some(specs.keys().cloned().collect())
    }
}

impl KernelProber for JupyterProber {
    fn installed(&self, kernel_name: &str) -> bool {
        match Self::installed_kernels() {
            Some(kernels) => kernels.contains(kernel_name),
            None => {
                tracing::warn!("could not enumerate jupyter kernels; treating all as unavailable");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// StaticProber — fixed set, for tests and offline validation
// ---------------------------------------------------------------------------

pub struct StaticProber {
    available: BTreeSet<String>,
}

impl StaticProber {
    pub fn new<I, S>(kernels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: kernels.into_iter().map(Into::into).collect(),
        }
    }
}

impl KernelProber for StaticProber {
    fn installed(&self, kernel_name: &str) -> bool {
        self.available.contains(kernel_name)
    }
}

// ---------------------------------------------------------------------------
// KernelAvailability — per-run cache
// ---------------------------------------------------------------------------

/// Per-run cache of kernel availability. Constructed once during config
/// normalization and threaded through task-graph construction; there is no
/// module-level state.
#[derive(Debug, Clone, Default)]
pub struct KernelAvailability {
    cache: BTreeMap<String, bool>,
}

impl KernelAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `kernel_name` if it has not been seen yet; return the cached
    /// answer either way.
    pub fn probe_once(&mut self, kernel_name: &str, prober: &dyn KernelProber) -> bool {
        if let Some(&available) = self.cache.get(kernel_name) {
            return available;
        }
        let available = prober.installed(kernel_name);
        tracing::debug!(kernel = kernel_name, available, "probed execution kernel");
        self.cache.insert(kernel_name.to_string(), available);
        available
    }

    /// Cached availability, or `None` if the kernel was never probed.
    pub fn is_available(&self, kernel_name: &str) -> Option<bool> {
        self.cache.get(kernel_name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.cache.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
