//! # Bridge Configuration Module
//!
//! Configuration of the sensor tag bridge core.
//!
//! ## Overview
//!
//! A builder produces a [`BridgeConfig`] holding the host capabilities and
//! settings the core needs. Building fails fast with an actionable message
//! when a required capability is missing.
//!
//! ## Required Dependencies
//!
//! - `TagHardwareService` - Reader sessions, tag configuration, buffered readings
//!
//! When the `simulator-shims` feature is enabled, a `SimulatedTagService` is
//! injected automatically if none is provided.
//!
//! ## Optional Settings
//!
//! - `resource_dir` / `required_resources` - Vendor library files that must be
//!   present before the reader is initialized
//! - `host_event_buffer` - Capacity of the host event channel (default 100)
//! - `max_readings_per_batch` - Upper bound on readings returned by one
//!   `getData` call (default 1024)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::BridgeConfig;
//! use std::sync::Arc;
//!
//! let config = BridgeConfig::builder()
//!     .tag_service(Arc::new(AndroidTagService::new(context)))
//!     .resource_dir("/data/app/lib")
//!     .require_resource("libtagmsg.so")
//!     .require_resource("libndef.so")
//!     .max_readings_per_batch(512)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```
//! use core_runtime::config::BridgeConfig;
//!
//! let result = BridgeConfig::builder()
//!     .host_event_buffer(0)
//!     .build();
//! assert!(result.is_err());
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::TagHardwareService;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default upper bound on readings returned by one data pull.
pub const DEFAULT_MAX_READINGS_PER_BATCH: usize = 1024;

/// Hard ceiling for `max_readings_per_batch`.
pub const MAX_READINGS_PER_BATCH_LIMIT: usize = 100_000;

/// Bridge core configuration.
///
/// Use [`BridgeConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Hardware collaborator (required)
    pub tag_service: Arc<dyn TagHardwareService>,

    /// Directory holding the vendor tag libraries
    pub resource_dir: Option<PathBuf>,

    /// File names that must exist in `resource_dir` before init
    pub required_resources: Vec<String>,

    /// Capacity of the host event channel
    pub host_event_buffer: usize,

    /// Upper bound on readings returned by one data pull
    pub max_readings_per_batch: usize,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("tag_service", &"TagHardwareService { ... }")
            .field("resource_dir", &self.resource_dir)
            .field("required_resources", &self.required_resources)
            .field("host_event_buffer", &self.host_event_buffer)
            .field("max_readings_per_batch", &self.max_readings_per_batch)
            .finish()
    }
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Host event buffer is > 0
    /// - Batch limit is > 0 and within [`MAX_READINGS_PER_BATCH_LIMIT`]
    /// - Required resources come with a resource directory
    pub fn validate(&self) -> Result<()> {
        if self.host_event_buffer == 0 {
            return Err(Error::Config(
                "Host event buffer must be greater than 0".to_string(),
            ));
        }

        if self.max_readings_per_batch == 0 {
            return Err(Error::Config(
                "Max readings per batch must be greater than 0".to_string(),
            ));
        }

        if self.max_readings_per_batch > MAX_READINGS_PER_BATCH_LIMIT {
            return Err(Error::Config(format!(
                "Max readings per batch exceeds maximum of {}",
                MAX_READINGS_PER_BATCH_LIMIT
            )));
        }

        if !self.required_resources.is_empty() && self.resource_dir.is_none() {
            return Err(Error::Config(
                "Required resources configured but no resource directory provided. \
                 Set .resource_dir() or drop the required resources."
                    .to_string(),
            ));
        }

        if let Some(dir) = &self.resource_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config(
                    "Resource directory cannot be empty".to_string(),
                ));
            }
        }

        if let Some(name) = self.required_resources.iter().find(|name| name.trim().is_empty()) {
            return Err(Error::Config(format!(
                "Required resource name cannot be blank: {:?}",
                name
            )));
        }

        Ok(())
    }

    /// Full paths of the required resource files.
    pub fn required_resource_paths(&self) -> Vec<PathBuf> {
        match &self.resource_dir {
            Some(dir) => self
                .required_resources
                .iter()
                .map(|name| dir.join(name))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn resource_dir(&self) -> Option<&Path> {
        self.resource_dir.as_deref()
    }
}

#[cfg(not(feature = "simulator-shims"))]
fn tag_service_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "TagHardwareService".to_string(),
        message: "TagHardwareService implementation is required to talk to the tag reader. \
                 Desktop/tests: enable the 'simulator-shims' feature to use the default SimulatedTagService. \
                 Android: inject the NFC adapter backed service. \
                 iOS: inject the Core NFC backed service."
            .to_string(),
    }
}

#[cfg(feature = "simulator-shims")]
fn provide_default_tag_service() -> Result<Arc<dyn TagHardwareService>> {
    use bridge_simulator::{SimulatedTagService, SimulatorConfig};

    let service: Arc<dyn TagHardwareService> =
        Arc::new(SimulatedTagService::new(SimulatorConfig::default()));
    Ok(service)
}

#[cfg(not(feature = "simulator-shims"))]
fn provide_default_tag_service() -> Result<Arc<dyn TagHardwareService>> {
    Err(tag_service_missing_error())
}

/// Builder for [`BridgeConfig`].
#[derive(Default)]
pub struct BridgeConfigBuilder {
    tag_service: Option<Arc<dyn TagHardwareService>>,
    resource_dir: Option<PathBuf>,
    required_resources: Vec<String>,
    host_event_buffer: Option<usize>,
    max_readings_per_batch: Option<usize>,
}

impl BridgeConfigBuilder {
    /// Sets the hardware collaborator.
    pub fn tag_service(mut self, service: Arc<dyn TagHardwareService>) -> Self {
        self.tag_service = Some(service);
        self
    }

    /// Sets the directory holding the vendor tag libraries.
    pub fn resource_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.resource_dir = Some(path.into());
        self
    }

    /// Adds a file that must exist in the resource directory before init.
    pub fn require_resource(mut self, name: impl Into<String>) -> Self {
        self.required_resources.push(name.into());
        self
    }

    /// Replaces the list of required resource files.
    pub fn required_resources<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_resources = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn host_event_buffer(mut self, capacity: usize) -> Self {
        self.host_event_buffer = Some(capacity);
        self
    }

    pub fn max_readings_per_batch(mut self, limit: usize) -> Self {
        self.max_readings_per_batch = Some(limit);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when no tag service is set and no default is
    ///   available
    /// - `Config` when a setting is out of range
    pub fn build(self) -> Result<BridgeConfig> {
        let tag_service = match self.tag_service {
            Some(service) => service,
            None => provide_default_tag_service()?,
        };

        let config = BridgeConfig {
            tag_service,
            resource_dir: self.resource_dir,
            required_resources: self.required_resources,
            host_event_buffer: self.host_event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            max_readings_per_batch: self
                .max_readings_per_batch
                .unwrap_or(DEFAULT_MAX_READINGS_PER_BATCH),
        };

        config.validate()?;

        Ok(config)
    }
}
