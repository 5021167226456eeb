//! gmond metric descriptors.
//!
//! Descriptors are kept in a JSON file next to the module (an array of
//! objects). Only `name` and `format` are interpreted here; every other field
//! (`value_type`, `units`, `slope`, `groups`, ...) is passed back to the host
//! untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{PollerError, Result};
use crate::module::{MetricCallback, MetricModule};
use crate::value::StatValue;

/// One reportable metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDescriptor {
    pub name: String,
    /// printf-style template used when rendering the value.
    pub format: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Fetch callback attached by `init`.
    #[serde(skip)]
    pub call_back: Option<MetricCallback>,
}

impl MetricDescriptor {
    pub fn new(name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
            extra: Map::new(),
            call_back: None,
        }
    }

    /// Fetches this metric's value through its callback.
    ///
    /// Descriptors without a callback fall back to `MetricModule::fetch`.
    pub fn invoke(&self, module: &mut dyn MetricModule) -> Result<StatValue> {
        match self.call_back {
            Some(call_back) => call_back.call(module, &self.name),
            None => module.fetch(&self.name),
        }
    }
}

/// Loads the descriptor array from `path`.
pub fn load_descriptors(path: &Path) -> Result<Vec<MetricDescriptor>> {
    let content = fs::read_to_string(path).map_err(|source| PollerError::DescriptorRead {
        path: path.to_path_buf(),
        source,
    })?;
    let descriptors: Vec<MetricDescriptor> =
        serde_json::from_str(&content).map_err(|source| PollerError::DescriptorParse {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        "Loaded {} metric descriptors from: {}",
        descriptors.len(),
        path.display()
    );
    Ok(descriptors)
}
