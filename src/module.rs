//! The gmond python-module interface: `metric_init`, the per-metric
//! `call_back` and `metric_cleanup`.

use std::collections::HashMap;
use std::fmt;

use crate::descriptor::MetricDescriptor;
use crate::error::Result;
use crate::value::StatValue;

/// String parameters handed over by the host from its module configuration.
pub type Params = HashMap<String, String>;

/// A metric module as driven by a polling host.
///
/// The host calls `init` once, then `fetch` for every descriptor on each
/// collection cycle, and `cleanup` on shutdown.
pub trait MetricModule {
    fn init(&mut self, params: &Params) -> Result<Vec<MetricDescriptor>>;
    fn fetch(&mut self, name: &str) -> Result<StatValue>;
    fn cleanup(&mut self);
}

/// Callback attached to each descriptor at init time.
#[derive(Clone, Copy)]
pub struct MetricCallback(pub fn(&mut dyn MetricModule, &str) -> Result<StatValue>);

impl MetricCallback {
    /// Callback that routes to `MetricModule::fetch`.
    pub fn fetch() -> Self {
        MetricCallback(|module, name| module.fetch(name))
    }

    pub fn call(&self, module: &mut dyn MetricModule, name: &str) -> Result<StatValue> {
        (self.0)(module, name)
    }
}

impl fmt::Debug for MetricCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MetricCallback(..)")
    }
}
