pub(crate) mod exporter;
pub(crate) mod progress;
pub(crate) mod settings;
