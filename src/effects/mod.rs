pub(crate) mod blur;
pub(crate) mod builtin;
pub(crate) mod composite;
pub(crate) mod context;
pub(crate) mod effect;
pub(crate) mod params;
pub(crate) mod transitions;
