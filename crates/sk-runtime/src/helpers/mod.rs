pub(crate) mod paths;
pub(crate) mod rhai_bridge;
