pub(crate) mod composite;
pub(crate) mod context;
pub(crate) mod cpu;
