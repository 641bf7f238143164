pub(crate) mod band;
pub(crate) mod gradient;
