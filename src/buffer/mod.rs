pub(crate) mod allocator;
pub(crate) mod cache;
pub(crate) mod mask;
pub(crate) mod pool;
pub(crate) mod spawn;
