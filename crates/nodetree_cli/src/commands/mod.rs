pub(crate) mod meta;
pub(crate) mod shared;
pub(crate) mod show;
pub(crate) mod sync;
