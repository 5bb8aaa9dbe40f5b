//! CLI command implementations.

pub(crate) mod serve;
pub(crate) mod unit;
pub(crate) mod watch;

pub(crate) use serve::ServeArgs;
pub(crate) use unit::UnitArgs;
pub(crate) use watch::WatchArgs;
