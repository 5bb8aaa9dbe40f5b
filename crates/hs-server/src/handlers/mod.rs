//! HTTP request handlers.

pub(crate) mod index;
pub(crate) mod script;
pub(crate) mod services;
