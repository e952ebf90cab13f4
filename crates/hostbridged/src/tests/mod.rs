//! Test suites for the command daemon.

pub(crate) mod support;
