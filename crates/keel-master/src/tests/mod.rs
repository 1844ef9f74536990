//! Test suites for the master bootstrap and composition.

mod support;
