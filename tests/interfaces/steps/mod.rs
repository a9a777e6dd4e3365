//! Cucumber step definitions for interface tests.
