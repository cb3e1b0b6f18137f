//! Utilities for standing up throwaway databases in tests and local tooling.
pub mod prepare_env;
