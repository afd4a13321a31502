//! Shared helpers for integration suites that need embedded PostgreSQL.

pub mod cluster_skip;
pub mod pg_embed;

pub use cluster_skip::handle_cluster_setup_failure;
pub use pg_embed::test_cluster;
