// crates/conformance-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for harness configuration, kept parseable and valid by
//! the crate tests.

/// Returns a canonical example `conformance.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[tut]
server_name = "sqlite-reference"
collection_id = "conformance-collection"
user_id = "conformance-user"

[run]
instances_per_type = 10
workers = 4
timeout_ms = 600000
families = ["create", "re-identify", "re-type", "delete-restore", "purge"]
serialize_mutations = "auto"

[store]
type = "sqlite"
path = "conformance-tut.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[catalog]
source = "builtin"

[report]
path = "conformance-report.json"
pretty = true

[events]
sink = "stderr"
"#,
    )
}
