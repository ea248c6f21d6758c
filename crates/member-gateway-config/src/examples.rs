// crates/member-gateway-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for member gateway configuration. The example validates
//! as-is and uses in-process adapters so it runs without cloud access.

/// Returns a canonical example `member-gateway.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:8080"
max_body_bytes = 1048576

[identity]
base_url = "https://identity.example.internal"
credential_token = "replace-me"
verify_timeout_ms = 5000
revoke_timeout_ms = 10000
disable_timeout_ms = 10000

[metadata]
type = "memory"

[backend]
member_graphql_url = "https://member.example.internal/graphql"
legacy_url = "https://legacy.example.internal/api"
legacy_prefix = "/api/v0"
graphql_timeout_ms = 5000
delete_timeout_ms = 5000

[gateway_credential]
source = "static"
token = "replace-me"

[broker]
type = "memory"
pull_batch = 10
workers = 4
queue_capacity = 64

[audit]
sink = "stderr"
"#,
    )
}
