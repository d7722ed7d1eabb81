#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Manifest policy tests.
//!
//! Parse `Cargo.toml` and check the lint, feature and packaging settings the
//! library relies on. A failure means the manifest drifted from policy.

use std::path::PathBuf;

fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn manifest() -> toml::Table {
    let path = project_root().join("Cargo.toml");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read '{}': {e}", path.display()));
    toml::from_str(&text).unwrap_or_else(|e| panic!("Cargo.toml does not parse: {e}"))
}

mod panic_policy {
    use super::*;

    const REQUIRED_DENY_LINTS: &[&str] = &[
        "unwrap_used",
        "expect_used",
        "panic",
        "todo",
        "unimplemented",
        "indexing_slicing",
    ];

    #[test]
    fn all_panic_prone_lints_are_denied() {
        let manifest = manifest();
        let clippy = manifest["lints"]["clippy"]
            .as_table()
            .expect("Cargo.toml is missing [lints.clippy]");
        for lint in REQUIRED_DENY_LINTS {
            assert_eq!(
                clippy.get(*lint).and_then(|v| v.as_str()),
                Some("deny"),
                "`{lint}` must be denied to keep library code panic-free"
            );
        }
    }
}

mod feature_policy {
    use super::*;

    #[test]
    fn websocket_transport_is_default() {
        let manifest = manifest();
        let default = manifest["features"]["default"].as_array().unwrap();
        assert!(default.iter().any(|f| f.as_str() == Some("transport-websocket")));
    }

    #[test]
    fn websocket_dependencies_are_optional() {
        let manifest = manifest();
        let deps = manifest["dependencies"].as_table().unwrap();
        for name in ["tokio-tungstenite", "futures-util"] {
            let optional = deps[name]
                .get("optional")
                .and_then(toml::Value::as_bool)
                .unwrap_or(false);
            assert!(optional, "`{name}` must stay behind the transport-websocket feature");
        }
    }

    #[test]
    fn runtime_features_cover_the_render_loop() {
        let manifest = manifest();
        let tokio = manifest["dependencies"]["tokio"]["features"]
            .as_array()
            .unwrap();
        for feature in ["sync", "macros", "rt", "time"] {
            assert!(
                tokio.iter().any(|f| f.as_str() == Some(feature)),
                "tokio is missing the `{feature}` feature"
            );
        }
    }
}

mod packaging_policy {
    use super::*;

    #[test]
    fn msrv_is_declared() {
        let manifest = manifest();
        let msrv = manifest["package"]["rust-version"].as_str().unwrap();
        assert!(msrv.starts_with("1."), "unexpected rust-version {msrv}");
    }

    #[test]
    fn demo_is_registered_and_present() {
        let manifest = manifest();
        let examples = manifest["example"].as_array().unwrap();
        for example in examples {
            let path = example["path"].as_str().unwrap();
            assert!(
                project_root().join(path).is_file(),
                "example path `{path}` does not exist"
            );
        }
    }
}
