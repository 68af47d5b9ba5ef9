//! Workspace tooling package; the gondola crates live under `crates/`.
