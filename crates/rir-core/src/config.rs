use std::sync::OnceLock;

fn env_true(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|val| {
        let trimmed = val.trim();
        !trimmed.is_empty() && !matches!(trimmed, "0" | "false" | "FALSE" | "False")
    })
}

fn bool_from_env(key: &str) -> bool {
    env_true(key).unwrap_or(false)
}

/// Pretty-print every body at `debug` level before it is lowered (`RIR_DUMP_IR`).
pub fn dump_ir() -> bool {
    static DUMP: OnceLock<bool> = OnceLock::new();
    *DUMP.get_or_init(|| bool_from_env("RIR_DUMP_IR"))
}

/// Verify label targets after building and before lowering (`RIR_VERIFY`).
///
/// Always on in debug builds.
pub fn verify_mode() -> bool {
    static VERIFY: OnceLock<bool> = OnceLock::new();
    *VERIFY.get_or_init(|| cfg!(debug_assertions) || bool_from_env("RIR_VERIFY"))
}
