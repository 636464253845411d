use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `MIMEREPAIR_QUIET=1` silences progress chatter in human mode
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("MIMEREPAIR_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
