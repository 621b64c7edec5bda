/// Builds models of type `M` from archive entries.
pub trait ModelLoader<M>: Send + Sync {
    /// Leading part of entry names, e.g. `calls` in `calls-java.util.List.json`.
    fn prefix(&self) -> &str;

    fn extension(&self) -> &str {
        "json"
    }

    fn entry_name(&self, key: &str) -> String {
        entry_name(self.prefix(), key, self.extension())
    }

    fn load(&self, key: &str, bytes: &[u8]) -> anyhow::Result<M>;

    /// Clear per-use state before a released model is handed out again.
    fn reset(&self, _model: &mut M) {}
}

/// `<prefix>-<key>.<extension>` with `/` turned into `.` and anything outside
/// `[A-Za-z0-9._$-]` replaced by `_`.
pub fn entry_name(prefix: &str, key: &str, extension: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| match c {
            '/' => '.',
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '$' | '-') => c,
            _ => '_',
        })
        .collect();
    format!("{prefix}-{sanitized}.{extension}")
}
