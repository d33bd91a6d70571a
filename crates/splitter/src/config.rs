/// Tuning for the streaming splitter, sourced from `splitter_min_len` /
/// `splitter_max_len` in the service configuration.
#[derive(Debug, Clone, Copy)]
pub struct SplitterConfig {
    /// Minimum segment length (code points) before a strong terminator is
    /// honored. Prevents degenerate one-word synthesis.
    pub min_len: usize,
    /// Maximum segment length (code points) before a weak breakpoint or
    /// hard cut forces an emission. Bounds per-segment TTS latency.
    pub max_len: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            min_len: 5,
            max_len: 40,
        }
    }
}
