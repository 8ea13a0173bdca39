//! Runtime configuration.

/// Options for creating a [`Runtime`](crate::Runtime)
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Initial word capacity of a pooled call-frame buffer
    pub frame_words: usize,

    /// Frame buffers kept per thread for reuse
    pub frame_pool_size: usize,

    /// Initial slot capacity of the handle registry
    pub handle_capacity: usize,

    /// Log owned handles still live when the registry is dropped
    pub report_leaks: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            frame_words: 24, // 8 args of up to 3 words
            frame_pool_size: 8,
            handle_capacity: 256,
            report_leaks: cfg!(debug_assertions),
        }
    }
}
