//! Configuration types for PTY creation.

/// Window size for the PTY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    /// Number of columns.
    pub cols: u16,
    /// Number of rows.
    pub rows: u16,
}

impl WindowSize {
    /// Create a new window size with the given dimensions.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl From<(u16, u16)> for WindowSize {
    fn from((cols, rows): (u16, u16)) -> Self {
        Self::new(cols, rows)
    }
}

/// How the pair is sized and how the child is attached to it.
///
/// The child inherits the caller's environment and working directory.
///
/// # Example
///
/// ```
/// use tabtest_pty::{PtyConfig, WindowSize};
///
/// let config = PtyConfig::default().window_size(WindowSize::new(120, 40));
/// assert_eq!(config.window_size.cols, 120);
/// assert!(config.controlling_terminal);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtyConfig {
    /// Initial window size.
    pub window_size: WindowSize,

    /// Whether the slave becomes the child's controlling terminal.
    pub controlling_terminal: bool,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            // Wide enough that completion menus rarely wrap.
            window_size: WindowSize::new(200, 50),
            controlling_terminal: true,
        }
    }
}

impl PtyConfig {
    /// Set the initial window size.
    #[must_use]
    pub const fn window_size(mut self, size: WindowSize) -> Self {
        self.window_size = size;
        self
    }

    /// Set whether the slave becomes the controlling terminal.
    #[must_use]
    pub const fn controlling_terminal(mut self, value: bool) -> Self {
        self.controlling_terminal = value;
        self
    }
}
