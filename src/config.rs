//! Front-end options
//!
//! Options are plain data. The binary fills them from its command line; library
//! users build them with struct update syntax over [`FrontendOptions::default`].

/// Switches that change what the front end reports, never how it parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendOptions {
    /// Report a program without a `main` definition
    pub require_main: bool,
    /// Stop at the next top-level declaration once this many errors exist
    pub max_errors: Option<usize>,
    /// Record warnings alongside errors
    pub warnings: bool,
    /// Largest number of value arguments accepted by `printf`
    pub printf_max_args: usize,
}

impl Default for FrontendOptions {
    fn default() -> Self {
        Self {
            require_main: true,
            max_errors: None,
            warnings: true,
            printf_max_args: 20,
        }
    }
}

impl FrontendOptions {
    /// Options for checking a fragment that is not a whole program
    pub fn fragment() -> Self {
        Self {
            require_main: false,
            ..Self::default()
        }
    }
}
