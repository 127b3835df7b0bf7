//! Exit codes of the fenceguard binary

/// Invalid configuration, unreadable input or any other failure of the tool itself
pub const TOOL_ERROR: i32 = 2;

pub mod exit {
    use super::TOOL_ERROR;

    pub fn tool_error() -> ! {
        std::process::exit(TOOL_ERROR);
    }
}
