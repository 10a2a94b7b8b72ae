//! UI module for consistent CLI output
//!
//! Uses `cliclack` for interactive output with automatic fallback to plain
//! lines in CI/non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use tilawah::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! ui::intro(&ctx, "tilawah install");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Precaching manifest...");
//! // ... install ...
//! spinner.stop("Precached 7 entries");
//!
//! ui::step_warn_hint(&ctx, "Upstream unreachable", "Check network.upstream");
//! ui::outro_success(&ctx, "Controller active");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_success, remark, section, step_error_detail,
    step_info, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::{StepProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, TilawahTheme};
