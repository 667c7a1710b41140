//! # Output Formatting
//!
//! Controls color in the change report printed to stdout, and formats the
//! report lines themselves.
//!
//! Color follows the `--color=never|always|auto` flag. In `auto` mode it
//! is turned off by `NO_COLOR`, `CLICOLOR=0`, `TERM=dumb` or a non-TTY
//! stdout, and forced on by `CLICOLOR_FORCE=1`.
//!
//! ```rust,ignore
//! use nodesync::output::{OutputConfig, emoji};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! println!("{} nothing to do", emoji(&config, "✅", "[OK]"));
//! ```

use std::env;

use console::style;

use crate::apply::{Action, Change, HookRun};
use crate::classify::FixAction;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Build the configuration from the `--color` flag value (`always`,
    /// `never` or `auto`) and, for `auto`, the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // presence alone disables, see https://no-color.org/
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// The emoji when colors are enabled, the plain alternative otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Short verb for what a change does to its destination.
pub fn action_verb(action: &Action) -> &'static str {
    match action {
        Action::Delete => "delete",
        Action::Fix(FixAction::Create) => "create",
        Action::Fix(FixAction::TypeMismatch) | Action::Fix(FixAction::ContentMismatch) => {
            "update"
        }
        Action::Fix(FixAction::Attributes { owner: true, .. }) => "chown",
        Action::Fix(FixAction::Attributes { .. }) => "chmod",
        Action::Fix(FixAction::None) => "keep",
    }
}

/// One line of the change report.
///
/// ```text
/// would update /etc/motd (content mismatch)
/// ```
pub fn change_line(config: &OutputConfig, change: &Change, dry_run: bool) -> String {
    let verb = action_verb(&change.action);
    let verb = if dry_run {
        format!("would {}", verb)
    } else {
        verb.to_string()
    };
    let reason = match change.action {
        Action::Fix(fix) => format!(" ({})", fix),
        Action::Delete => String::new(),
    };
    let dest = change.dest.display().to_string();

    if config.use_color {
        let verb = match change.action {
            Action::Delete => style(verb).red(),
            Action::Fix(FixAction::Create) => style(verb).green(),
            _ => style(verb).yellow(),
        };
        format!("{} {}{}", verb, style(dest).bold(), style(reason).dim())
    } else {
        format!("{} {}{}", verb, dest, reason)
    }
}

/// One line for a hook script that ran or would run.
pub fn hook_line(config: &OutputConfig, hook: &HookRun) -> String {
    let verb = if hook.executed { "ran" } else { "would run" };
    let line = format!("{} {} for {}", verb, hook.script.display(), hook.dest.display());
    if config.use_color {
        style(line).cyan().to_string()
    } else {
        line
    }
}
