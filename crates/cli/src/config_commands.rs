use std::path::Path;

use {anyhow::Result, clap::Subcommand};

use whathanzi_config::validate::{self, Diagnostic, Severity, ValidationResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration (token redacted).
    Show,
}

pub fn handle_config(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => {
            let result = validate::validate(config_path);
            eprint!("{}", report(&result, verbose));
            if result.has_errors() {
                std::process::exit(1);
            }
            Ok(())
        },
        ConfigAction::Show => show(config_path),
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn report(result: &ValidationResult, verbose: bool) -> String {
    let mut out = match &result.config_path {
        Some(path) => format!("Checking {}\n\n", path.display()),
        None => "No config file found; checking defaults.\n\n".to_string(),
    };

    let shown: Vec<&Diagnostic> = result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .collect();
    for d in &shown {
        out.push_str(&diagnostic_line(d));
        out.push('\n');
    }
    if !shown.is_empty() {
        out.push('\n');
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        out.push_str("No issues found.\n");
    } else {
        out.push_str(&format!("{errors} error(s), {warnings} warning(s)\n"));
    }
    out
}

fn diagnostic_line(d: &Diagnostic) -> String {
    let color = match d.severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    };
    let label = format!("{BOLD}{color}{}{RESET}", d.severity);
    if d.path.is_empty() {
        format!("  {label} {}", d.message)
    } else {
        format!("  {label} {}: {}", d.path, d.message)
    }
}

fn show(config_path: Option<&Path>) -> Result<()> {
    let loaded = whathanzi_config::load(config_path)?;
    match &loaded.path {
        Some(path) => eprintln!("# loaded from {}", path.display()),
        None => eprintln!("# defaults (no config file found)"),
    }
    println!("{:#?}", loaded.config);
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(severity: Severity, path: &str, message: &str) -> Diagnostic {
        Diagnostic {
            severity,
            category: "value",
            path: path.into(),
            message: message.into(),
        }
    }

    #[test]
    fn report_hides_info_unless_verbose() {
        let result = ValidationResult {
            diagnostics: vec![
                diagnostic(Severity::Info, "", "using defaults"),
                diagnostic(Severity::Warning, "sessions.capacity", "0 is treated as 1"),
            ],
            config_path: None,
        };

        let quiet = report(&result, false);
        assert!(!quiet.contains("using defaults"));
        assert!(quiet.contains("sessions.capacity: 0 is treated as 1"));
        assert!(quiet.ends_with("0 error(s), 1 warning(s)\n"));

        assert!(report(&result, true).contains("using defaults"));
    }

    #[test]
    fn clean_report_says_so() {
        let result = ValidationResult {
            diagnostics: Vec::new(),
            config_path: Some("whathanzi.toml".into()),
        };
        let out = report(&result, false);
        assert!(out.starts_with("Checking whathanzi.toml"));
        assert!(out.ends_with("No issues found.\n"));
    }
}
