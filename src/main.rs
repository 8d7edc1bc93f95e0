//! Command-line front end for HWP template filling.
//!
//! # Usage
//!
//! List the placeholders of a template:
//! ```sh
//! hwpfill analyze template.hwp
//! hwpfill analyze template.hwp --json
//! ```
//!
//! Fill a template from a JSON or YAML data file:
//! ```sh
//! hwpfill fill template.hwp out.hwp data.json
//! hwpfill fill template.hwp out.hwp data.yaml --mode structured --length-policy pad
//! ```
//!
//! Exits with status 0 on success and 1 on any failure.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use hwpfill::hwp::{self, FieldInventory, FillMode, FillOptions, FillReport, LengthPolicy};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Fill `{{field}}` placeholders in HWP document templates
#[derive(Parser, Debug)]
#[command(name = "hwpfill", version)]
struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List streams, sections and placeholders of a template
    #[command(visible_alias = "list")]
    Analyze {
        /// Template document
        template: PathBuf,

        /// Print the inventory as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a copy of a template with placeholders replaced
    Fill {
        /// Template document
        template: PathBuf,

        /// Output document
        output: PathBuf,

        /// Data file: a flat JSON object, or YAML for .yaml/.yml
        data: PathBuf,

        /// Where placeholders are replaced
        #[arg(long, value_enum, default_value = "raw")]
        mode: ModeArg,

        /// What to do when a value and its placeholder differ in length
        #[arg(long, value_enum, default_value = "allow")]
        length_policy: LengthPolicyArg,
    },
}

/// Fill mode options for CLI
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Byte replacement over the whole file
    Raw,
    /// Replacement inside decompressed streams, container rebuilt
    Structured,
}

impl From<ModeArg> for FillMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Raw => FillMode::Raw,
            ModeArg::Structured => FillMode::Structured,
        }
    }
}

/// Length policy options for CLI
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LengthPolicyArg {
    /// Write mismatched values and warn
    Allow,
    /// Fail on any mismatched value
    Reject,
    /// Pad shorter values with spaces, fail on longer ones
    Pad,
}

impl From<LengthPolicyArg> for LengthPolicy {
    fn from(arg: LengthPolicyArg) -> Self {
        match arg {
            LengthPolicyArg::Allow => LengthPolicy::Allow,
            LengthPolicyArg::Reject => LengthPolicy::Reject,
            LengthPolicyArg::Pad => LengthPolicy::Pad,
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Exit status for a command line clap could not parse
///
/// Help and version requests succeed; every usage error exits with 1.
fn parse_exit_code(error: &clap::Error) -> u8 {
    if error.exit_code() == 0 { 0 } else { 1 }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_exit_code(&e));
        },
    };
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Analyze { template, json } => hwp::analyze(&template).and_then(|inventory| {
            if json {
                println!("{}", serde_json::to_string_pretty(&inventory)?);
            } else {
                print_inventory(&template, &inventory);
            }
            Ok(())
        }),
        Command::Fill { template, output, data, mode, length_policy } => {
            let options = FillOptions { mode: mode.into(), length_policy: length_policy.into() };
            hwp::fill(&template, &output, &data, &options)
                .map(|report| print_fill_report(&template, &output, &report))
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}

fn print_inventory(template: &std::path::Path, inventory: &FieldInventory) {
    println!("=== {} ===", template.display());

    println!("\nStreams:");
    for stream in &inventory.streams {
        println!("  - {}", stream);
    }

    if let Some(header) = &inventory.header {
        println!(
            "\nHWP {} (compressed: {}, password: {}, distributable: {})",
            header.version, header.compressed, header.password, header.distributable
        );
    }

    println!("\nSections:");
    for section in &inventory.sections {
        println!(
            "\n  {} ({} bytes stored, {} bytes decoded)",
            section.path, section.raw_len, section.decoded_len
        );
        if !section.fields.is_empty() {
            let names: Vec<&str> = section.fields.iter().map(|t| t.name.as_str()).collect();
            println!("    Fields: {}", names.join(", "));
        }
        if !section.preview.trim().is_empty() {
            println!("    Preview: {}...", section.preview);
        }
    }

    println!("\nFields:");
    if inventory.fields.is_empty() {
        println!("  (none)");
    }
    for token in &inventory.fields {
        println!("  {{{{{}}}}} x{}  \"{}\"", token.name, token.count, token.sample_context);
    }
}

fn print_fill_report(template: &std::path::Path, output: &std::path::Path, report: &FillReport) {
    println!("Template: {}", template.display());
    println!("Output:   {}", output.display());
    for replacement in &report.replacements {
        if replacement.occurrences > 0 {
            println!("  Replaced: {} (x{})", replacement.field, replacement.occurrences);
        } else {
            println!("  Not found: {}", replacement.field);
        }
    }
    if report.size_delta != 0 {
        println!("Size changed by {} bytes", report.size_delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit_code_for(args: &[&str]) -> u8 {
        match Cli::try_parse_from(args) {
            Ok(_) => 0,
            Err(e) => parse_exit_code(&e),
        }
    }

    #[test]
    fn test_usage_errors_exit_with_one() {
        assert_eq!(exit_code_for(&["hwpfill", "fill", "only_two_args", "x"]), 1);
        assert_eq!(exit_code_for(&["hwpfill", "bogus"]), 1);
        assert_eq!(exit_code_for(&["hwpfill"]), 1);
        assert_eq!(exit_code_for(&["hwpfill", "fill", "t.hwp", "o.hwp", "d.json", "--mode", "fast"]), 1);
    }

    #[test]
    fn test_help_and_version_exit_with_zero() {
        assert_eq!(exit_code_for(&["hwpfill", "--help"]), 0);
        assert_eq!(exit_code_for(&["hwpfill", "--version"]), 0);
        assert_eq!(exit_code_for(&["hwpfill", "analyze", "t.hwp"]), 0);
    }

    #[test]
    fn test_fill_arguments_map_to_options() {
        let cli = Cli::try_parse_from([
            "hwpfill", "-vv", "fill", "t.hwp", "o.hwp", "d.yaml", "--mode", "structured",
            "--length-policy", "pad",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Fill { mode, length_policy, .. } => {
                assert_eq!(FillMode::from(mode), FillMode::Structured);
                assert_eq!(LengthPolicy::from(length_policy), LengthPolicy::Pad);
            },
            other => panic!("unexpected command {:?}", other),
        }
    }
}
