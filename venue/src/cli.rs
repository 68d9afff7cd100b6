use thiserror::Error;

/// A hand-rolled argument parser grounded in the original `CommandOptions`: no
/// external CLI-parsing crate, a flat scan over `argv`, unrecognized options are
/// skipped rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    pub help_requested: bool,
    pub version_requested: bool,
    pub instance_prefix: Option<String>,
    pub instance_id: Option<String>,
    pub config_file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    #[error("'{0}' option is given without a value")]
    MissingOptionValue(String),
    #[error("missing required option: {0}")]
    MissingRequiredOption(&'static str),
}

const HELP_MESSAGE: &str = "Usage: venue [OPTION] [VALUE] ...\n\n  \
-h|--help - print help message and exit\n  \
-v|--version - print version and exit\n  \
--pf [VALUE] - specify instance prefix (required)\n  \
--id [VALUE] - specify instance identifier (required)\n  \
-f [VALUE] - specify path to JSON configuration file (required)";

pub fn help_message() -> &'static str {
    HELP_MESSAGE
}

impl CommandOptions {
    /// Parses `args` (expected to exclude argv[0]). An option with no following value
    /// is an error; an unrecognized option is skipped, matching the original parser.
    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let mut options = CommandOptions::default();
        let mut index = 0;
        while index < args.len() {
            let current = args[index].as_str();
            match current {
                "-h" | "--help" => {
                    options.help_requested = true;
                    index += 1;
                }
                "-v" | "--version" => {
                    options.version_requested = true;
                    index += 1;
                }
                "--pf" => {
                    options.instance_prefix = Some(value_of(args, index, current)?);
                    index += 2;
                }
                "--id" => {
                    options.instance_id = Some(value_of(args, index, current)?);
                    index += 2;
                }
                "-f" => {
                    options.config_file_path = Some(value_of(args, index, current)?);
                    index += 2;
                }
                _ => index += 1,
            }
        }

        if options.help_requested || options.version_requested {
            return Ok(options);
        }

        if options.instance_prefix.is_none() {
            return Err(CliError::MissingRequiredOption("--pf"));
        }
        if options.instance_id.is_none() {
            return Err(CliError::MissingRequiredOption("--id"));
        }
        if options.config_file_path.is_none() {
            return Err(CliError::MissingRequiredOption("-f"));
        }

        Ok(options)
    }
}

fn value_of(args: &[String], index: usize, option: &str) -> Result<String, CliError> {
    args.get(index + 1)
        .cloned()
        .ok_or_else(|| CliError::MissingOptionValue(option.to_string()))
}
