use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accept either a level name or its index (`0` = error ... `4` = trace,
/// `5` is kept as an alias for trace).
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(index) = level.parse::<u8>() {
            return if index <= 5 {
                Ok(index)
            } else {
                Err(format!("log level {index} is out of range (0-5)"))
            };
        }

        let wanted = level.to_lowercase();
        LEVEL_NAMES
            .iter()
            .position(|name| *name == wanted)
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("unknown log level '{level}'"))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Raise log output, repeat for more (-vv info, -vvv debug); the env var takes a level name")
            .env("VESTIBULE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verbosity(env: Option<&str>, args: &[&str]) -> Option<u8> {
        temp_env::with_vars([("VESTIBULE_LOG_LEVEL", env)], || {
            with_args(Command::new("vestibule"))
                .try_get_matches_from(args)
                .ok()
                .and_then(|matches| matches.get_one::<u8>(ARG_VERBOSITY).copied())
        })
    }

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(verbosity(Some("DEBUG"), &["vestibule"]), Some(3));
        assert_eq!(verbosity(Some("Warn"), &["vestibule"]), Some(1));
    }

    #[test]
    fn numeric_levels_are_accepted_up_to_five() {
        assert_eq!(verbosity(Some("5"), &["vestibule"]), Some(5));
        assert_eq!(verbosity(Some("6"), &["vestibule"]), None);
    }

    #[test]
    fn unknown_level_name_is_rejected() {
        assert_eq!(verbosity(Some("chatty"), &["vestibule"]), None);
    }

    #[test]
    fn repeated_flag_counts_up() {
        assert_eq!(verbosity(None, &["vestibule"]), Some(0));
        assert_eq!(verbosity(None, &["vestibule", "-vvv"]), Some(3));
    }
}
