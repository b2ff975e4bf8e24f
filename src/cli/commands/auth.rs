use anyhow::{anyhow, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

use crate::vestibule::auth::MAX_SESSION_TTL_SECONDS;

pub const ARG_SESSION_TTL: &str = "session-ttl";
pub const ARG_SESSION_PURGE_INTERVAL: &str = "session-purge-interval";
pub const ARG_SECURE_COOKIES: &str = "secure-cookies";
pub const ARG_USER: &str = "user";

pub struct Options {
    pub session_ttl_seconds: u64,
    pub session_purge_interval_seconds: u64,
    pub secure_cookies: bool,
    pub users: Vec<(String, SecretString)>,
}

impl Options {
    /// Parse session and user arguments from matches.
    ///
    /// # Errors
    /// Returns an error if no users are configured or a user entry is malformed.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let users = matches
            .get_many::<String>(ARG_USER)
            .context("missing required argument: --user")?
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| parse_user(entry))
            .collect::<anyhow::Result<Vec<_>>>()?;

        if users.is_empty() {
            anyhow::bail!("missing required argument: --{ARG_USER}");
        }

        Ok(Self {
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL)
                .copied()
                .unwrap_or(43_200),
            session_purge_interval_seconds: matches
                .get_one::<u64>(ARG_SESSION_PURGE_INTERVAL)
                .copied()
                .unwrap_or(300),
            secure_cookies: matches.get_flag(ARG_SECURE_COOKIES),
            users,
        })
    }
}

// USER:PASSWORD, the password may itself contain ':'.
fn parse_user(entry: &str) -> anyhow::Result<(String, SecretString)> {
    let (username, password) = entry
        .split_once(':')
        .ok_or_else(|| anyhow!("invalid --{ARG_USER} entry, expected USER:PASSWORD"))?;
    let username = username.trim();
    if username.is_empty() {
        anyhow::bail!("invalid --{ARG_USER} entry, username is empty");
    }
    Ok((username.to_string(), SecretString::from(password.to_string())))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Idle session lifetime in seconds (1 to 2592000)")
                .env("VESTIBULE_SESSION_TTL")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_SESSION_PURGE_INTERVAL)
                .long(ARG_SESSION_PURGE_INTERVAL)
                .help("Interval in seconds between expired session sweeps")
                .env("VESTIBULE_SESSION_PURGE_INTERVAL")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SECURE_COOKIES)
                .long(ARG_SECURE_COOKIES)
                .help("Mark the session cookie Secure (serve behind TLS)")
                .env("VESTIBULE_SECURE_COOKIES")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_USER)
                .short('u')
                .long(ARG_USER)
                .help("User allowed to log in, as USER:PASSWORD (repeatable)")
                .env("VESTIBULE_USERS")
                .value_name("USER:PASSWORD")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .hide_env_values(true)
                .required(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn command() -> Command {
        with_args(Command::new("vestibule"))
    }

    #[test]
    fn parse_defaults() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("VESTIBULE_SESSION_TTL", None::<&str>),
                ("VESTIBULE_SESSION_PURGE_INTERVAL", None),
                ("VESTIBULE_SECURE_COOKIES", None),
                ("VESTIBULE_USERS", None),
            ],
            || {
                let matches = command().try_get_matches_from(["vestibule", "--user", "alice:pw"])?;
                let options = Options::parse(&matches)?;
                assert_eq!(options.session_ttl_seconds, 43_200);
                assert_eq!(options.session_purge_interval_seconds, 300);
                assert!(!options.secure_cookies);
                assert_eq!(options.users.len(), 1);
                assert_eq!(options.users[0].0, "alice");
                assert_eq!(options.users[0].1.expose_secret(), "pw");
                Ok(())
            },
        )
    }

    #[test]
    fn parse_repeated_users_and_colon_passwords() -> anyhow::Result<()> {
        temp_env::with_vars([("VESTIBULE_USERS", None::<&str>)], || {
            let matches = command().try_get_matches_from([
                "vestibule",
                "--user",
                "alice:pw",
                "-u",
                "bob:a:b:c",
                "--session-ttl",
                "60",
                "--secure-cookies",
            ])?;
            let options = Options::parse(&matches)?;
            assert_eq!(options.session_ttl_seconds, 60);
            assert!(options.secure_cookies);
            assert_eq!(options.users.len(), 2);
            assert_eq!(options.users[1].0, "bob");
            assert_eq!(options.users[1].1.expose_secret(), "a:b:c");
            Ok(())
        })
    }

    #[test]
    fn parse_env() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("VESTIBULE_USERS", Some("alice:pw,bob:secret")),
                ("VESTIBULE_SESSION_TTL", Some("120")),
                ("VESTIBULE_SESSION_PURGE_INTERVAL", Some("10")),
                ("VESTIBULE_SECURE_COOKIES", Some("true")),
            ],
            || {
                let matches = command().try_get_matches_from(["vestibule"])?;
                let options = Options::parse(&matches)?;
                assert_eq!(options.session_ttl_seconds, 120);
                assert_eq!(options.session_purge_interval_seconds, 10);
                assert!(options.secure_cookies);
                let names: Vec<&str> = options.users.iter().map(|(u, _)| u.as_str()).collect();
                assert_eq!(names, ["alice", "bob"]);
                Ok(())
            },
        )
    }

    #[test]
    fn session_ttl_out_of_range_is_rejected() {
        let too_long = (MAX_SESSION_TTL_SECONDS + 1).to_string();
        temp_env::with_vars(
            [("VESTIBULE_USERS", None::<&str>), ("VESTIBULE_SESSION_TTL", None)],
            || {
                for ttl in ["0", too_long.as_str(), "18446744073709551615"] {
                    let result = command().try_get_matches_from([
                        "vestibule",
                        "--user",
                        "alice:pw",
                        "--session-ttl",
                        ttl,
                    ]);
                    assert!(result.is_err(), "ttl {ttl} should be rejected");
                }
            },
        );
    }

    #[test]
    fn session_ttl_bounds_are_accepted() -> anyhow::Result<()> {
        let longest = MAX_SESSION_TTL_SECONDS.to_string();
        temp_env::with_vars(
            [("VESTIBULE_USERS", None::<&str>), ("VESTIBULE_SESSION_TTL", None)],
            || {
                for ttl in ["1", longest.as_str()] {
                    let matches = command().try_get_matches_from([
                        "vestibule",
                        "--user",
                        "alice:pw",
                        "--session-ttl",
                        ttl,
                    ])?;
                    let options = Options::parse(&matches)?;
                    assert_eq!(options.session_ttl_seconds.to_string(), ttl);
                }
                Ok(())
            },
        )
    }

    #[test]
    fn zero_session_ttl_from_env_is_rejected() {
        temp_env::with_vars(
            [("VESTIBULE_USERS", Some("alice:pw")), ("VESTIBULE_SESSION_TTL", Some("0"))],
            || {
                assert!(command().try_get_matches_from(["vestibule"]).is_err());
            },
        );
    }

    #[test]
    fn users_are_required() {
        temp_env::with_vars([("VESTIBULE_USERS", None::<&str>)], || {
            assert!(command().try_get_matches_from(["vestibule"]).is_err());
        });
    }

    #[test]
    fn malformed_user_is_rejected() -> anyhow::Result<()> {
        temp_env::with_vars([("VESTIBULE_USERS", None::<&str>)], || {
            for entry in ["alice", ":pw"] {
                let matches = command().try_get_matches_from(["vestibule", "--user", entry])?;
                assert!(Options::parse(&matches).is_err());
            }
            Ok(())
        })
    }
}
