use crate::cli::{
    actions::{server::Args, Action},
    commands::{auth, ARG_PORT},
};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        session_purge_interval_seconds: auth_opts.session_purge_interval_seconds,
        secure_cookies: auth_opts.secure_cookies,
        users: auth_opts.users,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn handler_builds_server_action() -> Result<()> {
        temp_env::with_vars(
            [
                ("VESTIBULE_PORT", None::<&str>),
                ("VESTIBULE_USERS", None),
                ("VESTIBULE_SESSION_TTL", None),
            ],
            || {
                let matches = commands::new().try_get_matches_from([
                    "vestibule",
                    "--user",
                    "username:password",
                    "--session-ttl",
                    "600",
                ])?;
                let Action::Server(args) = handler(&matches)?;
                assert_eq!(args.port, 8080);
                assert_eq!(args.session_ttl_seconds, 600);
                assert_eq!(args.users.len(), 1);
                Ok(())
            },
        )
    }
}
