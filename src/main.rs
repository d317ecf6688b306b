use clap::{Arg, Command};
use log::error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use homestead::auth::password::read_password;
use homestead::utils::io::prompt;
use homestead::utils::logging::init_logging;
use homestead::utils::time::format_timestamp;
use homestead::{AppConfig, AuthService};

fn cli() -> Command {
    Command::new("homestead")
        .about("Manage homestead user accounts and session tokens")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Path to a JSON configuration file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("register")
                .about("Register a new user")
                .arg(Arg::new("name").help("The user name (prompted if omitted)")),
        )
        .subcommand(
            Command::new("login")
                .about("Check a password and print a session token")
                .arg(Arg::new("name").help("The user name (prompted if omitted)")),
        )
        .subcommand(
            Command::new("whoami")
                .about("Show the user a session token belongs to")
                .arg(Arg::new("token").help("The session token").required(true)),
        )
        .subcommand(Command::new("users").about("Show how many users are registered"))
}

/// Use the name given on the command line or ask for it
fn name_argument(matches: &clap::ArgMatches) -> io::Result<String> {
    match matches.get_one::<String>("name") {
        Some(name) => Ok(name.clone()),
        None => prompt("User name"),
    }
}

fn ask_password(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    read_password()
}

fn run(auth: &AuthService, matches: &clap::ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("register", sub_matches)) => {
            let name = name_argument(sub_matches)?;
            let password = ask_password("Password")?;
            let confirm = ask_password("Confirm password")?;
            if password != confirm {
                return Err("Passwords don't match".into());
            }

            match auth.register(&name, &password) {
                Ok(id) => println!("User {} registered with id {}", name, id),
                Err(e) => {
                    println!("{}", e.user_message());
                    return Err(e.into());
                }
            }
        }
        Some(("login", sub_matches)) => {
            let name = name_argument(sub_matches)?;
            let password = ask_password("Password")?;

            match auth.login(&name, &password) {
                Ok(session) => {
                    println!("{}", session.token);
                    println!("Set-Cookie: {}", session.set_cookie);
                }
                Err(e) => {
                    println!("{}", e.user_message());
                    return Err(e.into());
                }
            }
        }
        Some(("whoami", sub_matches)) => {
            let token = sub_matches
                .get_one::<String>("token")
                .ok_or("missing token")?;
            let header = format!("{}={}", homestead::SESSION_COOKIE, token);
            let ctx = auth.request_context(Some(&header));

            match auth.current_user(&ctx)? {
                Some(user) => println!(
                    "{} (id {}, registered {})",
                    user.name,
                    user.id,
                    format_timestamp(user.created_at)
                ),
                None => {
                    println!("Not logged in");
                    process::exit(1);
                }
            }
        }
        Some(("users", _)) => {
            println!("{} registered users", auth.credentials().len()?);
        }
        _ => unreachable!("a subcommand is required"),
    }
    Ok(())
}

fn main() {
    let matches = cli().get_matches();

    let config = match AppConfig::load(matches.get_one::<PathBuf>("config").map(|p| p.as_path())) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // Without a usable secret the process must not start
    let auth = match AuthService::from_config(&config) {
        Ok(auth) => auth,
        Err(e) => {
            error!("Refusing to start: {}", e);
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    if let Err(e) = run(&auth, &matches) {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}
