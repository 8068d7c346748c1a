pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};
use std::path::PathBuf;

pub const CMD_HASH: &str = "hash";
pub const CMD_VERIFY: &str = "verify";
pub const CMD_GENERATE: &str = "generate";
pub const CMD_DECODE: &str = "decode";
pub const CMD_SCHEMES: &str = "schemes";

fn secret_args() -> [Arg; 2] {
    [
        Arg::new("secret")
            .short('s')
            .long("secret")
            .help("Plaintext password")
            .env("PASSWD_EXOP_SECRET")
            .hide_env_values(true)
            .conflicts_with("secret-file"),
        Arg::new("secret-file")
            .short('T')
            .long("secret-file")
            .help("Read the plaintext password from the first line of a file")
            .value_parser(clap::value_parser!(PathBuf)),
    ]
}

fn hash_command() -> Command {
    Command::new(CMD_HASH)
        .about("Hash a password, generating one when none is given")
        .arg(
            Arg::new("scheme")
                .long("scheme")
                .help("Password scheme, e.g. {SSHA512}")
                .env("PASSWD_EXOP_SCHEME"),
        )
        .args(secret_args())
}

fn verify_command() -> Command {
    Command::new(CMD_VERIFY)
        .about("Check a password against stored values")
        .arg(
            Arg::new("hash")
                .long("hash")
                .help("Stored value, e.g. {SSHA}..., may be repeated")
                .required(true)
                .action(ArgAction::Append),
        )
        .args(secret_args())
}

fn generate_command() -> Command {
    Command::new(CMD_GENERATE)
        .about("Generate a random password")
        .arg(
            Arg::new("length")
                .short('l')
                .long("length")
                .help("Number of characters")
                .default_value("8")
                .env("PASSWD_EXOP_LENGTH")
                .value_parser(clap::value_parser!(u16).range(1..=4096)),
        )
}

fn decode_command() -> Command {
    Command::new(CMD_DECODE)
        .about("Decode a base64 request payload and print it as JSON")
        .arg(
            Arg::new("payload")
                .help("Base64 encoded payload")
                .required(true),
        )
        .arg(
            Arg::new("response")
                .long("response")
                .help("Decode a response payload instead of a request")
                .action(ArgAction::SetTrue),
        )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("passwd-exop")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(hash_command())
        .subcommand(verify_command())
        .subcommand(generate_command())
        .subcommand(decode_command())
        .subcommand(Command::new(CMD_SCHEMES).about("List supported password schemes"));

    logging::with_args(command)
}
