//! pgpkit command line
//!
//! Key creation, listing and deletion plus random data on top of the
//! pgpkit engine. The keyring lives in `$PGPKIT_HOME`.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use pgpkit_common::Protocol;
use pgpkit_engine::{Context, EngineConfig};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// pgpkit CLI
#[derive(Parser, Debug)]
#[command(name = "pgpkit")]
#[command(about = "OpenPGP key management and random data")]
struct Cli {
    /// Keyring directory (defaults to $PGPKIT_HOME, in-memory if unset)
    #[arg(long, global = true)]
    homedir: Option<PathBuf>,

    /// Protocol of the engine context (openpgp, cms)
    #[arg(long, global = true, default_value = "openpgp", value_parser = parse_protocol)]
    protocol: Protocol,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print random data
    Genrandom(GenrandomArgs),
    /// Create a key, or add a subkey with --addkey
    Createkey(CreatekeyArgs),
    /// List keys
    Listkeys {
        /// Fingerprint or user ID to show
        pattern: Option<String>,
        /// Only keys with a secret part
        #[arg(long)]
        secret: bool,
    },
    /// Delete a key
    Deletekey(DeletekeyArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct GenrandomArgs {
    /// Print a random number in [0, LIMIT)
    #[arg(long, value_name = "LIMIT")]
    number: Option<u32>,
    /// Print COUNT random bytes as hex
    #[arg(long, value_name = "COUNT")]
    bytes: Option<usize>,
    /// Print a random z-base-32 string
    #[arg(long)]
    zbase32: bool,
}

#[derive(Args, Debug)]
struct CreatekeyArgs {
    /// Add a subkey to the key with fingerprint TARGET
    #[arg(long)]
    addkey: bool,
    #[arg(long)]
    certify: bool,
    #[arg(long)]
    sign: bool,
    #[arg(long)]
    encrypt: bool,
    #[arg(long)]
    authenticate: bool,
    /// Mark the key as a group key
    #[arg(long)]
    group: bool,
    /// Store the secret key without passphrase
    #[arg(long)]
    unprotected: bool,
    /// Create the key even if the user ID exists
    #[arg(long)]
    force: bool,
    /// Key never expires
    #[arg(long)]
    no_expire: bool,
    /// Lifetime in seconds (0 uses the configured default)
    #[arg(long, default_value = "0")]
    expire: u64,
    #[arg(long, default_value = "default")]
    algo: String,
    /// Read the passphrase answered to every prompt from PATH ("-" for stdin)
    #[arg(long, value_name = "PATH", env = "PGPKIT_PASSPHRASE_FILE")]
    passphrase_file: Option<PathBuf>,
    /// User ID, or fingerprint with --addkey
    target: String,
}

#[derive(Args, Debug)]
struct DeletekeyArgs {
    /// Also delete the secret key
    #[arg(long)]
    secret: bool,
    /// Do not ask for confirmation
    #[arg(long)]
    force: bool,
    /// Fingerprint or user ID
    pattern: String,
}

fn parse_protocol(name: &str) -> Result<Protocol, String> {
    match Protocol::from_name(name) {
        Protocol::Unknown => Err(format!("unknown protocol {:?}", name)),
        protocol => Ok(protocol),
    }
}

/// First line of `path`, or of stdin for `-`.
fn read_passphrase(path: &Path) -> anyhow::Result<String> {
    let mut line = String::new();
    if path == Path::new("-") {
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read passphrase from stdin")?;
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read passphrase from {}", path.display()))?;
        line = data.lines().next().unwrap_or_default().to_string();
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env();
    if let Some(home) = cli.homedir {
        config.home_dir = Some(home);
    }
    debug!(?config, "Loaded configuration");

    let ctx = commands::check("create context", Context::create(cli.protocol, config))?;
    let Some(ctx) = ctx else {
        return Ok(());
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Genrandom(args) => commands::genrandom(&ctx, &args.into(), &mut out),
        Command::Createkey(args) => {
            commands::createkey(&ctx, &commands::KeyRequest::try_from(args)?, &mut out)
        }
        Command::Listkeys { pattern, secret } => {
            commands::listkeys(&ctx, pattern.as_deref(), secret, &mut out)
        }
        Command::Deletekey(args) => commands::deletekey(&ctx, &args.into(), &mut out),
    }
}

impl From<GenrandomArgs> for commands::RandomRequest {
    fn from(args: GenrandomArgs) -> Self {
        match (args.number, args.bytes) {
            (Some(limit), _) => commands::RandomRequest::Number(limit),
            (None, Some(count)) => commands::RandomRequest::Bytes(count),
            (None, None) => commands::RandomRequest::ZBase32,
        }
    }
}

impl TryFrom<CreatekeyArgs> for commands::KeyRequest {
    type Error = anyhow::Error;

    fn try_from(args: CreatekeyArgs) -> anyhow::Result<Self> {
        let passphrase = args
            .passphrase_file
            .as_deref()
            .map(read_passphrase)
            .transpose()?;
        Ok(commands::KeyRequest {
            add_subkey: args.addkey,
            certify: args.certify,
            sign: args.sign,
            encrypt: args.encrypt,
            authenticate: args.authenticate,
            group: args.group,
            unprotected: args.unprotected,
            force: args.force,
            no_expire: args.no_expire,
            expires: args.expire,
            algorithm: args.algo,
            passphrase,
            target: args.target,
        })
    }
}

impl From<DeletekeyArgs> for commands::DeleteRequest {
    fn from(args: DeletekeyArgs) -> Self {
        commands::DeleteRequest {
            secret: args.secret,
            force: args.force,
            pattern: args.pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_genrandom_requires_one_mode() {
        assert!(Cli::try_parse_from(["pgpkit", "genrandom"]).is_err());
        assert!(Cli::try_parse_from(["pgpkit", "genrandom", "--number", "6", "--zbase32"]).is_err());

        let cli = Cli::try_parse_from(["pgpkit", "genrandom", "--bytes", "16"]).unwrap();
        let Command::Genrandom(args) = cli.command else {
            panic!("expected genrandom");
        };
        assert_eq!(
            commands::RandomRequest::from(args),
            commands::RandomRequest::Bytes(16)
        );
    }

    #[test]
    fn test_createkey_arguments() {
        let cli = Cli::try_parse_from([
            "pgpkit",
            "--homedir",
            "/tmp/keys",
            "createkey",
            "--sign",
            "--unprotected",
            "--expire",
            "3600",
            "alice@example.org",
        ])
        .unwrap();
        assert_eq!(cli.homedir.as_deref(), Some(Path::new("/tmp/keys")));
        assert_eq!(cli.protocol, Protocol::OpenPgp);

        let Command::Createkey(args) = cli.command else {
            panic!("expected createkey");
        };
        let request = commands::KeyRequest::try_from(args).unwrap();
        assert!(request.sign && request.unprotected);
        assert!(request.passphrase.is_none());
        assert!(!request.add_subkey);
        assert_eq!(request.expires, 3600);
        assert_eq!(request.algorithm, "default");
        assert_eq!(request.target, "alice@example.org");
    }

    #[test]
    fn test_passphrase_is_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "correct horse").unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["pgpkit", "createkey", "--passphrase-file", path, "bob"])
            .unwrap();
        let Command::Createkey(args) = cli.command else {
            panic!("expected createkey");
        };
        let request = commands::KeyRequest::try_from(args).unwrap();
        assert_eq!(request.passphrase.as_deref(), Some("correct horse"));

        assert!(Cli::try_parse_from(["pgpkit", "createkey", "--passphrase", "pw", "bob"]).is_err());

        let cli = Cli::try_parse_from([
            "pgpkit",
            "createkey",
            "--passphrase-file",
            "/nonexistent/passphrase",
            "bob",
        ])
        .unwrap();
        let Command::Createkey(args) = cli.command else {
            panic!("expected createkey");
        };
        assert!(commands::KeyRequest::try_from(args).is_err());
    }

    #[test]
    fn test_protocol_option() {
        let cli = Cli::try_parse_from(["pgpkit", "--protocol", "CMS", "listkeys"]).unwrap();
        assert_eq!(cli.protocol, Protocol::Cms);
        assert!(matches!(
            Context::create(cli.protocol, EngineConfig::default()),
            Err(pgpkit_common::Error::NotSupported(_))
        ));

        let cli = Cli::try_parse_from(["pgpkit", "listkeys", "--protocol", "pgp"]).unwrap();
        assert_eq!(cli.protocol, Protocol::OpenPgp);
        assert!(Cli::try_parse_from(["pgpkit", "--protocol", "x509", "listkeys"]).is_err());
    }

    #[test]
    fn test_createkey_requires_target() {
        assert!(Cli::try_parse_from(["pgpkit", "createkey", "--sign"]).is_err());
    }
}
