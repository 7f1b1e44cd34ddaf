//! `atlink` command-line tool.
//!
//! - `atlink replay <file>`: run a captured byte log through the parser
//! - `atlink tcp <addr> -c AT -c AT+CSQ?`: talk to a modem behind a
//!   serial-over-TCP bridge
//!
//! Records are printed to stdout as JSON lines; logs go to stderr.

use std::fs::File;
use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use atlink_protocol::encode_line;
use atlink_runtime::{
    connect_with, replay, write_record, Connection, LinkConfig, LinkError, LinkResult,
};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "atlink", version, about = "Decode responses from AT command modems")]
struct Cli {
    /// YAML link configuration.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a captured byte log through the parser.
    Replay {
        /// File holding the raw bytes received from the modem.
        file: PathBuf,

        /// Bytes per read, to mimic the original transport.
        #[arg(long, default_value_t = 32)]
        chunk_size: usize,
    },

    /// Talk to a modem exposed by a serial-over-TCP bridge.
    Tcp {
        /// Bridge address, e.g. 192.168.1.20:4001.
        addr: String,

        /// Command line to send (CR is appended). May be repeated.
        #[arg(short = 'c', long = "command")]
        commands: Vec<String>,

        /// Keep printing unsolicited responses until Ctrl-C.
        #[arg(long)]
        listen: bool,

        /// Seconds to wait for each command's final result.
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> LinkResult<()> {
    let mut config = match &cli.config {
        Some(path) => LinkConfig::from_yaml_file(path)?,
        None => LinkConfig::default(),
    };

    match cli.command {
        Commands::Replay { file, chunk_size } => {
            config.read_buffer_size = chunk_size;
            replay_file(&file, &config)
        }
        Commands::Tcp {
            addr,
            commands,
            listen,
            timeout_secs,
        } => {
            let timeout = Duration::from_secs(timeout_secs);
            tcp_session(&addr, &commands, listen, timeout, &config)
        }
    }
}

fn replay_file(path: &Path, config: &LinkConfig) -> LinkResult<()> {
    info!("replaying {}", path.display());
    let file = File::open(path)?;
    replay(file, &mut io::stdout().lock(), config)?;
    Ok(())
}

fn tcp_session(
    addr: &str,
    commands: &[String],
    listen: bool,
    timeout: Duration,
    config: &LinkConfig,
) -> LinkResult<()> {
    let stream = TcpStream::connect(addr)?;
    info!("connected to {}", addr);

    let control = stream.try_clone()?;
    let interrupt = stream.try_clone()?;
    ctrlc::set_handler(move || {
        let _ = interrupt.shutdown(Shutdown::Both);
    })
    .map_err(|e| LinkError::Config(format!("cannot install Ctrl-C handler: {}", e)))?;

    let conn = connect_with(stream.try_clone()?, stream, config)?;
    let mut out = io::stdout().lock();

    for line in commands {
        conn.send(encode_line(line))?;
        loop {
            match conn.recv_timeout(timeout) {
                Ok(record) => {
                    write_record(&mut out, &record)?;
                    if record.is_final_result() {
                        break;
                    }
                }
                Err(LinkError::Timeout) => {
                    warn!("no final result for {:?}", line);
                    break;
                }
                Err(e) => return finish(conn, &control, Err(e)),
            }
        }
        out.flush()?;
    }

    if !listen {
        let _ = control.shutdown(Shutdown::Both);
    }
    for record in conn.responses() {
        write_record(&mut out, &record)?;
        out.flush()?;
    }
    finish(conn, &control, Ok(()))
}

/// Close the socket so the reader sees end-of-stream, then stop the pipeline.
///
/// A pipeline error takes precedence over `result`.
fn finish(conn: Connection, socket: &TcpStream, result: LinkResult<()>) -> LinkResult<()> {
    // Already closed after Ctrl-C or a clean session.
    let _ = socket.shutdown(Shutdown::Both);
    conn.shutdown()?;
    result
}
