#![deny(unsafe_code)]

//! Process entry point: parses the CLI, loads the module configuration, and
//! accepts connections on a dedicated OS thread each.

use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use compress::zlib::CompressionLevel;
use daemon::module::{MemoryCachedModule, Module, ModuleTable};
use daemon::repository::FsRepository;
use daemon::session::SessionHandler;
use tracing::{error, info, warn};

/// A read-only rsync daemon serving an in-memory repository snapshot.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Address to accept connections on.
    #[arg(long, default_value = "127.0.0.1:873")]
    listen: SocketAddr,

    /// Path to an rsyncd.conf-style module configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Increases log verbosity; repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_text = fs::read_to_string(&cli.config)?;
    let module_configs = daemon::config::parse_config(&config_text)?;

    let mut table = ModuleTable::new();
    for module_config in module_configs {
        let repository = FsRepository::new(&module_config.path, module_config.name.clone())?;
        let module: Arc<dyn Module> = Arc::new(MemoryCachedModule::new(
            module_config.name.clone(),
            module_config.comment.clone(),
            repository,
            CompressionLevel::Default,
        )?);
        info!(module = %module_config.name, path = %module_config.path.display(), "module loaded");
        table.insert(module);
    }
    let modules = Arc::new(table);

    let listener = TcpListener::bind(cli.listen)?;
    info!(address = %cli.listen, "listening");

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "failed to accept connection");
                continue;
            }
        };
        let modules = Arc::clone(&modules);
        thread::spawn(move || serve_connection(stream, &modules));
    }

    Ok(())
}

fn serve_connection(mut stream: TcpStream, modules: &ModuleTable) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!(peer = %peer, "connection accepted");

    let mut session = SessionHandler::new(modules);
    let mut read_buf = [0u8; 4096];
    let mut out = Vec::new();

    loop {
        let read = match stream.read(&mut read_buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                warn!(peer = %peer, error = %err, "read failed");
                break;
            }
        };

        out.clear();
        let result = session.handle_bytes(&read_buf[..read], &mut out);

        if !out.is_empty() && stream.write_all(&out).is_err() {
            warn!(peer = %peer, "write failed");
            break;
        }

        match result {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => {
                warn!(peer = %peer, error = %err, "session ended with protocol error");
                break;
            }
        }
    }

    info!(peer = %peer, "connection closed");
}
