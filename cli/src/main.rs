//! Terminal harness for the DCC transfer engine (SPEC_FULL §1), adapted
//! from the teacher's `server_run`/`read_from_stdin` shape
//! (`server/src/main.rs`, `server/src/server_handler.rs`): a stdin reader
//! thread feeds line commands through a channel into a loop that also
//! calls [`engine::DccEngine::tick`] on a fixed interval. There is no IRC
//! connection here (out of scope, spec §1) — offer lines are printed for
//! the operator to relay over whatever IRC link they're testing against,
//! and incoming offer lines are pasted back in.

mod sink;

use clap::Parser;
use engine::DccEngine;
use model::config::DccConfig;
use model::offer::DccOffer;
use model::transfer::ServerHandle;
use sink::TerminalSink;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(100);
const SERVER: ServerHandle = ServerHandle(0);

#[derive(Parser, Debug)]
#[command(name = "dcc", about = "Drives a DCC transfer engine from the terminal")]
struct Args {
    /// Path to a TOML config file (SPEC_FULL §1). Defaults are used if absent.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match DccConfig::from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("failed to load {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => DccConfig::default(),
    };

    let mut engine = DccEngine::new(
        Arc::new(config),
        Arc::new(TerminalSink::new()),
        Arc::new(model::codec::PlainCodec),
        Arc::new(model::codec::PlainCodec),
        None,
    );

    let commands = spawn_stdin_reader();
    println!("ready. commands: send <nick> <path> | chat <nick> | offer <nick> <line> | offerchat <nick> <line> | accept <id> | acceptchat <id> | quit");

    loop {
        engine.tick(SERVER);

        match commands.recv_timeout(TICK_INTERVAL) {
            Ok(Command::Quit) => break,
            Ok(command) => run_command(&mut engine, command),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

enum Command {
    SendFile { nick: String, path: PathBuf },
    OfferChat { nick: String },
    IncomingFile { nick: String, line: String },
    IncomingChat { nick: String, line: String },
    ConnectFile { id: u32 },
    ConnectChat { id: u32 },
    Quit,
}

fn spawn_stdin_reader() -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        loop {
            let mut line = String::new();
            if stdin.read_line(&mut line).unwrap_or(0) == 0 {
                let _ = tx.send(Command::Quit);
                break;
            }
            let Some(command) = parse_command(line.trim()) else {
                if !line.trim().is_empty() {
                    eprintln!("unrecognized command: {}", line.trim());
                }
                continue;
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });
    rx
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.splitn(3, ' ');
    match parts.next()? {
        "send" => Some(Command::SendFile {
            nick: parts.next()?.to_string(),
            path: PathBuf::from(parts.next()?),
        }),
        "chat" => Some(Command::OfferChat { nick: parts.next()?.to_string() }),
        "offer" => Some(Command::IncomingFile {
            nick: parts.next()?.to_string(),
            line: parts.next()?.to_string(),
        }),
        "offerchat" => Some(Command::IncomingChat {
            nick: parts.next()?.to_string(),
            line: parts.next()?.to_string(),
        }),
        "accept" => Some(Command::ConnectFile { id: parts.next()?.parse().ok()? }),
        "acceptchat" => Some(Command::ConnectChat { id: parts.next()?.parse().ok()? }),
        "quit" => Some(Command::Quit),
        _ => None,
    }
}

fn run_command(engine: &mut DccEngine, command: Command) {
    match command {
        Command::SendFile { nick, path } => match engine::create::offer_send_file(engine, SERVER, &nick, &path) {
            Ok((_, line)) => println!("{line}"),
            Err(e) => eprintln!("error: {e}"),
        },
        Command::OfferChat { nick } => match engine::create::offer_chat(engine, SERVER, &nick) {
            Ok((_, line)) => println!("{line}"),
            Err(e) => eprintln!("error: {e}"),
        },
        Command::IncomingFile { nick, line } => match DccOffer::parse(&line) {
            Ok(offer) => match engine::create::register_incoming_file(engine, SERVER, &nick, &offer) {
                Ok(id) => println!("offer {} registered ({nick})", id.as_raw()),
                Err(e) => eprintln!("error: {e}"),
            },
            Err(e) => eprintln!("error: {e}"),
        },
        Command::IncomingChat { nick, line } => match DccOffer::parse(&line) {
            Ok(offer) => match engine::create::register_incoming_chat(engine, SERVER, &nick, &offer) {
                Ok(id) => println!("chat offer {} registered ({nick})", id.as_raw()),
                Err(e) => eprintln!("error: {e}"),
            },
            Err(e) => eprintln!("error: {e}"),
        },
        Command::ConnectFile { id } => {
            if let Err(e) = engine::create::connect_incoming_file(engine, model::transfer::TransferId::from_raw(id)) {
                eprintln!("error: {e}");
            }
        }
        Command::ConnectChat { id } => {
            if let Err(e) = engine::create::connect_incoming_chat(engine, model::transfer::TransferId::from_raw(id)) {
                eprintln!("error: {e}");
            }
        }
        Command::Quit => {}
    }
}
