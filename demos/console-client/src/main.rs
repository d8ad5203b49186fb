//! Minimal terminal client.
//!
//! ```text
//! console-client <host> <port> <nickname> [config.json]
//! ```
//!
//! Type `help` for the commands. Log verbosity follows `RUST_LOG`.

use std::error::Error;

use okobere::protocol::{GameEvent, hand_value};
use okobere::{ClientConfig, ClientEvent, GameClient, LoginOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Rooms,
    Create(String),
    Join(u32),
    Leave,
    Hit,
    Stand,
    Accept,
    Decline,
    Retry,
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    match word {
        "rooms" => Ok(Command::Rooms),
        "create" if !rest.is_empty() => Ok(Command::Create(rest.to_string())),
        "create" => Err("usage: create <name>".into()),
        "join" => rest
            .parse()
            .map(Command::Join)
            .map_err(|_| "usage: join <room id>".into()),
        "leave" => Ok(Command::Leave),
        "hit" => Ok(Command::Hit),
        "stand" => Ok(Command::Stand),
        "accept" => Ok(Command::Accept),
        "decline" => Ok(Command::Decline),
        "retry" => Ok(Command::Retry),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command {other:?}, try help")),
    }
}

const HELP: &str = "rooms | create <name> | join <id> | leave | hit | stand | \
                    accept | decline | retry | status | quit";

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <host> <port> <nickname> [config.json]", args[0]);
        std::process::exit(2);
    }
    let host = &args[1];
    let port: u16 = args[2].parse()?;
    let nickname = &args[3];
    let config = match args.get(4) {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => ClientConfig::default(),
    };

    let (client, mut events) = GameClient::new(config);
    client.connect(host, port).await?;
    match client.login(nickname, None).await? {
        LoginOutcome::LoggedIn(state) => info!(%state, "logged in"),
        LoginOutcome::ReconnectOffered(offer) => println!(
            "unfinished game in room {} against {}: accept or decline?",
            offer.room_id, offer.opponent
        ),
    }
    println!("{HELP}");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = run_command(&client, command).await {
                            println!("error: {e}");
                        }
                    }
                    Err(message) => println!("{message}"),
                }
            }
            Some(event) = events.recv() => print_event(&event),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.disconnect().await;
    Ok(())
}

async fn run_command(client: &GameClient, command: Command) -> Result<(), okobere::ClientError> {
    match command {
        Command::Rooms => {
            let rooms = client.list_rooms().await?;
            if rooms.is_empty() {
                println!("no rooms");
            }
            for room in rooms {
                println!(
                    "{:>6}  {:<20} {}/{}  {:?}",
                    room.id, room.name, room.player_count, room.max_players, room.status
                );
            }
        }
        Command::Create(name) => {
            let id = client.create_room(&name).await?;
            println!("created room {id}, waiting for an opponent");
        }
        Command::Join(id) => {
            client.join_room(id).await?;
            println!("joined room {id}");
        }
        Command::Leave => client.leave_room().await?,
        Command::Hit => client.hit().await?,
        Command::Stand => client.stand().await?,
        Command::Accept => client.accept_reconnect().await?,
        Command::Decline => client.decline_reconnect().await?,
        Command::Retry => client.retry_reconnect()?,
        Command::Status => {
            let snapshot = client.snapshot().await;
            match serde_json::to_string_pretty(&snapshot) {
                Ok(json) => println!("{json}"),
                Err(e) => println!("error: {e}"),
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Game(GameEvent::YourTurn) => println!("your turn: hit or stand"),
        ClientEvent::Game(GameEvent::DealCards { cards }) => {
            println!("dealt {} (value {})", join_cards(cards), hand_value(cards));
        }
        ClientEvent::Game(GameEvent::Card(card)) => println!("you drew {card}"),
        ClientEvent::Game(GameEvent::RoundEnd {
            winner,
            your_total,
            opponent_total,
            ..
        }) => println!("round over: {winner:?} ({your_total} vs {opponent_total})"),
        ClientEvent::Game(GameEvent::GameEnd {
            winner,
            your_score,
            opponent_score,
        }) => println!("game over: {winner:?} ({your_score}:{opponent_score})"),
        ClientEvent::Game(other) => println!("{other:?}"),
        ClientEvent::GameStarted(start) => {
            println!("game started as {} against {}", start.role.as_str(), start.opponent);
        }
        ClientEvent::ReconnectOffered(offer) => println!(
            "unfinished game in room {} against {}: accept or decline?",
            offer.room_id, offer.opponent
        ),
        ClientEvent::Reconnecting {
            attempt,
            max_attempts,
        } => println!("reconnecting ({attempt}/{max_attempts})..."),
        ClientEvent::ReconnectFailed => println!("could not reconnect, type retry"),
        other => println!("{other:?}"),
    }
}

fn join_cards(cards: &[okobere::protocol::Card]) -> String {
    cards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
