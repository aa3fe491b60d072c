// Gang Up CLI: health checks, room setup and scripted bot games against a running server

use clap::{Parser, Subcommand};
use colored::*;
use futures::{SinkExt, StreamExt};
use rand::seq::SliceRandom;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::{self, Write};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "gang-up-cli")]
#[command(about = "Gang Up server CLI", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:3000)
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// Create a room and join it as host
    CreateRoom {
        /// Host display name
        #[arg(short, long, default_value = "Host")]
        name: String,

        /// Keep connection alive and print broadcasts (press Ctrl+C to exit)
        #[arg(short, long)]
        keep_alive: bool,
    },

    /// Play a full game with bots and print the leaderboard
    Simulate {
        /// Number of bot players, host included
        #[arg(short, long, default_value_t = 5)]
        players: usize,

        /// standard, extended or round_robin
        #[arg(short, long, default_value = "standard")]
        mode: String,
    },

    /// Interactive mode - send custom messages
    Interactive,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => {
            check_health(&cli.server).await;
        }
        Commands::CreateRoom { name, keep_alive } => {
            if let Err(e) = create_room(&cli.server, name, *keep_alive).await {
                println!("{} {}", "✗".red(), e);
            }
        }
        Commands::Simulate { players, mode } => {
            if let Err(e) = simulate(&cli.server, *players, mode).await {
                println!("{} Simulation failed: {}", "✗".red(), e);
            }
        }
        Commands::Interactive => {
            interactive_mode(&cli.server).await;
        }
    }
}

/// One WebSocket participant that remembers the latest broadcasts
struct Bot {
    name: String,
    id: String,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_ack: u64,
    room_state: Value,
    draft_state: Value,
}

impl Bot {
    async fn connect(server: &str, name: &str) -> CliResult<Self> {
        let (ws, _) = connect_async(format!("ws://{}/ws", server)).await?;
        Ok(Self {
            name: name.to_string(),
            id: String::new(),
            ws,
            next_ack: 1,
            room_state: Value::Null,
            draft_state: Value::Null,
        })
    }

    /// Sends a request and waits for its ack, recording broadcasts seen meanwhile
    async fn request(&mut self, mut message: Value) -> CliResult<Value> {
        let ack_id = self.next_ack;
        self.next_ack += 1;
        message["ack"] = json!(ack_id);
        self.ws.send(Message::Text(message.to_string())).await?;

        loop {
            let frame = match timeout(REPLY_TIMEOUT, self.ws.next()).await {
                Ok(Some(frame)) => frame?,
                Ok(None) => return Err("connection closed by server".into()),
                Err(_) => return Err(format!("timeout waiting for ack {}", ack_id).into()),
            };
            let Message::Text(text) = frame else {
                continue;
            };
            let value: Value = serde_json::from_str(&text)?;
            match value["type"].as_str() {
                Some("room:state") => {
                    self.draft_state = value["draft"].clone();
                    self.room_state = value;
                }
                Some("draft:state") => self.draft_state = value,
                Some("ack") if value["ack"] == json!(ack_id) => {
                    if value["ok"] == json!(true) {
                        return Ok(value);
                    }
                    let code = value["error"].as_str().unwrap_or("UNKNOWN");
                    return Err(format!("{} rejected: {}", message["type"], code).into());
                }
                _ => {}
            }
        }
    }

    async fn join(&mut self, code: &str) -> CliResult<()> {
        let name = self.name.clone();
        let ack = self
            .request(json!({ "type": "room:join", "code": code, "name": name }))
            .await?;
        self.id = ack["selfId"].as_str().unwrap_or_default().to_string();
        self.room_state = ack["room"].clone();
        Ok(())
    }
}

async fn check_health(server: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = format!("http://{}/health", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
                    println!("  Rooms: {}", body["rooms"]);
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn create_room(server: &str, name: &str, keep_alive: bool) -> CliResult<()> {
    println!("{}", "Creating room...".cyan());

    let mut host = Bot::connect(server, name).await?;
    let ack = host.request(json!({ "type": "room:create" })).await?;
    let code = ack["code"].as_str().unwrap_or("unknown").to_string();
    host.join(&code).await?;

    println!("{} Room created successfully!", "✓".green());
    println!("\n{}", "═".repeat(50).green());
    println!("{} {}", "Room code:".bold(), code.green().bold());
    println!("{}", "═".repeat(50).green());

    if !keep_alive {
        println!("\n{}", "⚠ Note: Connection closed. Room will be deleted.".yellow());
        println!("Use {} to keep the room active.", "--keep-alive".cyan());
        return Ok(());
    }

    println!("\n{}", "Connection is being kept alive...".yellow());
    println!("Press {} to disconnect and close the room.", "Ctrl+C".bold());
    while let Some(frame) = host.ws.next().await {
        match frame {
            Ok(Message::Text(text)) => println!("{} {}", "◀".green(), text.bright_white()),
            Ok(Message::Close(_)) => {
                println!("{} Server closed the connection", "✗".yellow());
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                println!("{} Connection error: {}", "✗".red(), e);
                break;
            }
        }
    }
    Ok(())
}

async fn simulate(server: &str, players: usize, mode: &str) -> CliResult<()> {
    if players < 2 {
        return Err("a game needs at least 2 players".into());
    }
    println!("{} {} bots, {} mode", "Simulating".cyan(), players, mode);

    let mut bots = Vec::with_capacity(players);
    for i in 0..players {
        bots.push(Bot::connect(server, &format!("Bot {}", i + 1)).await?);
    }

    let ack = bots[0].request(json!({ "type": "room:create" })).await?;
    let code = ack["code"].as_str().unwrap_or_default().to_string();
    for bot in bots.iter_mut() {
        bot.join(&code).await?;
    }
    println!("{} Room {} filled", "✓".green(), code.bold());

    bots[0]
        .request(json!({ "type": "room:setGameMode", "mode": mode }))
        .await?;
    bots[0].request(json!({ "type": "draft:start" })).await?;

    let ids: Vec<String> = bots.iter().map(|b| b.id.clone()).collect();
    for bot in bots.iter_mut() {
        let mut others: Vec<&String> = ids.iter().filter(|id| **id != bot.id).collect();
        others.shuffle(&mut rand::thread_rng());
        let second = others.first().map(|id| id.to_string());
        let teammates: Vec<String> = others.iter().skip(1).take(2).map(|id| id.to_string()).collect();
        bot.request(json!({
            "type": "draft:pick",
            "teammates": teammates,
            "secondInCommand": second,
        }))
        .await?;
    }
    println!("{} Draft picks submitted", "✓".green());

    bots[0].request(json!({ "type": "draft:end" })).await?;
    bots[0].request(json!({ "type": "reveal:continue" })).await?;

    while bots[0].draft_state["phase"] == "voting" {
        let voting = bots[0].draft_state["voting"].clone();
        let current: Vec<String> = voting["current"]
            .as_array()
            .map(|pair| pair.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        if current.len() == 2 {
            println!(
                "  Round {}/{}: {}",
                voting["index"].as_u64().unwrap_or(0) + 1,
                voting["total"],
                voting["prompt"].as_str().unwrap_or("").bright_white()
            );
            for bot in bots.iter_mut() {
                if current.contains(&bot.id) {
                    continue;
                }
                let choice = current.choose(&mut rand::thread_rng()).cloned();
                bot.request(json!({ "type": "vote:cast", "choice": choice })).await?;
            }
        }
        bots[0].request(json!({ "type": "voting:next" })).await?;
    }

    print_leaderboard(&bots[0]);
    Ok(())
}

fn print_leaderboard(host: &Bot) {
    let names: BTreeMap<String, String> = host.room_state["players"]
        .as_array()
        .map(|players| {
            players
                .iter()
                .map(|p| {
                    (
                        p["id"].as_str().unwrap_or_default().to_string(),
                        p["name"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    let results = &host.room_state["results"];

    for (title, key) in [("Personal", "personalTotals"), ("Team", "teamTotals")] {
        let mut rows: Vec<(String, f64)> = results[key]
            .as_object()
            .map(|totals| {
                totals
                    .iter()
                    .map(|(id, v)| (id.clone(), v.as_f64().unwrap_or(0.0)))
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));

        println!("\n{}", format!("{} leaderboard", title).bold().green());
        println!("{}", "─".repeat(40));
        for (id, points) in rows {
            let name = names.get(&id).map(String::as_str).unwrap_or(&id);
            println!("  {:<28} {:>8.1}", name, points);
        }
    }
}

async fn interactive_mode(server: &str) {
    println!("\n{}", "Interactive Mode".bold().green());
    println!("{}", "═".repeat(60).green());
    println!("Type {} for help, {} to quit\n", "help".cyan(), "quit".cyan());

    let url = format!("ws://{}/ws", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} Connected to server", "✓".green());

            let (mut write, mut read) = ws_stream.split();

            let receive_task = tokio::spawn(async move {
                while let Some(Ok(msg)) = read.next().await {
                    if let Message::Text(text) = msg {
                        println!("\n{} {}", "◀".green(), text.bright_white());
                    }
                }
            });

            loop {
                print!("{} ", "►".cyan());
                if io::stdout().flush().is_err() {
                    break;
                }

                let mut input = String::new();
                if io::stdin().read_line(&mut input).is_err() {
                    break;
                }

                let input = input.trim();

                if input.is_empty() {
                    continue;
                }

                if input == "quit" || input == "exit" {
                    println!("Goodbye!");
                    break;
                }

                if input == "help" {
                    print_interactive_help();
                    continue;
                }

                if let Ok(parsed) = serde_json::from_str::<Value>(input) {
                    if write.send(Message::Text(parsed.to_string())).await.is_ok() {
                        println!("{} Message sent", "✓".green());
                    } else {
                        println!("{} Failed to send message", "✗".red());
                        break;
                    }
                } else {
                    println!("{} Invalid JSON. Type 'help' for examples.", "✗".yellow());
                }
            }

            receive_task.abort();
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

fn print_interactive_help() {
    println!("\n{}", "Interactive Mode Commands".bold());
    println!("{}", "─".repeat(60));
    println!("Send JSON messages directly to the server.\n");

    println!("{}", "Example Messages:".bold());
    println!("\n{}:", "Create Room".cyan());
    println!(r#"  {{"type":"room:create","ack":1}}"#);

    println!("\n{}:", "Join Room".cyan());
    println!(r#"  {{"type":"room:join","ack":2,"code":"123456","name":"Ana"}}"#);

    println!("\n{}:", "Pick Team".cyan());
    println!(r#"  {{"type":"draft:pick","teammates":["<id>","<id>"],"secondInCommand":"<id>"}}"#);

    println!("\n{}:", "Vote".cyan());
    println!(r#"  {{"type":"vote:cast","choice":"<id>","comment":"obviously"}}"#);

    println!("\n{}:", "Host Controls".cyan());
    println!(r#"  draft:start  draft:end  reveal:continue  voting:next  voting:complete  admin:backToLobby"#);

    println!("\n{}: quit, exit", "Commands".bold());
    println!();
}
