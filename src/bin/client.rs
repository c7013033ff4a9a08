//! maildrop Client Binary
//!
//! Interactive command loop for talking to a maildrop server.

use std::io::{BufRead, Write};

use clap::Parser;
use maildrop::network::Client;
use maildrop::protocol::MessageKind;
use maildrop::Config;
use tracing_subscriber::{fmt, EnvFilter};

const HELP_TEXT: &str = "\
'register': Register your name and public key with the server.
'login': Get a token from the server for sending and receiving messages.
'key': Request a user's public key so you can send them messages.
'create': Send a message to another user.
'read': Get all messages sent to you.
'help': Show this message.
'exit': Quit the application.";

/// maildrop Client
#[derive(Parser, Debug)]
#[command(name = "maildrop-client")]
#[command(about = "Interactive client for the maildrop messaging server")]
#[command(version)]
struct Args {
    /// Server hostname or address
    hostname: String,

    /// Server port
    #[arg(value_parser = parse_port)]
    port: u16,

    /// Name to operate under
    username: String,
}

/// Validate a port number argument
fn parse_port(value: &str) -> Result<u16, String> {
    let port: u32 = value
        .parse()
        .map_err(|_| "Port number must be an integer".to_string())?;

    if !(1024..=64000).contains(&port) {
        return Err("Port number must be in the range 1024-64000 (inclusive)".to_string());
    }

    Ok(port as u16)
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,maildrop=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .hostname(&args.hostname)
        .port(args.port)
        .build();

    let mut client = match Client::connect(&config, &args.username) {
        Ok(client) => client,
        Err(error) => {
            tracing::error!("Failed to connect to the server: {}", error);
            std::process::exit(1);
        }
    };

    println!("{}", HELP_TEXT);

    let stdin = std::io::stdin();
    loop {
        let Some(line) = prompt_line(&stdin, "Please enter a request type: ") else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" => break,
            "help" => {
                println!("{}", HELP_TEXT);
                continue;
            }
            word => match word.parse::<MessageKind>() {
                Ok(kind) => run_command(&mut client, kind, &stdin),
                Err(error) => tracing::warn!("{}", error),
            },
        }
    }
}

/// Execute one interactive command, reporting errors without exiting
fn run_command(client: &mut Client, kind: MessageKind, stdin: &std::io::Stdin) {
    let result = match kind {
        MessageKind::Register => client.register(),

        MessageKind::Login => client.login(),

        MessageKind::Key => {
            let Some(name) = prompt_line(stdin, "Whose key are we requesting? ") else {
                return;
            };
            client.fetch_key(name.trim()).map(|key| {
                if key.is_some() {
                    println!("Received {}'s key", name.trim());
                } else {
                    println!("The requested user is not registered");
                }
            })
        }

        MessageKind::Create => {
            let Some(receiver) = prompt_line(stdin, "Enter the name of the receiver: ") else {
                return;
            };
            let Some(message) = prompt_line(stdin, "Enter the message to be sent: ") else {
                return;
            };
            client.send_message(receiver.trim(), message.trim())
        }

        MessageKind::Read => client.read_messages().map(|(messages, more)| {
            if messages.is_empty() {
                println!("No messages available");
                return;
            }
            for message in &messages {
                println!("\nMessage from {}:\n{}", message.sender_name, message.text);
            }
            if more {
                println!("More messages available, please send another request");
            }
        }),

        // Response kinds never parse from user input
        _ => return,
    };

    if let Err(error) = result {
        tracing::error!("{}", error);
    }
}

/// Print a prompt and read one line; `None` on end of input
fn prompt_line(stdin: &std::io::Stdin, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}
