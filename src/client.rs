use std::io::Write as _;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;

use crate::protocol::JOIN_COMMAND;
use crate::rooms::RoomName;

pub const HELP_COMMAND: &str = "/help";
pub const EXIT_COMMAND: &str = "/exit";

/// Interactive client loop: forwards stdin lines to the server and prints
/// whatever the server relays back, concurrently.
///
/// Local-only commands: `/help` (and bare `/join`) print text without
/// touching the wire; `/exit` announces the departure as an ordinary chat
/// line and closes the connection.
pub async fn run(server_addr: &str) -> Result<()> {
    let stream = TcpStream::connect(server_addr).await?;
    let (reader, mut writer) = stream.into_split();

    let mut server_lines = BufReader::new(reader).lines();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    prompt("Enter your username: ")?;
    let username = match stdin.next_line().await? {
        Some(line) => line.trim().to_string(),
        None => return Ok(()),
    };
    send_line(&mut writer, &username).await?;

    print_help();
    prompt("> ")?;

    loop {
        tokio::select! {
            line = server_lines.next_line() => match line? {
                Some(line) => {
                    println!("{line}");
                    prompt("> ")?;
                }
                None => {
                    println!("Disconnected from the server.");
                    break;
                }
            },
            input = stdin.next_line() => {
                let Some(input) = input? else {
                    break;
                };
                let input = input.trim();

                if input.is_empty() {
                    prompt("> ")?;
                    continue;
                }

                if input == HELP_COMMAND {
                    print_help();
                } else if let Some(rest) = input.strip_prefix(JOIN_COMMAND) {
                    let room = rest.trim();
                    if room.is_empty() {
                        print_rooms();
                    } else {
                        send_line(&mut writer, &format!("{JOIN_COMMAND} {}", room.to_uppercase()))
                            .await?;
                    }
                } else if input == EXIT_COMMAND {
                    send_line(&mut writer, "has left the chat.").await?;
                    break;
                } else {
                    send_line(&mut writer, input).await?;
                }

                prompt("> ")?;
            }
        }
    }

    Ok(())
}

async fn send_line(writer: &mut OwnedWriteHalf, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

fn prompt(text: &str) -> Result<()> {
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(())
}

fn print_help() {
    println!("List of commands:");
    println!("{HELP_COMMAND}: Display this help message");
    println!("{JOIN_COMMAND} [room]: Join the specified chat room");
    println!("{EXIT_COMMAND}: Exit the chat");
}

fn print_rooms() {
    println!("Available chat rooms:");
    for (i, room) in RoomName::ALL.iter().enumerate() {
        println!("{}. {room}", i + 1);
    }
    println!("usage: {JOIN_COMMAND} <room>");
}
