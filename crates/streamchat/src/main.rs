//! A terminal front end for chatting through the relay.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use streamchat::presets::{self, GREETING, GREETING_DETAIL, MODEL_OPTIONS, SUGGESTIONS};
use streamchat::{ChatSession, Role, SessionBuilder, Stage, StreamStatus, SubmitError};
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};

const BAR_CHAR: &str = "▎";

/// Chats with a model through a streamchat relay.
#[derive(Parser)]
#[command(name = "streamchat", version)]
struct Args {
    /// Base URL of the relay.
    #[arg(long, env = "STREAMCHAT_RELAY_URL", default_value = "http://127.0.0.1:3000")]
    relay_url: String,

    /// Model selected at start.
    #[arg(long, env = "STREAMCHAT_MODEL", default_value = presets::DEFAULT_MODEL)]
    model: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Say(&'a str),
    Pick(Option<usize>),
    Model(Option<&'a str>),
    Models,
    Clear,
    Copy,
    Quit,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Say(line);
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "pick" => Command::Pick(arg.parse().ok()),
            "model" if arg.is_empty() => Command::Model(None),
            "model" => Command::Model(Some(arg)),
            "models" => Command::Models,
            "clear" => Command::Clear,
            "copy" => Command::Copy,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(name),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let session = SessionBuilder::with_relay_url(args.relay_url)
        .with_model(args.model)
        .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        let snapshot = session.snapshot().await;
        if snapshot.conversation.is_empty() {
            print_greeting();
        }

        print!("{} ", ">".bright_green());
        std::io::stdout().flush().ok();
        let Some(line) = read_line(&mut lines).await else {
            break;
        };

        let text = match Command::parse(&line) {
            Command::Say("") => continue,
            Command::Say(text) => text,
            Command::Pick(number) => {
                match number.and_then(presets::suggestion) {
                    Some(text) => {
                        println!("{} {text}", ">".bright_green());
                        text
                    }
                    None => {
                        println!("Pick a suggestion between 1 and {}.", SUGGESTIONS.len());
                        continue;
                    }
                }
            }
            Command::Model(None) => {
                println!("Current model: {}", snapshot.selected_model.bright_white());
                continue;
            }
            Command::Model(Some(model)) => {
                session.select_model(model);
                println!("Switched to {}", model.bright_white());
                continue;
            }
            Command::Models => {
                for model in MODEL_OPTIONS {
                    let marker = if *model == snapshot.selected_model { "*" } else { " " };
                    println!("{marker} {model}");
                }
                continue;
            }
            Command::Clear => {
                session.clear();
                println!("{}", "Conversation cleared.".dimmed());
                continue;
            }
            Command::Copy => {
                let text = snapshot.conversation.to_plain_text();
                if text.is_empty() {
                    println!("{}", "Nothing to copy yet.".dimmed());
                } else {
                    println!("{}\n{text}\n{}", "-----".dimmed(), "-----".dimmed());
                }
                continue;
            }
            Command::Quit => break,
            Command::Unknown(name) => {
                println!(
                    "Unknown command /{name}. Try /model, /models, /pick, /clear, /copy or /quit."
                );
                continue;
            }
        };

        let base_len = snapshot.conversation.len() + 1;
        match session.submit(text).await {
            Ok(()) => stream_reply(&session, base_len, &progress_style).await,
            Err(SubmitError::Closed) => {
                error!("session stopped unexpectedly");
                break;
            }
            Err(err) => println!("{}", err.bright_yellow()),
        }
    }
}

/// Renders the reply of the send that made the conversation `base_len`
/// messages long, until the send ends.
async fn stream_reply(session: &ChatSession, base_len: usize, style: &ProgressStyle) {
    let mut updates = session.subscribe();
    let mut spinner: Option<ProgressBar> = None;
    let mut printed = String::new();

    loop {
        let snapshot = updates.borrow_and_update().clone();
        if snapshot.stage == Stage::Sending {
            spinner.get_or_insert_with(|| {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(style.clone());
                spinner.set_message("Thinking...");
                spinner.enable_steady_tick(Duration::from_millis(100));
                spinner
            });
        } else {
            if let Some(spinner) = spinner.take() {
                spinner.finish_and_clear();
            }

            let reply = snapshot
                .conversation
                .messages()
                .get(base_len)
                .filter(|msg| msg.role() == Role::Assistant);
            if let Some(reply) = reply {
                if printed.is_empty() {
                    println!(
                        "{}{}",
                        BAR_CHAR.bright_cyan(),
                        reply.model().unwrap_or_default().bright_cyan()
                    );
                }
                match reply.content().strip_prefix(printed.as_str()) {
                    Some(new_text) => print!("{}", new_text.bright_white()),
                    None => print!("\n{}", reply.content().bright_white()),
                }
                std::io::stdout().flush().ok();
                printed.clear();
                printed.push_str(reply.content());
            }

            match snapshot.status {
                StreamStatus::Pending => {}
                StreamStatus::Idle => {
                    println!("\n");
                    return;
                }
                StreamStatus::Error(message) => {
                    println!("\n{}{}\n", BAR_CHAR.bright_red(), message.bright_red());
                    return;
                }
            }
        }

        if updates.changed().await.is_err() {
            if let Some(spinner) = spinner.take() {
                spinner.finish_and_clear();
            }
            return;
        }
    }
}

fn print_greeting() {
    println!("{}", GREETING.bold());
    println!("{}", GREETING_DETAIL.dimmed());
    for (idx, suggestion) in SUGGESTIONS.iter().enumerate() {
        println!("  {} {suggestion}", format!("/pick {}", idx + 1).bright_blue());
    }
    println!();
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  Hello there \n"), Command::Say("Hello there"));
        assert_eq!(Command::parse(""), Command::Say(""));
        assert_eq!(Command::parse("/pick 2"), Command::Pick(Some(2)));
        assert_eq!(Command::parse("/pick two"), Command::Pick(None));
        assert_eq!(Command::parse("/model"), Command::Model(None));
        assert_eq!(
            Command::parse("/model  mistralai/Mistral-7B-Instruct-v0.2 "),
            Command::Model(Some("mistralai/Mistral-7B-Instruct-v0.2"))
        );
        assert_eq!(Command::parse("/models"), Command::Models);
        assert_eq!(Command::parse("/clear"), Command::Clear);
        assert_eq!(Command::parse("/copy"), Command::Copy);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/help"), Command::Unknown("help"));
    }
}
