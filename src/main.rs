use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use apex_chat::render::{CodeActions, DownloadsDir, SystemClipboard};
use apex_chat::{ChatSession, Model, Role, ToggleConfig};

fn print_help() {
    println!("commands:");
    println!("  /attach <path>   attach a file to the next message");
    println!("  /detach          clear the pending attachment");
    println!("  /model <chat|reasoner>");
    println!("  /deep /web /markdown   toggle a feature for later turns");
    println!("  /copy [n] /save [n]    act on a code block of the last reply");
    println!("  /quit");
}

fn parse_model(arg: &str) -> Option<Model> {
    match arg {
        "chat" => Some(Model::Chat),
        "reasoner" => Some(Model::Reasoner),
        _ => None,
    }
}

fn last_assistant_reply(session: &ChatSession) -> Option<String> {
    session
        .messages()
        .into_iter()
        .rev()
        .find(|msg| msg.role == Role::Assistant)
        .map(|msg| msg.content)
}

fn region_action(session: &ChatSession, arg: &str, copy: bool) {
    let Some(reply) = last_assistant_reply(session) else {
        println!("nothing to act on yet");
        return;
    };
    let index: usize = arg.trim().parse().unwrap_or(0);
    let mut actions = CodeActions::new(&reply, Box::new(SystemClipboard), Box::new(DownloadsDir));
    if actions.regions().is_empty() {
        println!("the last reply has no code blocks");
        return;
    }
    let outcome = if copy {
        actions.copy(index).map(|_| "copied".to_string())
    } else {
        actions
            .download(index)
            .map(|path| format!("saved {}", path.display()))
    };
    match outcome {
        Ok(note) => println!("{note}"),
        Err(err) => println!("error: {err}"),
    }
}

fn flip(toggles: &mut ToggleConfig, name: &str) {
    let state = match name {
        "deep" => {
            toggles.deep_search = !toggles.deep_search;
            toggles.deep_search
        }
        "web" => {
            toggles.web_search = !toggles.web_search;
            toggles.web_search
        }
        _ => {
            toggles.markdown_output = !toggles.markdown_output;
            toggles.markdown_output
        }
    };
    println!("{name}: {}", if state { "on" } else { "off" });
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let session = ChatSession::from_env();
    session.subscribe(Box::new(|event| {
        if event == apex_chat::SessionEvent::LoadingChanged(true) {
            println!("thinking…");
        }
    }));

    println!("apex-chat — type a message, or /help for commands");
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim_end();

        if let Some(rest) = input.strip_prefix('/') {
            let (command, arg) = rest.split_once(' ').unwrap_or((rest, ""));
            match command {
                "quit" | "exit" => break,
                "help" => print_help(),
                "attach" => {
                    session.attach(PathBuf::from(arg.trim()));
                    println!("attached: {}", arg.trim());
                }
                "detach" => {
                    session.clear_attachment();
                    println!("attachment cleared");
                }
                "model" => match parse_model(arg.trim()) {
                    Some(model) => {
                        session.set_model(model);
                        println!("model: {}", model.wire_id());
                    }
                    None => println!("usage: /model <chat|reasoner>"),
                },
                "deep" | "web" | "markdown" => {
                    let mut toggles = session.toggles();
                    flip(&mut toggles, command);
                    session.set_toggles(toggles);
                }
                "copy" => region_action(&session, arg, true),
                "save" => region_action(&session, arg, false),
                other => println!("unknown command: /{other}"),
            }
            continue;
        }

        if !session.send(input).await {
            continue;
        }
        if let Some(reply) = last_assistant_reply(&session) {
            println!("{reply}");
        }
    }

    Ok(())
}
