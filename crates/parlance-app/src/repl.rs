//! Interactive loop: stdin lines, reply streaming and Ctrl-C share one task.

use std::io::{self, Write};

use parlance_chat::{ChatController, ChatTransport, StoreBackend};
use parlance_common::ParlanceError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::commands::{self, Command, HELP};
use crate::render::Renderer;

enum Input {
    Line(io::Result<Option<String>>),
    Progress,
    Interrupt,
}

pub async fn run<T, B>(controller: &mut ChatController<T, B>) -> Result<(), ParlanceError>
where
    T: ChatTransport + 'static,
    B: StoreBackend + Clone,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut renderer = Renderer::new(io::stdout());

    println!("parlance {} (/help for commands)", env!("CARGO_PKG_VERSION"));
    if let Some(conversation) = controller.store().active_conversation() {
        println!("resuming \"{}\"", conversation.title);
    }

    loop {
        if !controller.is_busy() {
            print!("> ");
            io::stdout().flush()?;
        }

        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line),
            _ = controller.pump(), if controller.is_busy() => Input::Progress,
            _ = tokio::signal::ctrl_c() => Input::Interrupt,
        };

        match input {
            Input::Progress => {
                if let Some(text) = controller.streaming_text() {
                    renderer.progress(text)?;
                }
                if !controller.is_busy() {
                    settle(controller, &mut renderer)?;
                }
            }
            Input::Interrupt => {
                if controller.is_busy() {
                    stop(controller, &mut renderer)?;
                } else {
                    println!();
                    break;
                }
            }
            Input::Line(line) => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                if !handle(controller, &mut renderer, commands::parse(&line)).await? {
                    break;
                }
            }
        }
    }

    if controller.is_busy() {
        stop(controller, &mut renderer)?;
    }
    info!("session closed");
    Ok(())
}

/// Returns `false` when the user asked to quit.
async fn handle<T, B, W>(
    controller: &mut ChatController<T, B>,
    renderer: &mut Renderer<W>,
    command: Command,
) -> Result<bool, ParlanceError>
where
    T: ChatTransport + 'static,
    B: StoreBackend + Clone,
    W: Write,
{
    match command {
        Command::Nothing => {}
        Command::Send(text) => {
            if controller.is_busy() {
                stop(controller, renderer)?;
            }
            match controller.send(&text) {
                Ok(conversation) => {
                    let mark = controller.messages().len();
                    if let Some(pending) = controller.pending_message_id() {
                        renderer.begin(conversation, pending, mark);
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
        }
        Command::New => {
            if controller.is_busy() {
                stop(controller, renderer)?;
            }
            controller.new_conversation();
            println!("started a new conversation");
        }
        Command::List => list_conversations(controller),
        Command::Open(id) => {
            if controller.is_busy() {
                stop(controller, renderer)?;
            }
            match controller.open_conversation(id) {
                Ok(()) => renderer.transcript(controller.messages())?,
                Err(e) => eprintln!("{e}"),
            }
        }
        Command::Cancel => {
            if controller.is_busy() {
                stop(controller, renderer)?;
            } else {
                eprintln!("nothing to cancel");
            }
        }
        Command::Image(prompt) => {
            println!("generating image...");
            match controller.generate_image(&prompt).await {
                Ok(image) => println!("image ready: {}", image.url),
                Err(e) => eprintln!("image generation failed: {e}"),
            }
        }
        Command::Images => match controller.refresh_images() {
            Ok(images) if images.is_empty() => println!("no generated images yet"),
            Ok(images) => {
                for image in images {
                    println!("{}  {}  {}", image.created_at, image.prompt, image.url);
                }
            }
            Err(e) => eprintln!("failed to read image log: {e}"),
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
        Command::Usage(hint) => eprintln!("{hint}"),
        Command::Unknown(name) => eprintln!("unknown command /{name} (try /help)"),
    }
    Ok(true)
}

fn list_conversations<T, B>(controller: &ChatController<T, B>)
where
    T: ChatTransport + 'static,
    B: StoreBackend + Clone,
{
    let active = controller.store().active_id();
    let mut any = false;
    for conversation in controller.store().history() {
        any = true;
        let mark = if Some(conversation.id) == active { '*' } else { ' ' };
        println!(
            "{mark} {}  {}  ({} messages)",
            conversation.id,
            conversation.title,
            conversation.messages.len()
        );
    }
    if !any {
        println!("no conversations yet");
    }
}

fn stop<T, B, W>(
    controller: &mut ChatController<T, B>,
    renderer: &mut Renderer<W>,
) -> Result<(), ParlanceError>
where
    T: ChatTransport + 'static,
    B: StoreBackend + Clone,
    W: Write,
{
    controller
        .cancel()
        .map_err(|e| ParlanceError::Chat(e.to_string()))?;
    settle(controller, renderer)
}

/// Flush the finished request to the terminal.
fn settle<T, B, W>(
    controller: &ChatController<T, B>,
    renderer: &mut Renderer<W>,
) -> Result<(), ParlanceError>
where
    T: ChatTransport + 'static,
    B: StoreBackend + Clone,
    W: Write,
{
    if let Some(id) = renderer.conversation() {
        let messages = controller
            .store()
            .conversation(id)
            .map(|c| c.messages.as_slice())
            .unwrap_or_default();
        renderer.finish(messages)?;
    }
    if let Some(banner) = controller.diagnostic() {
        eprintln!("{banner}");
    }
    Ok(())
}
