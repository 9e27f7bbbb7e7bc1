use chat_core::{ChatEngine, ChatSession, EngineConfig, FileStore, Mode, Renderer, ScriptedModel, Speaker};
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor, Stylize};
use std::error::Error;
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const STORE_PATH: &str = "chat_store.bin";

// Stand-in for a real decoder so the REPL runs without model weights.
const DEMO_REPLY: &str = "That is an interesting question. I am running without a real language \
    model right now, so this answer is scripted, but the streaming and the stop key work just \
    like they would with one.";

struct TerminalRenderer {
    out: Stdout,
    // Text of the reply streamed so far.
    streamed: Option<String>,
}

impl TerminalRenderer {
    fn new() -> Self {
        Self {
            out: io::stdout(),
            streamed: None,
        }
    }

    fn banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "Wani AI chat. Type 'exit' to quit.".bold())?;
        writeln!(self.out, "Commands: ':chat', ':convert', ':clear'. Press [Enter] while the AI is generating to stop it.")?;
        writeln!(self.out, "---------------------------------------------------------------")
    }

    fn prompt(&mut self, mode: Mode) -> io::Result<()> {
        let label = match mode {
            Mode::Chat => "chat",
            Mode::Convert => "convert",
        };
        queue!(self.out, Print(format!("[{label}] > ").dark_grey()))?;
        self.out.flush()
    }

    fn notice(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text.italic().dark_yellow())
    }

    fn speaker_label(&mut self, speaker: Speaker) -> io::Result<()> {
        let (color, name) = match speaker {
            Speaker::User => (Color::Cyan, "You"),
            Speaker::Bot => (Color::Green, "Wani"),
        };
        queue!(self.out, SetForegroundColor(color), Print(format!("{name}: ")), ResetColor)
    }

    fn write_message(&mut self, text: &str, speaker: Speaker) -> io::Result<()> {
        self.speaker_label(speaker)?;
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    fn write_partial(&mut self, partial: &str) -> io::Result<()> {
        match self.streamed.take() {
            // Partials grow monotonically; print only what is new.
            Some(shown) if partial.starts_with(&shown) => {
                write!(self.out, "{}", &partial[shown.len()..])?;
            }
            Some(_) => {
                writeln!(self.out)?;
                self.speaker_label(Speaker::Bot)?;
                write!(self.out, "{partial}")?;
            }
            None => {
                self.speaker_label(Speaker::Bot)?;
                write!(self.out, "{partial}")?;
            }
        }
        self.streamed = Some(partial.to_string());
        self.out.flush()
    }

    fn write_final(&mut self, text: &str) -> io::Result<()> {
        match self.streamed.take() {
            Some(shown) if text.starts_with(&shown) => {
                writeln!(self.out, "{}", &text[shown.len()..])?;
            }
            Some(_) => {
                writeln!(self.out)?;
                self.write_message(text, Speaker::Bot)?;
            }
            None => self.write_message(text, Speaker::Bot)?,
        }
        self.out.flush()
    }
}

impl Renderer for TerminalRenderer {
    fn show(&mut self, text: &str, speaker: Speaker) {
        // Typed input is already on screen.
        if speaker == Speaker::User {
            return;
        }
        let result = match self.streamed.take() {
            // A failure notice can cut a streamed reply short.
            Some(_) => writeln!(self.out).and_then(|_| self.write_message(text, speaker)),
            None => self.write_message(text, speaker),
        };
        if let Err(e) = result {
            warn!(error = %e, "could not write to terminal");
        }
    }

    fn stream(&mut self, partial: &str) {
        if let Err(e) = self.write_partial(partial) {
            warn!(error = %e, "could not write to terminal");
        }
    }

    fn finish(&mut self, text: &str) {
        if let Err(e) = self.write_final(text) {
            warn!(error = %e, "could not write to terminal");
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let config = match std::env::args_os().nth(1) {
        Some(path) => EngineConfig::from_path(Path::new(&path))?,
        None => EngineConfig::default(),
    };
    let table = config.response_table()?;
    let model = ScriptedModel::new(DEMO_REPLY).with_step_delay(Duration::from_millis(120));
    let engine = ChatEngine::with_model(config, table, model)?;
    let mut session = ChatSession::open(engine, FileStore::open_or_empty(STORE_PATH));

    let mut renderer = TerminalRenderer::new();
    renderer.banner()?;
    let mut replay = ReplayRenderer(&mut renderer);
    session.replay(&mut replay);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // A line typed while a canned reply was streaming, kept as the next input.
    let mut typed_ahead: Option<String> = None;
    loop {
        renderer.prompt(session.mode())?;
        let line = match typed_ahead.take() {
            Some(line) => line,
            None => match lines.next_line().await? {
                Some(line) => line,
                None => break,
            },
        };

        match line.trim() {
            "exit" => break,
            ":chat" => {
                session.set_mode(Mode::Chat);
                renderer.notice("Switched to chat mode.")?;
            }
            ":convert" => {
                session.set_mode(Mode::Convert);
                renderer.notice("Switched to convert mode. Enter a decimal or binary IPv4 address.")?;
            }
            ":clear" => {
                session.clear_history();
                renderer.notice("History cleared.")?;
            }
            text => {
                let stop = session.stop_handle();
                let exchange = {
                    let submit = session.submit(text, &mut renderer);
                    tokio::pin!(submit);
                    let mut listening = true;
                    loop {
                        tokio::select! {
                            exchange = &mut submit => break exchange,
                            next = lines.next_line(), if listening => {
                                listening = false;
                                // EOF only stops listening.
                                if let Ok(Some(next)) = next {
                                    if !stop.is_generating() {
                                        typed_ahead = Some(next);
                                    } else if !stop.stop() {
                                        warn!("generator is gone, nothing to stop");
                                    }
                                }
                            }
                        }
                    }
                };
                if exchange.is_some_and(|e| e.stopped) {
                    renderer.notice("(stopped)")?;
                }
            }
        }
    }

    renderer.notice("Goodbye!")?;
    Ok(())
}

/// Prints stored history, including the user's own lines.
struct ReplayRenderer<'a>(&'a mut TerminalRenderer);

impl Renderer for ReplayRenderer<'_> {
    fn show(&mut self, text: &str, speaker: Speaker) {
        if let Err(e) = self.0.write_message(text, speaker) {
            warn!(error = %e, "could not write to terminal");
        }
    }

    fn stream(&mut self, partial: &str) {
        self.0.stream(partial);
    }

    fn finish(&mut self, text: &str) {
        self.0.finish(text);
    }
}
