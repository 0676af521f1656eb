use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use triage_core::{update, AppState, Msg};
use triage_engine::{
    DominantColorExtractor, EngineServices, EnrichmentPipeline, FetchSettings, FileKeyValueStore,
    HttpPageInspector, HttpSummarizer, SavedItemStore,
};
use triage_logging::{triage_debug, triage_info, triage_warn};

use super::effects::EffectRunner;
use super::input::{self, Command};
use super::render;
use super::session;
use super::settings::{self, Settings};

/// How long the loop waits on engine events before checking for typed input.
const EVENT_POLL: Duration = Duration::from_millis(50);

pub fn run_app() -> anyhow::Result<()> {
    let data_dir = settings::data_dir_from_env();
    let (settings, problem) = settings::load(&data_dir);
    triage_logging::initialize(
        settings.log_destination,
        settings.log_level(),
        &settings.log_file,
    );
    if let Some(problem) = problem {
        triage_warn!("{}", problem);
    }
    triage_info!("Tab triage starting, data dir {:?}", data_dir);

    let tabs = Arc::new(session::load_tabs(settings.tabs_file.as_deref())?);
    let summarizer = Arc::new(HttpSummarizer::new(
        settings.summarizer_endpoint.clone(),
        settings.summarizer_api_key.clone(),
    ));
    let kv = FileKeyValueStore::new(settings.store_dir(&data_dir));
    let pipeline = EnrichmentPipeline::new(
        Arc::new(HttpPageInspector::new(FetchSettings::pages())),
        Arc::new(DominantColorExtractor::new(
            FetchSettings::icons(),
            settings.icon_timeout(),
        )),
        settings.enrich_settings(),
    );
    let services = EngineServices {
        tabs,
        store: Arc::new(SavedItemStore::new(Arc::new(kv))),
        pipeline: Arc::new(pipeline),
        summarizer: summarizer.clone(),
    };
    let runner = EffectRunner::new(services).context("starting engine thread")?;

    let mut app = App {
        state: AppState::new(),
        runner,
        settings,
        data_dir,
        summarizer,
    };
    app.run(spawn_stdin_reader())
}

struct App {
    state: AppState,
    runner: EffectRunner,
    settings: Settings,
    data_dir: PathBuf,
    summarizer: Arc<HttpSummarizer>,
}

impl App {
    fn run(&mut self, lines: mpsc::Receiver<String>) -> anyhow::Result<()> {
        println!("Tab triage. Type `help` for commands.");
        self.dispatch(Msg::Started);

        loop {
            for msg in self.runner.poll(EVENT_POLL) {
                self.dispatch(msg);
            }
            let line = match lines.try_recv() {
                Ok(line) => line,
                Err(TryRecvError::Empty) => continue,
                Err(TryRecvError::Disconnected) => break,
            };
            match input::parse(&line, &self.state.view()) {
                Command::Quit => break,
                Command::Msgs(msgs) => {
                    for msg in msgs {
                        self.dispatch(msg);
                    }
                }
                Command::SetEndpoint(endpoint) => {
                    self.settings.summarizer_endpoint = endpoint;
                    self.apply_credentials();
                }
                Command::SetApiKey(api_key) => {
                    self.settings.summarizer_api_key = api_key;
                    self.apply_credentials();
                }
                Command::Help => {
                    println!("{}", input::HELP);
                    self.redraw()?;
                }
                Command::Unknown(text) => {
                    println!("Unknown command {text:?}. Type `help` for commands.");
                    self.redraw()?;
                }
                Command::Nothing => self.redraw()?,
            }
        }

        triage_info!("Tab triage exiting");
        println!();
        Ok(())
    }

    fn dispatch(&mut self, msg: Msg) {
        triage_debug!("Dispatch {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;
        self.runner.enqueue(effects);
        if was_dirty {
            if let Err(err) = self.redraw() {
                triage_warn!("Failed to draw screen: {}", err);
            }
        }
    }

    fn redraw(&self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "\n{}", render::render(&self.state.view()))?;
        stdout.flush()
    }

    fn apply_credentials(&mut self) {
        self.summarizer.configure(
            self.settings.summarizer_endpoint.clone(),
            self.settings.summarizer_api_key.clone(),
        );
        settings::save_or_warn(&self.data_dir, &self.settings);
        let status = if self.summarizer.is_configured() {
            "Summaries configured."
        } else {
            "Summaries still need an endpoint and a key."
        };
        println!("{status}");
        if let Err(err) = self.redraw() {
            triage_warn!("Failed to draw screen: {}", err);
        }
    }
}

/// Reads stdin on its own thread so engine events keep flowing while the prompt waits.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("triage-input".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        triage_warn!("Failed to read input: {}", err);
                        break;
                    }
                }
            }
        });
    if let Err(err) = spawned {
        triage_warn!("Failed to start input thread: {}", err);
    }
    rx
}
