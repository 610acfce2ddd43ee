//! REPL – Read-Eval-Print Loop for the NARS interactive shell.
//!
//! Lines that do not start with `/` are read as Narsese and queued as input
//! tasks.  Supported slash-commands:
//!   /step [n]        – run `n` working cycles (default 1)
//!   /run             – tick continuously on a background thread
//!   /pause           – suspend a `/run`
//!   /snapshot [json] – dump concept memory
//!   /config          – show the active configuration
//!   /stop            – stop the reasoner (terminal)
//!   /help            – show this list
//!   /quit | /exit    – gracefully exit the CLI

use colored::{ColoredString, Colorize};
use nars_middleware::{Topic, TopicReceiver};
use nars_runtime::{Driver, DriverConfig, InputHandle, Scheduler, StopHandle};
use nars_types::{Event, EventPayload, NarsError};
use parking_lot::Mutex;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::debug;

use crate::config::{self, Config};
use crate::narsese;

/// How often the background echo thread prints bus events.
const ECHO_INTERVAL: Duration = Duration::from_millis(50);

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Narsese(String),
    Step(u64),
    Run,
    Pause,
    Snapshot { json: bool },
    Config,
    Stop,
    Help,
    Quit,
}

impl Command {
    /// Parse one trimmed, non-empty line.
    pub fn parse(line: &str) -> Result<Self, String> {
        if !line.starts_with('/') {
            return Ok(Command::Narsese(line.to_string()));
        }
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments to {name}"));
        }
        let cmd = match (name, arg) {
            ("/step", None) => Command::Step(1),
            ("/step", Some(n)) => match n.parse::<u64>() {
                Ok(n) if n > 0 => Command::Step(n),
                _ => return Err(format!("'{n}' is not a positive step count")),
            },
            ("/run", None) => Command::Run,
            ("/pause", None) => Command::Pause,
            ("/snapshot", None) => Command::Snapshot { json: false },
            ("/snapshot", Some("json")) => Command::Snapshot { json: true },
            ("/config", None) => Command::Config,
            ("/stop", None) => Command::Stop,
            ("/help", None) => Command::Help,
            ("/quit" | "/exit", None) => Command::Quit,
            (name, Some(arg)) if KNOWN.contains(&name) => {
                return Err(format!("unexpected argument '{arg}' to {name}"));
            }
            (other, _) => return Err(format!("unknown command '{other}'")),
        };
        Ok(cmd)
    }
}

const KNOWN: [&str; 9] = [
    "/step", "/run", "/pause", "/snapshot", "/config", "/stop", "/help", "/quit", "/exit",
];

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Reasoner state owned by one interactive session.
///
/// Narsese input goes straight into the novel-task bag through `input` and
/// never waits on the scheduler lock, which a `/run` holds for each tick.
pub struct Session {
    scheduler: Arc<Mutex<Scheduler>>,
    input: InputHandle,
    stop: StopHandle,
    driver: Option<Driver>,
    events: Arc<Mutex<Vec<TopicReceiver>>>,
    config: Config,
}

impl Session {
    /// Build a scheduler from `config` and subscribe to its output topics.
    pub fn new(config: Config) -> Result<Self, NarsError> {
        let scheduler = Scheduler::new(config.reasoner.clone())?;
        let bus = scheduler.bus();
        let events: Vec<TopicReceiver> = Topic::ALL
            .iter()
            .filter(|t| config.show_memory_events || **t != Topic::Memory)
            .map(|t| bus.subscribe_to(*t))
            .collect();
        Ok(Self {
            input: scheduler.input_handle(),
            stop: scheduler.stop_handle(),
            scheduler: Arc::new(Mutex::new(scheduler)),
            driver: None,
            events: Arc::new(Mutex::new(events)),
            config,
        })
    }

    /// Requests a stop without taking the scheduler lock.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Execute one command and return the text to show the user.
    pub fn execute(&mut self, cmd: Command) -> Result<String, NarsError> {
        match cmd {
            Command::Narsese(line) => self.input(&line),
            Command::Step(n) => self.step(n),
            Command::Run => Ok(self.run()),
            Command::Pause => Ok(self.pause()),
            Command::Snapshot { json } => self.snapshot(json),
            Command::Config => self.show_config(),
            Command::Stop => Ok(self.stop()),
            Command::Help => Ok(help_text()),
            Command::Quit => Ok(self.stop()),
        }
    }

    /// Drain pending bus events as printable lines.
    pub fn take_events(&self) -> Vec<ColoredString> {
        drain_events(&self.events)
    }

    // -------------------------------------------------------------------------
    // Handlers
    // -------------------------------------------------------------------------

    fn input(&self, line: &str) -> Result<String, NarsError> {
        let task = narsese::parse(line)?;
        if self.stop.is_stop_requested() {
            return Ok("reasoner is stopped; input ignored".to_string());
        }
        let mut reply = format!("queued {task}");
        if let Some(dropped) = self.input.input(task) {
            reply.push_str(&format!(" (forgot {dropped})"));
        }
        Ok(reply)
    }

    fn step(&mut self, n: u64) -> Result<String, NarsError> {
        if self.driver.as_ref().is_some_and(|d| d.is_running() && !d.is_paused()) {
            return Ok("a run is in progress; /pause it first".to_string());
        }
        let mut s = self.scheduler.lock();
        if s.is_finished() {
            return Ok("reasoner is stopped".to_string());
        }
        for _ in 0..n {
            s.tick();
            if s.is_finished() {
                break;
            }
        }
        Ok(format!("clock {} ({})", s.clock(), s.state()))
    }

    fn run(&mut self) -> String {
        if let Some(driver) = self.driver.as_ref().filter(|d| d.is_running()) {
            if driver.is_paused() {
                driver.resume();
                return "resumed".to_string();
            }
            return "already running".to_string();
        }
        if self.scheduler.lock().is_finished() {
            return "reasoner is stopped".to_string();
        }
        let driver = Driver::spawn(
            Arc::clone(&self.scheduler),
            DriverConfig {
                max_steps: self.config.max_steps,
                tick_interval: Duration::from_millis(self.config.tick_interval_ms),
                ..Default::default()
            },
        );
        self.driver = Some(driver);
        match self.config.max_steps {
            Some(max) => format!("running for up to {max} steps"),
            None => "running; /pause or /stop to halt".to_string(),
        }
    }

    fn pause(&self) -> String {
        match self.driver.as_ref().filter(|d| d.is_running()) {
            Some(driver) => {
                driver.pause();
                format!("paused at clock {}", self.scheduler.lock().clock())
            }
            None => "nothing is running".to_string(),
        }
    }

    fn snapshot(&self, json: bool) -> Result<String, NarsError> {
        let s = self.scheduler.lock();
        if json {
            serde_json::to_string_pretty(&s.snapshot_report())
                .map_err(|e| NarsError::Serialization(e.to_string()))
        } else {
            Ok(s.snapshot())
        }
    }

    fn show_config(&self) -> Result<String, NarsError> {
        let body = toml::to_string_pretty(&self.config)
            .map_err(|e| NarsError::Serialization(e.to_string()))?;
        Ok(format!("# {}\n{body}", config::config_path().display()))
    }

    /// Stop the reasoner, joining the driver if one is active.
    fn stop(&mut self) -> String {
        if let Some(driver) = self.driver.take() {
            driver.stop();
            let report = driver.join();
            debug!(steps = report.steps, reason = ?report.reason, "driver joined");
        }
        let mut s = self.scheduler.lock();
        s.stop();
        format!("stopped at clock {}", s.clock())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(mut session: Session, shutdown: Arc<AtomicBool>) {
    let echo = spawn_echo(Arc::clone(&session.events), Arc::clone(&shutdown));
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "nars>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            print_events(&session);
            continue;
        }

        let cmd = match Command::parse(line) {
            Ok(cmd) => cmd,
            Err(e) => {
                println!(
                    "{} {}. Type {} for available commands.",
                    "Error:".red(),
                    e.yellow(),
                    "/help".bold()
                );
                continue;
            }
        };
        let quit = cmd == Command::Quit;
        match session.execute(cmd) {
            Ok(reply) => println!("{reply}"),
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
        print_events(&session);
        if quit {
            println!("{}", "Goodbye.".green());
            break;
        }
    }

    shutdown.store(true, Ordering::SeqCst);
    session.stop();
    print_events(&session);
    if echo.join().is_err() {
        eprintln!("{}", "event echo thread panicked".red());
    }
}

fn print_events(session: &Session) {
    for line in session.take_events() {
        println!("{line}");
    }
}

/// Print bus events while a `/run` is ticking in the background.
fn spawn_echo(
    events: Arc<Mutex<Vec<TopicReceiver>>>,
    shutdown: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.load(Ordering::SeqCst) {
            let lines = drain_events(&events);
            if !lines.is_empty() {
                let mut stdout = io::stdout().lock();
                for line in lines {
                    writeln!(stdout, "{line}").ok();
                }
                stdout.flush().ok();
            }
            thread::sleep(ECHO_INTERVAL);
        }
    })
}

fn drain_events(events: &Mutex<Vec<TopicReceiver>>) -> Vec<ColoredString> {
    let mut receivers = events.lock();
    let mut drained: Vec<Event> = receivers.iter_mut().flat_map(|rx| rx.drain()).collect();
    drained.sort_by_key(|e| (e.cycle, e.timestamp));
    drained.iter().map(format_event).collect()
}

fn format_event(event: &Event) -> ColoredString {
    let line = format!("[{:>6}] {}", event.cycle, event.payload);
    match event.payload {
        EventPayload::InputAccepted(_) => line.green(),
        EventPayload::Derived(_) => line.cyan(),
        EventPayload::ConceptForgotten(_) => line.dimmed(),
        EventPayload::Status(_) => line.yellow(),
    }
}

fn help_text() -> String {
    let rows = [
        ("<narsese>", "queue a task, e.g. <bird --> animal>. %0.9;0.8%"),
        ("/step [n]", "run n working cycles (default 1)"),
        ("/run", "tick continuously in the background"),
        ("/pause", "suspend a /run"),
        ("/snapshot [json]", "dump concept memory"),
        ("/config", "show the active configuration"),
        ("/stop", "stop the reasoner"),
        ("/quit  /exit", "exit the CLI"),
    ];
    let mut out = format!("{}\n", "NARS Commands".bold().underline());
    for (cmd, what) in rows {
        out.push_str(&format!("  {:<18} – {what}\n", cmd.bold().cyan()));
    }
    out
}

#[cfg(test)]
mod tests {
    use nars_runtime::ReasonerConfig;
    use nars_types::Term;

    use super::*;

    fn session() -> Session {
        Session::new(Config {
            reasoner: ReasonerConfig {
                seed: Some(5),
                ..Default::default()
            },
            tick_interval_ms: 1,
            ..Default::default()
        })
        .unwrap()
    }

    /// Slash-commands and Narsese lines are told apart.
    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/step"), Ok(Command::Step(1)));
        assert_eq!(Command::parse("/step 25"), Ok(Command::Step(25)));
        assert_eq!(
            Command::parse("/snapshot json"),
            Ok(Command::Snapshot { json: true })
        );
        assert_eq!(Command::parse("/exit"), Ok(Command::Quit));
        assert_eq!(
            Command::parse("<a --> b>."),
            Ok(Command::Narsese("<a --> b>.".to_string()))
        );
    }

    /// Unknown commands and bad arguments are refused.
    #[test]
    fn rejects_bad_commands() {
        assert!(Command::parse("/step 0").is_err());
        assert!(Command::parse("/step many").is_err());
        assert!(Command::parse("/run now").is_err());
        assert!(Command::parse("/snapshot xml").is_err());
        assert!(Command::parse("/fly").is_err());
    }

    /// Queued Narsese becomes concepts after one step.
    #[test]
    fn narsese_input_then_step_creates_concepts() {
        let mut s = session();
        let reply = s.execute(Command::Narsese("<bird --> animal>.".into())).unwrap();
        assert!(reply.starts_with("queued"), "{reply}");

        let reply = s.execute(Command::Step(1)).unwrap();
        assert_eq!(reply, "clock 1 (idle)");

        let guard = s.scheduler.lock();
        let memory = guard.memory();
        assert!(memory.contains(&Term::statement(
            Term::atom("bird"),
            "-->",
            Term::atom("animal")
        )));
        assert!(memory.contains(&Term::atom("bird")));
    }

    /// Bad Narsese is reported, not queued.
    #[test]
    fn parse_errors_surface_as_errors() {
        let mut s = session();
        let err = s.execute(Command::Narsese("<bird animal>.".into())).unwrap_err();
        assert!(matches!(err, NarsError::Parse(_)));
    }

    /// Accepted input shows up once in the echoed events.
    #[test]
    fn input_events_are_echoed() {
        let mut s = session();
        s.execute(Command::Narsese("sky.".into())).unwrap();
        s.execute(Command::Step(1)).unwrap();
        let lines: Vec<String> = s.take_events().iter().map(|l| l.to_string()).collect();
        assert!(lines.iter().any(|l| l.contains("IN:") && l.contains("sky")), "{lines:?}");
        assert!(s.take_events().is_empty());
    }

    /// `/snapshot json` emits parseable JSON.
    #[test]
    fn snapshot_json_is_valid() {
        let mut s = session();
        s.execute(Command::Narsese("sky.".into())).unwrap();
        s.execute(Command::Step(2)).unwrap();
        let json = s.execute(Command::Snapshot { json: true }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["clock"], 2);
        assert_eq!(value["concepts"].as_array().unwrap().len(), 1);
    }

    /// `/run`, `/pause` and `/stop` drive the background run.
    #[test]
    fn run_pause_and_stop() {
        let mut s = session();
        assert_eq!(s.execute(Command::Run).unwrap(), "running; /pause or /stop to halt");
        assert_eq!(s.execute(Command::Run).unwrap(), "already running");
        thread::sleep(Duration::from_millis(20));

        assert!(s.execute(Command::Pause).unwrap().starts_with("paused"));
        assert_eq!(s.execute(Command::Run).unwrap(), "resumed");

        let reply = s.execute(Command::Stop).unwrap();
        assert!(reply.starts_with("stopped at clock"), "{reply}");
        assert!(s.scheduler.lock().is_finished());
        assert_eq!(s.execute(Command::Step(1)).unwrap(), "reasoner is stopped");
        assert_eq!(s.execute(Command::Run).unwrap(), "reasoner is stopped");
    }

    /// `/step` waits until a run is paused.
    #[test]
    fn stepping_is_refused_while_running() {
        let mut s = session();
        s.execute(Command::Run).unwrap();
        assert_eq!(
            s.execute(Command::Step(1)).unwrap(),
            "a run is in progress; /pause it first"
        );
        s.execute(Command::Pause).unwrap();
        assert!(s.execute(Command::Step(1)).unwrap().starts_with("clock"));
        s.execute(Command::Stop).unwrap();
    }

    /// A run with `max_steps` stops the reasoner on its own.
    #[test]
    fn bounded_run_finishes_by_itself() {
        let mut s = Session::new(Config {
            max_steps: Some(3),
            tick_interval_ms: 0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(s.execute(Command::Run).unwrap(), "running for up to 3 steps");
        let driver = s.driver.take().unwrap();
        let report = driver.join();
        assert_eq!(report.steps, 3);
        assert!(s.scheduler.lock().is_finished());
        assert_eq!(
            s.execute(Command::Narsese("sky.".into())).unwrap(),
            "reasoner is stopped; input ignored"
        );
    }

    /// Narsese input is queued even while another thread holds the
    /// scheduler lock, as a running driver does for each tick.
    #[test]
    fn input_does_not_wait_for_the_scheduler_lock() {
        let mut s = session();
        let scheduler = Arc::clone(&s.scheduler);
        let guard = scheduler.lock();
        let reply = s.execute(Command::Narsese("<bird --> animal>.".into())).unwrap();
        assert!(reply.starts_with("queued"), "{reply}");
        drop(guard);
        assert_eq!(s.input.pending(), 1);
    }

    /// Input typed during a `/run` reaches memory.
    #[test]
    fn input_during_a_run_is_drained() {
        let mut s = session();
        s.execute(Command::Run).unwrap();
        s.execute(Command::Narsese("sky.".into())).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while s.input.pending() > 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        s.execute(Command::Stop).unwrap();
        assert!(s.scheduler.lock().memory().contains(&Term::atom("sky")));
        assert_eq!(
            s.execute(Command::Narsese("sea.".into())).unwrap(),
            "reasoner is stopped; input ignored"
        );
    }

    /// `/config` shows the reasoner table.
    #[test]
    fn config_lists_reasoner_settings() {
        let mut s = session();
        let text = s.execute(Command::Config).unwrap();
        assert!(text.contains("[reasoner]"), "{text}");
        assert!(text.contains("concept_capacity"));
    }
}
