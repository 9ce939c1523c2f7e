//! REPL – operator console for a running search.
//!
//! Supported slash-commands:
//!   /help               – show this list
//!   /feedback [text]    – interrupt the search; with text, send it at once
//!   /cancel             – abandon an open feedback session
//!   /skip               – let a checkpoint round run without feedback
//!   /status             – scheduler state, pose and round count
//!   /path <landmark>    – plan a route without moving
//!   /landmarks          – list named landmarks
//!   /memory             – print the round history
//!   /quit | /exit       – stop the search and exit
//!
//! While a feedback session is open, any plain line is submitted as the
//! feedback text. While the search waits at a feedback checkpoint, a plain
//! line answers it instead.

use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;
use std::sync::Arc;

use colored::Colorize;
use seekdog_nav::PathOutcome;
use seekdog_runtime::{
    FeedbackOutcome, FeedbackSession, RoundScheduler, RunSummary, SchedulerState,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Rounds shown by `/memory`.
const MEMORY_WINDOW: usize = 10;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Feedback(Option<String>),
    Cancel,
    Skip,
    Status,
    Path(String),
    Landmarks,
    Memory,
    Quit,
    /// A line that is not a command.
    Text(String),
    Unknown(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if !line.starts_with('/') {
            return Command::Text(line.to_string());
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());
        match head {
            "/help" => Command::Help,
            "/feedback" | "/fb" => Command::Feedback(arg),
            "/cancel" => Command::Cancel,
            "/skip" => Command::Skip,
            "/status" => Command::Status,
            "/path" => match arg {
                Some(name) => Command::Path(name),
                None => Command::Unknown(line.to_string()),
            },
            "/landmarks" => Command::Landmarks,
            "/memory" => Command::Memory,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Forward stdin lines into a channel from a dedicated thread.
///
/// The channel closes on EOF or a read error.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("{}: {}", "Read error".red(), e);
                    break;
                }
            }
        }
    });
    rx
}

/// Serve console commands until the search finishes, then return its summary.
///
/// Returns `None` only if the search task panicked.
pub async fn run(
    scheduler: Arc<RoundScheduler>,
    mut lines: mpsc::UnboundedReceiver<String>,
    mut search: JoinHandle<RunSummary>,
) -> Option<RunSummary> {
    let mut state = scheduler.subscribe_state();
    let mut console = Console {
        scheduler,
        session: None,
        announced: None,
    };
    let mut input_open = true;
    let mut state_open = true;
    let initial = *state.borrow_and_update();
    console.announce_checkpoint(initial);
    console.prompt();

    loop {
        tokio::select! {
            joined = &mut search => {
                return match joined {
                    Ok(summary) => Some(summary),
                    Err(e) => {
                        eprintln!("{}: {}", "Search task failed".red(), e);
                        None
                    }
                };
            }
            changed = state.changed(), if state_open => {
                if changed.is_err() {
                    state_open = false;
                    continue;
                }
                let current = *state.borrow_and_update();
                if console.announce_checkpoint(current) {
                    console.prompt();
                }
            }
            line = lines.recv(), if input_open => {
                match line {
                    Some(line) => {
                        if console.handle(Command::parse(&line)).await.is_break() {
                            console.scheduler.shutdown();
                        }
                    }
                    None => {
                        // EOF: let the search finish on its own.
                        input_open = false;
                        continue;
                    }
                }
                console.prompt();
            }
        }
    }
}

struct Console {
    scheduler: Arc<RoundScheduler>,
    session: Option<FeedbackSession>,
    /// Last checkpoint round announced, so each is printed once.
    announced: Option<u32>,
}

impl Console {
    fn prompt(&self) {
        let label = if self.session.is_some() {
            "feedback>".bold().yellow()
        } else if self.scheduler.feedback_channel().pending_checkpoint().is_some() {
            "checkpoint>".bold().yellow()
        } else {
            "seekdog>".bold().cyan()
        };
        print!("{} ", label);
        io::stdout().flush().ok();
    }

    async fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Empty => {}
            Command::Help => cmd_help(),
            Command::Feedback(text) => self.cmd_feedback(text).await,
            Command::Text(text) => match self.session.take() {
                Some(session) => print_submission(session.submit(&text).await),
                None if self.scheduler.feedback_channel().pending_checkpoint().is_some() => {
                    self.answer_checkpoint(Some(&text));
                }
                None => println!(
                    "No feedback session open. Type {} first.",
                    "/feedback".bold()
                ),
            },
            Command::Skip => self.answer_checkpoint(None),
            Command::Cancel => match self.session.take() {
                Some(session) => {
                    session.cancel();
                    println!("{}", "Feedback cancelled; search resumed.".dimmed());
                }
                None => println!("{}", "Nothing to cancel.".dimmed()),
            },
            Command::Status => self.cmd_status(),
            Command::Path(name) => self.cmd_path(&name),
            Command::Landmarks => self.cmd_landmarks(),
            Command::Memory => {
                println!("{}", self.scheduler.memory().recent_text(MEMORY_WINDOW));
            }
            Command::Quit => {
                self.session = None;
                println!("{}", "Stopping search…".green());
                return ControlFlow::Break(());
            }
            Command::Unknown(other) => println!(
                "{} '{}'. Type {} for available commands.",
                "Unknown command:".red(),
                other.yellow(),
                "/help".bold()
            ),
        }
        ControlFlow::Continue(())
    }

    async fn cmd_feedback(&mut self, text: Option<String>) {
        if self.session.is_some() {
            println!("{}", "A feedback session is already open.".yellow());
            return;
        }
        let channel = self.scheduler.feedback_channel();
        let session = match channel.request_feedback() {
            Ok(session) => session,
            Err(e) => {
                println!("{}: {}", "Cannot open feedback".red(), e);
                return;
            }
        };
        match text {
            Some(text) => print_submission(session.submit(&text).await),
            None => {
                println!(
                    "Search paused at {}. Type your feedback, or {} to resume.",
                    channel.current_pose().to_string().bold(),
                    "/cancel".bold()
                );
                self.session = Some(session);
            }
        }
    }

    /// Print the checkpoint prompt the first time the loop parks at it.
    /// Returns whether anything was printed.
    fn announce_checkpoint(&mut self, state: SchedulerState) -> bool {
        if state != SchedulerState::AwaitingFeedback || self.session.is_some() {
            return false;
        }
        let Some(round) = self.scheduler.feedback_channel().pending_checkpoint() else {
            return false;
        };
        if self.announced == Some(round) {
            return false;
        }
        self.announced = Some(round);
        println!();
        println!(
            "Before round {}: any feedback? Type it, or {} to continue.",
            round.to_string().bold(),
            "/skip".bold()
        );
        true
    }

    fn answer_checkpoint(&self, text: Option<&str>) {
        match self.scheduler.feedback_channel().answer_checkpoint(text) {
            Ok(round) if text.is_some() => {
                println!("{} round {}.", "✓ Feedback passed to".green(), round)
            }
            Ok(round) => println!("{}", format!("Round {round} runs without feedback.").dimmed()),
            Err(e) => println!("{}: {}", "Cannot answer".red(), e),
        }
    }

    fn cmd_status(&self) {
        let memory = self.scheduler.memory();
        println!("  State  : {:?}", self.scheduler.state());
        println!("  Pose   : {}", self.scheduler.current_pose().to_string().bold());
        println!("  Rounds : {}", memory.len());
        if let Some(last) = memory.last() {
            println!("  Last   : {}", last.action_text().dimmed());
        }
    }

    fn cmd_path(&self, name: &str) {
        match self.scheduler.feedback_channel().plan(name) {
            Ok((name, outcome)) => println!("  {}: {}", name.bold(), describe_path(&outcome)),
            Err(e) => println!("{}: {}", "Cannot plan".red(), e),
        }
    }

    fn cmd_landmarks(&self) {
        let map = self.scheduler.map();
        println!("{}", "Landmarks".bold().underline());
        for (name, pose) in map.landmarks() {
            println!("  {:<16} {}", name.bold(), pose);
        }
    }
}

fn cmd_help() {
    println!();
    println!("{}", "SeekDog Commands".bold().underline());
    println!("  {} – pause the search and give feedback", "/feedback [text]".bold().cyan());
    println!("  {}           – resume without feedback", "/cancel".bold().cyan());
    println!("  {}             – continue past a checkpoint", "/skip".bold().cyan());
    println!("  {}           – state, pose and round count", "/status".bold().cyan());
    println!("  {}  – plan a route without moving", "/path <landmark>".bold().cyan());
    println!("  {}        – list named landmarks", "/landmarks".bold().cyan());
    println!("  {}           – recent round history", "/memory".bold().cyan());
    println!("  {}     – stop the search and exit", "/quit  /exit".bold().cyan());
    println!();
}

fn describe_path(outcome: &PathOutcome) -> String {
    match outcome {
        PathOutcome::AtGoal => "already there".to_string(),
        PathOutcome::Unreachable => "unreachable from here".to_string(),
        PathOutcome::Route(actions) => format!(
            "{} steps: {}",
            actions.len(),
            actions.iter().map(|a| a.label()).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn print_submission(result: Result<FeedbackOutcome, seekdog_types::SeekError>) {
    match result {
        Ok(FeedbackOutcome::Landmark {
            name,
            path,
            new_pose,
        }) => {
            println!(
                "{} {} ({}); now at {}",
                "✓ Heading to".green(),
                name.bold(),
                describe_path(&path),
                new_pose.to_string().bold()
            );
        }
        Ok(FeedbackOutcome::FreeForm { decision, new_pose }) => {
            let actions: Vec<_> = decision.actions.iter().map(|a| a.label()).collect();
            println!(
                "{} [{}]; now at {}",
                "✓ Feedback applied:".green(),
                actions.join(", "),
                new_pose.to_string().bold()
            );
            if !decision.rationale.is_empty() {
                println!("  {}", decision.rationale.dimmed());
            }
        }
        Err(e) => println!("{}: {}", "Feedback failed".red(), e),
    }
}
