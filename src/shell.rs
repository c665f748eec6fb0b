//! Interactive shell state and command handling
//!
//! [`ShellController`] owns the snapshot model, the code buffer and the
//! assertion list. It is driven by [`ShellEvent`]s arriving on one channel:
//! user input lines from the front end and load results from the worker.
//! Only one load may be outstanding; further requests are rejected until its
//! result arrives.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::{ParseError, Url};

use crate::codegen::{
    assertion_for, selector_for, setup_stub, snippet_for, AssertionList, CodeBuffer,
};
use crate::errors::{LoadFailure, ScribeError};
use crate::snapshot::{ModelIndex, NodeId, SnapshotModel};
use crate::types::ElementRecord;
use crate::worker::{AutomationWorker, BrowserBackend, LoadTicket};

pub const HELP_TEXT: &str = "\
Commands:
  load <url>        Load a page and snapshot its DOM
  refresh           Reload the current page
  tree              Show the element tree with row paths
  select <path>     Generate a snippet for the element at <path> (e.g. 0.1.2)
  assert <path>     Generate a visibility assertion for the element at <path>
  assertions        Show generated assertions
  code              Show the generated script
  new               Start a fresh script for the current page
  save <file>       Write the script to <file>
  open <file>       Replace the script with the contents of <file>
  status            Show what is loaded
  help              Show this help
  quit              Exit";

/// Everything the controller reacts to
#[derive(Debug)]
pub enum ShellEvent {
    /// One line typed by the user
    Input(String),
    /// A background load finished
    LoadFinished {
        ticket: LoadTicket,
        result: Result<ElementRecord, LoadFailure>,
    },
    /// Input closed or the user asked to leave
    Quit,
}

/// Parsed shell input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Load(String),
    Refresh,
    Tree,
    Select(String),
    Assert(String),
    Assertions,
    Code,
    New,
    Save(PathBuf),
    Open(PathBuf),
    Status,
    Help,
    Quit,
    Nothing,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, ScribeError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "" => ShellCommand::Nothing,
            "load" => ShellCommand::Load(rest.to_string()),
            "refresh" | "reload" => ShellCommand::Refresh,
            "tree" => ShellCommand::Tree,
            "select" => ShellCommand::Select(rest.to_string()),
            "assert" => ShellCommand::Assert(rest.to_string()),
            "assertions" => ShellCommand::Assertions,
            "code" => ShellCommand::Code,
            "new" => ShellCommand::New,
            "save" if !rest.is_empty() => ShellCommand::Save(PathBuf::from(rest)),
            "open" if !rest.is_empty() => ShellCommand::Open(PathBuf::from(rest)),
            "status" => ShellCommand::Status,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            _ => return Err(ScribeError::UnknownCommand(line.to_string())),
        };
        Ok(command)
    }
}

/// Output surface of the shell
pub trait ShellView {
    fn show_warning(&mut self, message: &str);
    fn show_error(&mut self, message: &str);
    fn set_status(&mut self, status: &str);
    fn set_input_enabled(&mut self, enabled: bool);
    fn show_tree(&mut self, model: &SnapshotModel);
    fn show_code(&mut self, code: &str);
    fn show_text(&mut self, text: &str);
}

/// Turn user input into an absolute URL, assuming `https://` when no scheme is given
pub fn normalize_url(input: &str) -> Result<Url, ScribeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ScribeError::EmptyUrl);
    }

    let parsed = match Url::parse(input) {
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", input)),
        // "localhost:8080" parses with "localhost" as its scheme
        Ok(url) if url.cannot_be_a_base() && url.path().starts_with(|c: char| c.is_ascii_digit()) => {
            Url::parse(&format!("https://{}", input))
        }
        other => other,
    };

    parsed.map_err(|e| ScribeError::InvalidUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Setup stub for `url` with one step per row path, placed inside `run`
pub fn script_for(model: &SnapshotModel, url: &Url, paths: &[String]) -> Result<String, ScribeError> {
    let mut buffer = CodeBuffer::new();
    buffer.replace(setup_stub(url.as_str()));

    for path in paths {
        let index = model
            .resolve_path(path)
            .ok_or_else(|| ScribeError::NoSuchElement(path.trim().to_string()))?;
        let Some(record) = model.record(index.node) else {
            continue;
        };
        match selector_for(record) {
            Some(selector) => {
                buffer.insert_at_marker(&snippet_for(record, &selector));
            }
            None => info!("No selector available for {}", record.summary()),
        }
    }

    Ok(buffer.text().to_string())
}

struct InFlightLoad {
    ticket: LoadTicket,
    url: Url,
    task: JoinHandle<()>,
}

pub struct ShellController<B: BrowserBackend, V: ShellView> {
    worker: AutomationWorker<B>,
    view: V,
    events: UnboundedSender<ShellEvent>,
    model: SnapshotModel,
    buffer: CodeBuffer,
    assertions: AssertionList,
    current_url: Option<Url>,
    loaded_at: Option<DateTime<Local>>,
    in_flight: Option<InFlightLoad>,
}

impl<B: BrowserBackend, V: ShellView> ShellController<B, V> {
    /// `events` is the sender side of the channel this controller is fed from
    pub fn new(worker: AutomationWorker<B>, view: V, events: UnboundedSender<ShellEvent>) -> Self {
        Self {
            worker,
            view,
            events,
            model: SnapshotModel::new(),
            buffer: CodeBuffer::new(),
            assertions: AssertionList::new(),
            current_url: None,
            loaded_at: None,
            in_flight: None,
        }
    }

    pub fn model(&self) -> &SnapshotModel {
        &self.model
    }

    pub fn buffer(&self) -> &CodeBuffer {
        &self.buffer
    }

    pub fn assertions(&self) -> &AssertionList {
        &self.assertions
    }

    pub fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Sender for posting further events to this controller
    pub fn event_sender(&self) -> UnboundedSender<ShellEvent> {
        self.events.clone()
    }

    /// React to one event; returns `false` once the shell should exit
    pub fn handle_event(&mut self, event: ShellEvent) -> bool {
        match event {
            ShellEvent::Input(line) => match ShellCommand::parse(&line) {
                Ok(ShellCommand::Quit) => {
                    self.shutdown();
                    false
                }
                Ok(command) => {
                    if let Err(e) = self.execute(command) {
                        self.report(&e);
                    }
                    true
                }
                Err(e) => {
                    self.report(&e);
                    true
                }
            },
            ShellEvent::LoadFinished { ticket, result } => {
                self.finish_load(ticket, result);
                true
            }
            ShellEvent::Quit => {
                self.shutdown();
                false
            }
        }
    }

    pub fn execute(&mut self, command: ShellCommand) -> Result<(), ScribeError> {
        match command {
            ShellCommand::Load(input) => self.request_load(&input).map(|_| ()),
            ShellCommand::Refresh => self.refresh().map(|_| ()),
            ShellCommand::Tree => {
                self.require_snapshot()?;
                self.view.show_tree(&self.model);
                Ok(())
            }
            ShellCommand::Select(path) => {
                let index = self.resolve(&path)?;
                self.select(&index);
                Ok(())
            }
            ShellCommand::Assert(path) => {
                let index = self.resolve(&path)?;
                self.assert(&index);
                Ok(())
            }
            ShellCommand::Assertions => {
                if self.assertions.is_empty() {
                    self.view.show_text("No assertions yet");
                } else {
                    let text = self.assertions.iter().collect::<Vec<_>>().join("\n");
                    self.view.show_text(&text);
                }
                Ok(())
            }
            ShellCommand::Code => {
                self.view.show_code(self.buffer.text());
                Ok(())
            }
            ShellCommand::New => {
                self.new_script();
                Ok(())
            }
            ShellCommand::Save(path) => self.save(&path),
            ShellCommand::Open(path) => self.open(&path),
            ShellCommand::Status => {
                let status = self.status_line();
                self.view.set_status(&status);
                Ok(())
            }
            ShellCommand::Help => {
                self.view.show_text(HELP_TEXT);
                Ok(())
            }
            ShellCommand::Quit => {
                self.shutdown();
                Ok(())
            }
            ShellCommand::Nothing => Ok(()),
        }
    }

    /// Start loading `input` in the background
    pub fn request_load(&mut self, input: &str) -> Result<LoadTicket, ScribeError> {
        let url = normalize_url(input)?;
        if self.in_flight.is_some() {
            return Err(ScribeError::LoadInProgress);
        }

        let ticket = LoadTicket::new();
        info!("Starting load {} of {}", ticket, url);

        self.view.set_input_enabled(false);
        self.view.set_status(&format!("Loading {}...", url));

        let task = self.worker.spawn(ticket, url.clone(), self.events.clone());
        self.in_flight = Some(InFlightLoad { ticket, url, task });
        Ok(ticket)
    }

    /// Load the current page again
    pub fn refresh(&mut self) -> Result<LoadTicket, ScribeError> {
        let url = self
            .current_url
            .as_ref()
            .map(Url::to_string)
            .ok_or(ScribeError::NothingLoaded)?;
        self.request_load(&url)
    }

    fn finish_load(&mut self, ticket: LoadTicket, result: Result<ElementRecord, LoadFailure>) {
        let load = match self.in_flight.take() {
            Some(load) if load.ticket == ticket => load,
            other => {
                debug!("Ignoring result of stale load {}", ticket);
                self.in_flight = other;
                return;
            }
        };

        match result {
            Ok(root) => self.apply_snapshot(load.url, root),
            Err(failure) => {
                warn!("Load of {} failed: {}", load.url, failure);
                let err = ScribeError::from(failure);
                self.view.show_error(&err.to_string());
                self.view.set_status(&format!("Failed to load {}", load.url));
            }
        }

        self.view.set_input_enabled(true);
    }

    fn apply_snapshot(&mut self, url: Url, root: ElementRecord) {
        self.model.reset();
        self.model.populate(std::slice::from_ref(&root), NodeId::ROOT);

        self.buffer.replace(setup_stub(url.as_str()));
        self.assertions.clear();
        self.current_url = Some(url);
        self.loaded_at = Some(Local::now());

        self.view.show_tree(&self.model);
        self.view.show_code(self.buffer.text());
        let status = self.status_line();
        self.view.set_status(&status);
    }

    fn require_snapshot(&self) -> Result<(), ScribeError> {
        if self.model.is_empty() {
            Err(ScribeError::NothingLoaded)
        } else {
            Ok(())
        }
    }

    fn resolve(&self, path: &str) -> Result<ModelIndex, ScribeError> {
        self.require_snapshot()?;
        self.model
            .resolve_path(path)
            .ok_or_else(|| ScribeError::NoSuchElement(path.trim().to_string()))
    }

    /// Append the snippet for the element at `index`; returns it when one was generated
    pub fn select(&mut self, index: &ModelIndex) -> Option<String> {
        let record = self.model.record(index.node)?.detached();
        let summary = record.summary();

        let Some(selector) = selector_for(&record) else {
            debug!("No selector available for {}", summary);
            self.view.set_status(&summary);
            return None;
        };

        let snippet = snippet_for(&record, &selector);
        debug!("Generated {} snippet for {}", selector.kind(), summary);
        self.buffer.append(&snippet);
        self.view.show_code(self.buffer.text());
        self.view.set_status(&summary);
        Some(snippet)
    }

    /// Record a visibility assertion for the element at `index`
    pub fn assert(&mut self, index: &ModelIndex) -> Option<String> {
        let record = self.model.record(index.node)?;
        let summary = record.summary();

        let Some(selector) = selector_for(record) else {
            self.view.set_status(&summary);
            return None;
        };

        let assertion = assertion_for(&selector);
        self.assertions.push(assertion.clone());
        self.view.show_text(&assertion);
        self.view.set_status(&summary);
        Some(assertion)
    }

    /// Reset the script to the stub for the current page and drop assertions
    pub fn new_script(&mut self) {
        match &self.current_url {
            Some(url) => self.buffer.replace(setup_stub(url.as_str())),
            None => self.buffer.clear(),
        }
        self.assertions.clear();
        self.view.show_code(self.buffer.text());
    }

    pub fn save(&mut self, path: &Path) -> Result<(), ScribeError> {
        let path = expand_home(path);
        std::fs::write(&path, self.buffer.text())
            .map_err(|e| ScribeError::io(format!("Failed to save {}", path.display()), e))?;
        info!("Saved script to {}", path.display());
        self.view
            .set_status(&format!("Saved script to {}", path.display()));
        Ok(())
    }

    pub fn open(&mut self, path: &Path) -> Result<(), ScribeError> {
        let path = expand_home(path);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ScribeError::io(format!("Failed to open {}", path.display()), e))?;
        self.buffer.replace(text);
        self.view.show_code(self.buffer.text());
        self.view
            .set_status(&format!("Opened script {}", path.display()));
        Ok(())
    }

    pub fn status_line(&self) -> String {
        if let Some(load) = &self.in_flight {
            return format!("Loading {}...", load.url);
        }
        match (&self.current_url, &self.loaded_at) {
            (Some(url), Some(at)) => format!(
                "Loaded {} ({} elements) at {}",
                url,
                self.model.len(),
                at.format("%H:%M:%S")
            ),
            _ => "No page loaded".to_string(),
        }
    }

    fn report(&mut self, err: &ScribeError) {
        if err.is_input_error() {
            debug!("Rejected input: {}", err);
            self.view.show_warning(&err.to_string());
        } else {
            warn!("{}", err);
            self.view.show_error(&err.to_string());
        }
    }

    /// Abort the outstanding load, if any
    pub fn shutdown(&mut self) {
        if let Some(load) = self.in_flight.take() {
            info!("Aborting load {} of {}", load.ticket, load.url);
            load.task.abort();
        }
    }
}

impl<B: BrowserBackend, V: ShellView> Drop for ShellController<B, V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
#[path = "shell_test.rs"]
mod shell_test;
