//! Line-oriented terminal front end for the shell

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::shell::{ShellController, ShellEvent, ShellView};
use crate::snapshot::{ModelIndex, SnapshotModel, HEADERS, ROOT_LABEL};
use crate::worker::BrowserBackend;

pub const PROMPT: &str = "webscribe> ";

/// Render the tree with dotted row paths, one element per line
///
/// Walks the model only through `row_count`/`index`/`data`, the same
/// coordinates `select <path>` resolves.
pub fn render_tree(model: &SnapshotModel) -> String {
    let mut out = String::from(ROOT_LABEL);
    out.push('\n');
    render_children(model, None, "", 1, &mut out);
    out
}

fn render_children(
    model: &SnapshotModel,
    parent: Option<&ModelIndex>,
    prefix: &str,
    depth: usize,
    out: &mut String,
) {
    for row in 0..model.row_count(parent) {
        let Some(index) = model.index(row, 0, parent) else {
            continue;
        };
        let path = if prefix.is_empty() {
            row.to_string()
        } else {
            format!("{}.{}", prefix, row)
        };

        out.push_str(&"  ".repeat(depth));
        out.push_str(&path);
        out.push(' ');
        out.push_str(model.data(&index).unwrap_or(""));

        for column in 1..model.column_count() {
            let Some(cell) = model.index(row, column, parent) else {
                continue;
            };
            let text = model.data(&cell).unwrap_or("");
            if !text.is_empty() {
                let label = HEADERS[column].to_ascii_lowercase();
                out.push_str(&format!(" {}=\"{}\"", label, text));
            }
        }
        out.push('\n');

        render_children(model, Some(&index), &path, depth + 1, out);
    }
}

/// Writes shell output to stdout and diagnostics to stderr
#[derive(Debug)]
pub struct TerminalView {
    input_enabled: bool,
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            input_enabled: true,
        }
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Show the prompt unless a load is running
    pub fn prompt(&self) {
        if self.input_enabled {
            print!("{}", PROMPT);
            let _ = std::io::stdout().flush();
        }
    }
}

impl ShellView for TerminalView {
    fn show_warning(&mut self, message: &str) {
        eprintln!("Warning: {}", message);
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("Error: {}", message);
    }

    fn set_status(&mut self, status: &str) {
        println!("[{}]", status);
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    fn show_tree(&mut self, model: &SnapshotModel) {
        print!("{}", render_tree(model));
    }

    fn show_code(&mut self, code: &str) {
        println!("{}", code.trim_end());
    }

    fn show_text(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Forward stdin lines as input events; EOF becomes [`ShellEvent::Quit`]
pub fn spawn_stdin_reader(events: UnboundedSender<ShellEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if events.send(ShellEvent::Input(line)).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed");
                    let _ = events.send(ShellEvent::Quit);
                    break;
                }
                Err(e) => {
                    debug!("Failed to read stdin: {}", e);
                    let _ = events.send(ShellEvent::Quit);
                    break;
                }
            }
        }
    })
}

/// Drive `controller` until the user quits or stdin closes
pub async fn run_shell<B: BrowserBackend>(
    mut controller: ShellController<B, TerminalView>,
    mut events: UnboundedReceiver<ShellEvent>,
    initial_url: Option<String>,
) -> Result<()> {
    println!("webscribe {} - type 'help' for commands", env!("CARGO_PKG_VERSION"));

    if let Some(url) = initial_url {
        controller.handle_event(ShellEvent::Input(format!("load {}", url)));
    }

    let reader = spawn_stdin_reader(controller.event_sender());
    controller.view().prompt();

    while let Some(event) = events.recv().await {
        let is_input = matches!(event, ShellEvent::Input(_));
        let was_loading = controller.is_loading();

        if !controller.handle_event(event) {
            break;
        }

        if is_input || (was_loading && !controller.is_loading()) {
            controller.view().prompt();
        }
    }

    reader.abort();
    controller.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::NodeId;
    use crate::types::ElementRecord;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_tree_paths() {
        let mut model = SnapshotModel::new();
        let root = ElementRecord::new("html").with_children(vec![
            ElementRecord::new("head"),
            ElementRecord::new("body").with_children(vec![
                ElementRecord::new("input")
                    .with_id("email")
                    .with_type("text"),
                ElementRecord::new("p").with_value("Hello"),
            ]),
        ]);
        model.populate(&[root], NodeId::ROOT);

        assert_eq!(
            render_tree(&model),
            "Document\n\
             \x20 0 html\n\
             \x20   0.0 head\n\
             \x20   0.1 body\n\
             \x20     0.1.0 input id=\"email\" type=\"text\"\n\
             \x20     0.1.1 p value=\"Hello\"\n"
        );
    }

    #[test]
    fn test_render_empty_tree() {
        assert_eq!(render_tree(&SnapshotModel::new()), "Document\n");
    }

    #[test]
    fn test_view_tracks_input_state() {
        let mut view = TerminalView::new();
        assert!(view.input_enabled());
        view.set_input_enabled(false);
        assert!(!view.input_enabled());
    }
}
