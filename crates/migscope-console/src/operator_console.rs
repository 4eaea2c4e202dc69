//! Terminal console for inspecting migration datasets.
//!
//! The same surface as the HTTP dashboard in a ratatui TUI: load a prefix,
//! local files or the self-test sample, flip through datasets and read the
//! adaptive table, summary, record samples and log.
//!
//! Launch with `migscope --console`.

use std::future::Future;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};

use migscope_core::views::{
    self, Cell, DatasetMetric, DatasetSample, DatasetTab, TableRow, TableView,
};
use migscope_core::{DatasetKey, LogEntry, LogLevel, SAMPLE_SIZE};
use migscope_loader::{FileInput, LocalFiles, Notice, NoticeTone, Session};

const MAX_CONSOLE_MESSAGES: usize = 500;
const LOG_PANEL_LINES: usize = 200;

/// A parsed line of operator input.
#[derive(Debug, Clone)]
pub enum ConsoleCommand {
    Load(String),
    Files(LocalFiles),
    SelfTest,
    Show(String),
    Status,
    Help,
    Quit,
    /// Input that could not be parsed, with the message to show.
    Invalid(String),
}

/// Parse one line of input. Plain text loads it as a prefix.
pub fn parse_command(input: &str) -> Option<ConsoleCommand> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if !input.starts_with('/') {
        return Some(ConsoleCommand::Load(input.to_string()));
    }

    let (command, args) = match input.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (input, ""),
    };

    let cmd = match command {
        "/load" if args.is_empty() => ConsoleCommand::Invalid("usage: /load <prefix>".into()),
        "/load" => ConsoleCommand::Load(args.to_string()),
        "/files" => parse_files(args),
        "/selftest" | "/self-test" => ConsoleCommand::SelfTest,
        "/show" if args.is_empty() => {
            ConsoleCommand::Invalid("usage: /show contacts|chats|messages".into())
        }
        "/show" => ConsoleCommand::Show(args.to_string()),
        "/status" => ConsoleCommand::Status,
        "/help" | "/?" => ConsoleCommand::Help,
        "/quit" | "/exit" | "/q" => ConsoleCommand::Quit,
        other => ConsoleCommand::Invalid(format!("unknown command '{other}', try /help")),
    };
    Some(cmd)
}

fn parse_files(args: &str) -> ConsoleCommand {
    const USAGE: &str = "usage: /files summary=<path> contacts=<path> chats=<path> messages=<path>";

    let mut files = LocalFiles::default();
    for token in args.split_whitespace() {
        let Some((slot, path)) = token.split_once('=').filter(|(_, p)| !p.is_empty()) else {
            return ConsoleCommand::Invalid(USAGE.into());
        };
        let input = FileInput::Path(PathBuf::from(path));
        if slot.eq_ignore_ascii_case("summary") {
            files.summary = Some(input);
        } else if let Ok(key) = slot.parse::<DatasetKey>() {
            files.set_dataset(key, input);
        } else {
            return ConsoleCommand::Invalid(format!("unknown file slot '{slot}'"));
        }
    }

    if files.is_empty() {
        ConsoleCommand::Invalid(USAGE.into())
    } else {
        ConsoleCommand::Files(files)
    }
}

/// State read from the session once per frame.
struct ConsoleSnapshot {
    source_label: Option<String>,
    loaded_at: Option<DateTime<Utc>>,
    notice: Option<Notice>,
    hidden: bool,
    summary: String,
    metrics: Vec<DatasetMetric>,
    tabs: Vec<DatasetTab>,
    table: TableView,
    samples: Vec<DatasetSample>,
    log: Vec<LogEntry>,
    pending: usize,
}

struct OperatorConsole {
    session: Session,
    /// Current text in the input field.
    input: String,
    /// Cursor position within the input field, in chars.
    cursor_pos: usize,
    history: Vec<String>,
    history_pos: Option<usize>,
    /// First visible row of the table.
    table_scroll: usize,
    /// Loads still running in the background.
    pending: Arc<AtomicUsize>,
    console_messages: Vec<(DateTime<Utc>, String, Color)>,
}

impl OperatorConsole {
    fn new(session: Session) -> Self {
        let mut console = Self {
            session,
            input: String::new(),
            cursor_pos: 0,
            history: Vec::new(),
            history_pos: None,
            table_scroll: 0,
            pending: Arc::new(AtomicUsize::new(0)),
            console_messages: Vec::new(),
        };
        console.add_message(
            "migscope console ready. Type a prefix and press Enter to load it.",
            Color::Cyan,
        );
        console.add_message(
            "Commands: /help, /files, /selftest, /show, /status, /quit",
            Color::DarkGray,
        );
        console
    }

    async fn snapshot(&self) -> ConsoleSnapshot {
        let notice = self.session.notice().await;
        let log = self.session.log().tail(LOG_PANEL_LINES);
        let store = self.session.read().await;

        ConsoleSnapshot {
            source_label: store.source_label().map(str::to_string),
            loaded_at: store.loaded_at(),
            notice,
            hidden: views::is_hidden(&store),
            summary: views::summary_or_placeholder(&store),
            metrics: views::metrics(&store),
            tabs: views::dataset_tabs(&store),
            table: views::active_table(&store),
            samples: views::samples(&store, SAMPLE_SIZE),
            log,
            pending: self.pending.load(Ordering::Relaxed),
        }
    }

    /// Returns `true` when the operator asked to quit.
    async fn process_input(&mut self) -> bool {
        let input = self.input.trim().to_string();
        self.input.clear();
        self.cursor_pos = 0;

        let Some(command) = parse_command(&input) else {
            return false;
        };
        self.history.push(input);
        self.history_pos = None;

        match command {
            ConsoleCommand::Quit => return true,
            ConsoleCommand::Load(prefix) => {
                self.add_message(&format!("Loading prefix '{prefix}'..."), Color::White);
                let session = self.session.clone();
                self.spawn_load(async move {
                    let _ = session.load_prefix(&prefix).await;
                });
            }
            ConsoleCommand::Files(files) => {
                self.add_message(
                    &format!("Loading {} local file(s)...", files.selected()),
                    Color::White,
                );
                let session = self.session.clone();
                self.spawn_load(async move {
                    let _ = session.load_files(&files).await;
                });
            }
            ConsoleCommand::SelfTest => {
                self.add_message(
                    &format!("Running self-test at {}...", self.session.self_test_url()),
                    Color::White,
                );
                let session = self.session.clone();
                self.spawn_load(async move {
                    let _ = session.run_self_test().await;
                });
            }
            ConsoleCommand::Show(key) => {
                if self.session.select_dataset(&key).await {
                    self.table_scroll = 0;
                } else {
                    self.add_message(&format!("Unknown dataset '{key}'"), Color::Red);
                }
            }
            ConsoleCommand::Status => self.show_status().await,
            ConsoleCommand::Help => self.show_help(),
            ConsoleCommand::Invalid(msg) => self.add_message(&msg, Color::Red),
        }
        false
    }

    fn spawn_load<F>(&self, load: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let pending = self.pending.clone();
        pending.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            load.await;
            pending.fetch_sub(1, Ordering::Relaxed);
        });
    }

    async fn cycle_dataset(&mut self, forward: bool) {
        let current = self.session.read().await.active();
        let idx = DatasetKey::ALL
            .iter()
            .position(|k| *k == current)
            .unwrap_or(0);
        let len = DatasetKey::ALL.len();
        let next = if forward {
            (idx + 1) % len
        } else {
            (idx + len - 1) % len
        };
        self.session.select_dataset(DatasetKey::ALL[next].as_str()).await;
        self.table_scroll = 0;
    }

    async fn show_status(&mut self) {
        let (source, loaded_at, counts) = {
            let store = self.session.read().await;
            let counts: Vec<String> = views::metrics(&store)
                .iter()
                .map(|m| format!("{}={} ({} exported)", m.key, m.total, m.exported))
                .collect();
            (
                store.source_label().unwrap_or("nothing loaded").to_string(),
                store.loaded_at(),
                counts.join("  "),
            )
        };
        self.add_message(&format!("Source: {source}"), Color::Cyan);
        if let Some(at) = loaded_at {
            self.add_message(
                &format!("Loaded at: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                Color::White,
            );
        }
        self.add_message(&format!("Records: {counts}"), Color::White);
        self.add_message(
            &format!("Self-test: {}", self.session.self_test_url()),
            Color::White,
        );
        self.add_message(
            &format!("Log entries: {}", self.session.log().len()),
            Color::White,
        );
    }

    fn show_help(&mut self) {
        self.add_message("Available commands:", Color::Cyan);
        for line in [
            "  <prefix>          - Load everything stored under a prefix",
            "  /load <prefix>    - Same as typing the prefix",
            "  /files slot=path  - Load local files (slots: summary contacts chats messages)",
            "  /selftest         - Run the pipeline self-test and show its sample",
            "  /show <dataset>   - Switch the table to contacts, chats or messages",
            "  /status           - Show the current source and record counts",
            "  /quit             - Exit the console",
            "  Tab/Shift+Tab switch dataset, PageUp/PageDown scroll the table",
        ] {
            self.add_message(line, Color::White);
        }
    }

    fn add_message(&mut self, msg: &str, color: Color) {
        self.console_messages
            .push((Utc::now(), msg.to_string(), color));
        if self.console_messages.len() > MAX_CONSOLE_MESSAGES {
            self.console_messages.remove(0);
        }
    }

    fn render(&self, frame: &mut Frame, snapshot: &ConsoleSnapshot) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Min(10),   // Main area
                Constraint::Length(5), // Input area
            ])
            .split(frame.area());

        self.render_status_bar(frame, outer[0], snapshot);
        self.render_main_area(frame, outer[1], snapshot);
        self.render_input(frame, outer[2]);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let block = Block::default()
            .title(" migscope ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let mut spans = vec![
            Span::styled("  Source: ", Style::default().fg(Color::Gray)),
            Span::styled(
                snap.source_label.clone().unwrap_or_else(|| "-".to_string()),
                Style::default().fg(Color::White),
            ),
            Span::styled("  |  Loaded: ", Style::default().fg(Color::Gray)),
            Span::styled(
                snap.loaded_at
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                Style::default().fg(Color::White),
            ),
        ];
        if snap.pending > 0 {
            spans.push(Span::styled(
                format!("  |  loading ({})", snap.pending),
                Style::default().fg(Color::Yellow),
            ));
        }
        if let Some(notice) = &snap.notice {
            spans.push(Span::styled("  |  ", Style::default().fg(Color::Gray)));
            spans.push(Span::styled(
                notice.text.clone(),
                Style::default().fg(tone_color(notice.tone)),
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }

    fn render_main_area(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(32), // Datasets + summary + console
                Constraint::Percentage(68), // Table + log
            ])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6), // Datasets
                Constraint::Min(4),    // Summary
                Constraint::Min(4),    // Samples
                Constraint::Length(8), // Console output
            ])
            .split(columns[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(6),    // Table
                Constraint::Length(9), // Log
            ])
            .split(columns[1]);

        self.render_datasets(frame, left[0], snap);
        self.render_summary(frame, left[1], snap);
        self.render_samples(frame, left[2], snap);
        self.render_console_output(frame, left[3]);
        self.render_table(frame, right[0], snap);
        self.render_log(frame, right[1], snap);
    }

    fn render_datasets(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let block = Block::default()
            .title(" Datasets ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightBlue));

        let lines: Vec<Line> = snap
            .tabs
            .iter()
            .zip(&snap.metrics)
            .map(|(tab, metric)| {
                let marker = if tab.active { "> " } else { "  " };
                let mut style = if tab.empty {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().fg(Color::White)
                };
                if tab.active {
                    style = style.add_modifier(Modifier::BOLD);
                }
                Line::from(vec![
                    Span::styled(format!("{marker}{:<10}", tab.label), style),
                    Span::styled(format!("{:>7}", metric.total), Style::default().fg(Color::Green)),
                    Span::styled(
                        format!("  {} exported", metric.exported),
                        Style::default().fg(Color::Gray),
                    ),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_summary(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let block = Block::default()
            .title(" Summary ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        // nothing loaded: leave the panel empty, like the page omits it
        if snap.hidden {
            frame.render_widget(block, area);
            return;
        }
        let paragraph = Paragraph::new(snap.summary.as_str())
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(paragraph, area);
    }

    /// Leading records of the active dataset.
    fn render_samples(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let active = snap.tabs.iter().find(|t| t.active).map(|t| t.key);
        let sample = snap.samples.iter().find(|s| Some(s.key) == active);
        let title = match sample {
            Some(s) => format!(" Samples: {} (first {} of {}) ", s.label, s.records.len(), s.total),
            None => " Samples ".to_string(),
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        let Some(sample) = sample.filter(|_| !snap.hidden) else {
            frame.render_widget(block, area);
            return;
        };
        let lines: Vec<Line> = sample
            .records
            .iter()
            .flat_map(|record| record.lines())
            .map(|line| Line::from(Span::styled(line, Style::default().fg(Color::Gray))))
            .collect();
        frame.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
            area,
        );
    }

    fn render_table(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let active = snap.tabs.iter().find(|t| t.active);
        let title = match active {
            Some(tab) => format!(" {} ({}) ", tab.label, tab.count),
            None => " Records ".to_string(),
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        let table = &snap.table;
        if snap.hidden || table.is_empty() {
            let hint = if snap.hidden {
                "  Nothing loaded. Type a prefix below, or /files, /selftest."
            } else {
                "  No records in this dataset."
            };
            let text = Paragraph::new(Line::from(Span::styled(
                hint,
                Style::default().fg(Color::DarkGray),
            )))
            .block(block);
            frame.render_widget(text, area);
            return;
        }

        // borders plus header
        let visible = area.height.saturating_sub(3) as usize;
        let start = self.table_scroll.min(table.rows.len().saturating_sub(1));
        let width = table.header_width();

        let rows: Vec<Row> = table
            .rows
            .iter()
            .skip(start)
            .take(visible)
            .map(|row| match row {
                TableRow::Fields(cells) => Row::new(cells.iter().map(styled_cell)),
                TableRow::Value(cell) => {
                    let mut cells = vec![styled_cell(cell)];
                    cells.resize_with(width, || ratatui::widgets::Cell::from(""));
                    Row::new(cells)
                }
            })
            .collect();

        let header: Vec<String> = if table.columns.is_empty() {
            vec![String::new()]
        } else {
            table.columns.clone()
        };
        let constraints = vec![Constraint::Ratio(1, width as u32); width];

        let widget = Table::new(rows, constraints).block(block).header(
            Row::new(header)
                .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
        );
        frame.render_widget(widget, area);
    }

    fn render_log(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let block = Block::default()
            .title(" Log ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        let inner_height = area.height.saturating_sub(2) as usize;
        let start = snap.log.len().saturating_sub(inner_height);
        let lines: Vec<Line> = snap.log[start..]
            .iter()
            .map(|entry| {
                Line::from(Span::styled(
                    entry.render_line(),
                    Style::default().fg(level_color(entry.level)),
                ))
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_console_output(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Console ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        let inner_height = area.height.saturating_sub(2) as usize;
        let start = self.console_messages.len().saturating_sub(inner_height);
        let lines: Vec<Line> = self.console_messages[start..]
            .iter()
            .map(|(ts, msg, color)| {
                Line::from(vec![
                    Span::styled(
                        format!(" [{}] ", ts.format("%H:%M:%S")),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(msg.as_str(), Style::default().fg(*color)),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Input (Enter = load prefix, /help = commands, /quit = exit) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));

        let input_display = if self.input.is_empty() {
            Line::from(vec![
                Span::styled("  > ", Style::default().fg(Color::Green)),
                Span::styled(
                    "Type a prefix or /command...",
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        } else {
            Line::from(vec![
                Span::styled("  > ", Style::default().fg(Color::Green)),
                Span::styled(&self.input, Style::default().fg(Color::White)),
            ])
        };

        let hint_line = Line::from(Span::styled(
            "  Ctrl+C or /quit to exit  |  Up/Down for history  |  Tab to switch dataset",
            Style::default().fg(Color::DarkGray),
        ));

        let paragraph = Paragraph::new(vec![Line::from(""), input_display, hint_line]).block(block);
        frame.render_widget(paragraph, area);

        let right_edge = area.right().saturating_sub(2);
        let cursor_x = area
            .x
            .saturating_add(4)
            .saturating_add(u16::try_from(self.cursor_pos).unwrap_or(u16::MAX))
            .min(right_edge);
        let cursor_y = area.y.saturating_add(2);
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    /// Handle keyboard input. Returns `true` if the console should exit.
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        let input_len = self.input.chars().count();
        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => return true,
            (KeyCode::Char(c), _) => {
                let idx = self.byte_index(self.cursor_pos);
                self.input.insert(idx, c);
                self.cursor_pos += 1;
            }
            (KeyCode::Backspace, _) => {
                if self.cursor_pos > 0 {
                    let idx = self.byte_index(self.cursor_pos - 1);
                    self.input.remove(idx);
                    self.cursor_pos -= 1;
                }
            }
            (KeyCode::Delete, _) => {
                if self.cursor_pos < input_len {
                    let idx = self.byte_index(self.cursor_pos);
                    self.input.remove(idx);
                }
            }
            (KeyCode::Left, _) => {
                self.cursor_pos = self.cursor_pos.saturating_sub(1);
            }
            (KeyCode::Right, _) => {
                if self.cursor_pos < input_len {
                    self.cursor_pos += 1;
                }
            }
            (KeyCode::Home, _) => self.cursor_pos = 0,
            (KeyCode::End, _) => self.cursor_pos = input_len,
            (KeyCode::Up, _) => {
                if !self.history.is_empty() {
                    let pos = match self.history_pos {
                        Some(p) if p > 0 => p - 1,
                        Some(p) => p,
                        None => self.history.len() - 1,
                    };
                    self.history_pos = Some(pos);
                    self.input = self.history[pos].clone();
                    self.cursor_pos = self.input.chars().count();
                }
            }
            (KeyCode::Down, _) => {
                if let Some(pos) = self.history_pos {
                    if pos + 1 < self.history.len() {
                        self.history_pos = Some(pos + 1);
                        self.input = self.history[pos + 1].clone();
                        self.cursor_pos = self.input.chars().count();
                    } else {
                        self.history_pos = None;
                        self.input.clear();
                        self.cursor_pos = 0;
                    }
                }
            }
            (KeyCode::PageUp, _) => {
                self.table_scroll = self.table_scroll.saturating_sub(10);
            }
            (KeyCode::PageDown, _) => {
                self.table_scroll += 10;
            }
            // Enter and Tab need the session; handled by the caller.
            _ => {}
        }
        false
    }
}

fn styled_cell(cell: &Cell) -> ratatui::widgets::Cell<'static> {
    let color = match cell {
        Cell::Missing => Color::DarkGray,
        Cell::Structured(_) => Color::Yellow,
        Cell::Bool(_) => Color::Magenta,
        Cell::Timestamp(_) => Color::Cyan,
        Cell::Text(_) => Color::White,
    };
    ratatui::widgets::Cell::from(Span::styled(cell.text(), Style::default().fg(color)))
}

fn tone_color(tone: NoticeTone) -> Color {
    match tone {
        NoticeTone::Info => Color::White,
        NoticeTone::Success => Color::Green,
        NoticeTone::Warning => Color::Yellow,
        NoticeTone::Error => Color::Red,
    }
}

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Info => Color::Gray,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Error => Color::Red,
        LogLevel::Success => Color::Green,
    }
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the console event loop until the operator quits.
pub async fn run_operator_console(session: Session) -> Result<(), anyhow::Error> {
    use std::io::IsTerminal;
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!("The console requires a terminal (TTY)."));
    }

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut console = OperatorConsole::new(session);
    let tick_rate = Duration::from_millis(100);

    loop {
        let snapshot = console.snapshot().await;
        terminal.draw(|frame| console.render(frame, &snapshot))?;

        if !event::poll(tick_rate)? {
            continue;
        }
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }

        match key_event.code {
            KeyCode::Enter => {
                if console.process_input().await {
                    break;
                }
            }
            KeyCode::Tab => console.cycle_dataset(true).await,
            KeyCode::BackTab => console.cycle_dataset(false).await,
            code => {
                if console.handle_key(code, key_event.modifiers) {
                    break;
                }
            }
        }
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}
