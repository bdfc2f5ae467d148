use anyhow::Context;
use clap::{CommandFactory, Parser};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Padding, Paragraph},
};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;
use tui_textarea::{CursorMove, Input, TextArea};

use crate::form::{CharCount, PRESETS, Preset, summary};
use crate::logging;
use crate::preview::BitmapPreview;
use crate::qr::controller::RenderController;
use crate::qr::export::{DEFAULT_FILENAME, ExportService};
use crate::qr::logo::LogoSlot;
use crate::qr::settings::{RenderArgs, RenderSettings};
use crate::tool::Tool;

// How long to wait for a key before checking on background work.
const TICK: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "form", about = "Type text and preview its QR code live")]
pub struct FormTool {
    /// Directory downloaded images are saved to
    #[arg(short, long, default_value = ".")]
    directory: PathBuf,

    /// File name used for downloads
    #[arg(long, default_value = DEFAULT_FILENAME)]
    filename: String,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    render: RenderArgs,
}

impl Tool for FormTool {
    fn cli() -> clap::Command {
        FormTool::command()
    }

    fn execute(&self) -> anyhow::Result<Option<crate::tool::Output>> {
        if let Some(path) = &self.log_file {
            logging::to_file(path, 2)?;
        }

        let settings = RenderSettings::from(&self.render);
        let logo = match &settings.logo {
            Some(path) => LogoSlot::spawn(path.clone()),
            None => LogoSlot::Absent,
        };

        let controller = RenderController::from_settings(settings).with_logo(logo);
        let exporter = ExportService::new(&self.directory).with_filename(&self.filename);
        let mut app = App::new(controller, exporter);

        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = run_app_loop(&mut terminal, &mut app);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        res.context("Form exited with an error")?;
        Ok(None)
    }
}

enum Status {
    Saved(PathBuf),
    Failed(String),
}

struct App<'a> {
    textarea: TextArea<'a>,
    controller: RenderController,
    exporter: ExportService,
    status: Option<Status>,
}

fn new_textarea<'a>(text: &str) -> TextArea<'a> {
    let mut textarea = TextArea::new(text.split('\n').map(str::to_string).collect());
    textarea.set_cursor_line_style(Style::new());
    textarea.set_cursor_style(Style::new().bg(Color::White).fg(Color::Black));
    textarea.set_placeholder_text("Type your text, URL, or message here...");
    textarea.set_block(
        Block::default()
            .borders(Borders::LEFT)
            .border_type(BorderType::Thick)
            .border_style(Style::new().fg(Color::Blue))
            .padding(Padding::horizontal(1)),
    );
    textarea.move_cursor(CursorMove::Bottom);
    textarea.move_cursor(CursorMove::End);
    textarea
}

impl<'a> App<'a> {
    fn new(controller: RenderController, exporter: ExportService) -> Self {
        App {
            textarea: new_textarea(controller.text()),
            controller,
            exporter,
            status: None,
        }
    }

    fn text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    // Forward the text area contents to the controller if they changed.
    fn sync_text(&mut self) {
        let text = self.text();
        if text != self.controller.text() {
            self.controller.set_text(text);
            self.status = None;
        }
    }

    fn clear(&mut self) {
        self.textarea = new_textarea("");
        self.controller.clear();
        self.status = None;
    }

    fn apply_preset(&mut self, preset: &Preset) {
        self.textarea = new_textarea(preset.value);
        self.controller.set_text(preset.value);
        self.status = None;
    }

    fn download(&mut self) {
        // Make sure the surface reflects the latest keystroke.
        self.controller.pump();

        match self.exporter.download(&self.controller) {
            Ok(Some(path)) => self.status = Some(Status::Saved(path)),
            Ok(None) => {}
            Err(err) => {
                tracing::error!(%err, "download failed");
                self.status = Some(Status::Failed(err.to_string()));
            }
        }
    }
}

fn run_app_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        app.controller.pump();
        terminal.draw(|f| draw_ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let ctrl = key
                .modifiers
                .contains(crossterm::event::KeyModifiers::CONTROL);

            match key.code {
                KeyCode::Char('q') if ctrl => return Ok(()),
                KeyCode::Char('s') if ctrl => app.download(),
                KeyCode::Char('l') if ctrl => app.clear(),
                KeyCode::Esc => app.clear(),
                KeyCode::F(n @ 1..=3) => app.apply_preset(&PRESETS[usize::from(n - 1)]),
                _ => {
                    if app.textarea.input(Input::from(Event::Key(key))) {
                        app.sync_text();
                    }
                }
            }
        }
    }
}

// Draw the UI.
fn draw_ui(f: &mut ratatui::Frame, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .spacing(2)
        .horizontal_margin(2)
        .vertical_margin(1)
        .split(f.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Label
            Constraint::Min(6),    // Input
            Constraint::Length(1), // Character count
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Summary
            Constraint::Length(1), // Spacer
            Constraint::Length(3), // Samples
            Constraint::Length(1), // Status
            Constraint::Length(1), // Help
        ])
        .split(columns[0]);

    f.render_widget(Paragraph::new("Enter Text or URL"), chunks[0]);
    f.render_widget(&app.textarea, chunks[1]);
    draw_count(f, app, chunks[2]);
    f.render_widget(
        Paragraph::new(summary(app.controller.text())).fg(Color::DarkGray),
        chunks[4],
    );
    draw_samples(f, chunks[6]);
    draw_status(f, app, chunks[7]);
    draw_help(f, app, chunks[8]);
    draw_preview(f, app, columns[1]);
}

fn draw_count(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let count = CharCount::of(app.controller.text());
    let hint_style = if count.is_long() {
        Style::new().fg(Color::Yellow)
    } else {
        Style::new().fg(Color::DarkGray)
    };

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("{} characters", count.0), Color::DarkGray),
            " ".repeat(3).into(),
            Span::styled(count.hint(), hint_style),
        ])),
        area,
    );
}

fn draw_samples(f: &mut ratatui::Frame, area: Rect) {
    let muted = Style::new().fg(Color::DarkGray);

    let lines = PRESETS
        .iter()
        .enumerate()
        .map(|(i, preset)| {
            Line::from(vec![
                Span::styled(format!("F{} ", i + 1), muted),
                format!("{:<16}", preset.label).into(),
                Span::styled(preset.hint, muted),
            ])
        })
        .collect::<Vec<_>>();

    f.render_widget(Paragraph::new(lines), area);
}

fn draw_status(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Some(Status::Saved(path)) => {
            Line::styled(format!("Saved {}", path.display()), Color::Green)
        }
        Some(Status::Failed(err)) => Line::styled(format!("Download failed: {err}"), Color::Red),
        None => Line::default(),
    };

    f.render_widget(Paragraph::new(line), area);
}

// Add a line for help text below. Download is dimmed while it would do nothing.
fn draw_help(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let muted = Style::new().fg(Color::DarkGray);
    let download = if app.controller.can_export() {
        Style::new()
    } else {
        muted.crossed_out()
    };

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Download ", download),
            Span::styled("Ctrl + s", muted),
            " ".repeat(3).into(),
            "Clear ".into(),
            Span::styled("Esc", muted),
            " ".repeat(3).into(),
            "Exit ".into(),
            Span::styled("Ctrl + q", muted),
        ])),
        area,
    );
}

fn draw_preview(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(Color::DarkGray))
        .title(" QR Code Preview ")
        .padding(Padding::uniform(1));

    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(BitmapPreview::new(app.controller.bitmap()), inner);
}
