//! Ratatui-based terminal UI.
//!
//! The TUI provides month/year selectors and a component multi-select list,
//! re-derives the chart on every change, and reports the hovered point under
//! the mouse in the status bar.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use tracing::warn;

use crate::app::pipeline::{ChartState, derive_state};
use crate::chart::scale::format_change;
use crate::chart::scene::{EMPTY_SELECTION_MESSAGE, NO_DATA_MESSAGE};
use crate::chart::{HoverInfo, Point, Scene, build_scene, hit_test, write_svg};
use crate::cli::DataArgs;
use crate::data::DataSource;
use crate::domain::{Layout as ChartLayout, Margins, Rgb, Selection};
use crate::error::{AppError, EXIT_RUNTIME};
use crate::io::ingest::Dataset;

mod plotters_chart;

use plotters_chart::{ChartLine, CpiPlottersChart};

/// Virtual pixels per terminal cell used to size the scene for hit-testing.
const CELL_W: f64 = 8.0;
const CELL_H: f64 = 16.0;
/// Extra reach around markers, half a cell tall.
const HOVER_TOLERANCE: f64 = CELL_H / 2.0;
const EXPORT_PATH: &str = "cpi-chart.svg";

/// Start the TUI.
pub fn run(args: DataArgs) -> Result<(), AppError> {
    // Load before taking over the terminal so a slow fetch leaves the shell usable.
    let source = DataSource::resolve(args.data.as_deref());
    let loaded = source.load();
    let mut app = App::from_load(source.to_string(), loaded);

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen, mouse) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode()
            .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(AppError::new(
                EXIT_RUNTIME,
                format!("Failed to enter alternate screen: {e}"),
            ));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Year,
    Month,
    Components,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Year => Focus::Month,
            Focus::Month => Focus::Components,
            Focus::Components => Focus::Year,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Year => Focus::Components,
            Focus::Month => Focus::Year,
            Focus::Components => Focus::Month,
        }
    }
}

struct App {
    source: String,
    dataset: Option<Dataset>,
    /// Set when loading failed; the chart shows only this.
    load_error: Option<String>,
    selection: Selection,
    focus: Focus,
    cursor: usize,
    /// Where the chart widget was last drawn.
    chart_rect: Rect,
    state: Option<ChartState>,
    scene: Option<Scene>,
    hover: Option<HoverInfo>,
    status: String,
}

impl App {
    fn from_load(source: String, loaded: Result<Dataset, AppError>) -> Self {
        let (dataset, load_error, selection, status) = match loaded {
            Ok(dataset) => {
                let selection = Selection::default_for(&dataset.components, dataset.min_date);
                let status = format!("Loaded {} rows from {source}", dataset.rows.len());
                (Some(dataset), None, selection, status)
            }
            Err(err) => {
                warn!(%source, error = %err, "failed to load CPI data");
                let selection = Selection {
                    year: 0,
                    month: 1,
                    components: Vec::new(),
                };
                (None, Some(err.message().to_string()), selection, "Load failed.".to_string())
            }
        };

        let mut app = Self {
            source,
            dataset,
            load_error,
            selection,
            focus: Focus::Components,
            cursor: 0,
            chart_rect: Rect::default(),
            state: None,
            scene: None,
            hover: None,
            status,
        };
        app.rederive();
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Mouse(mouse) => {
                    if matches!(mouse.kind, MouseEventKind::Moved | MouseEventKind::Drag(_)) {
                        let before = self.hover.clone();
                        self.hover_at(mouse.column, mouse.row);
                        needs_redraw = self.hover != before;
                    }
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Left => self.adjust(-1),
            KeyCode::Right => self.adjust(1),
            KeyCode::Up => match self.focus {
                Focus::Components => self.cursor = self.cursor.saturating_sub(1),
                _ => self.adjust(1),
            },
            KeyCode::Down => match self.focus {
                Focus::Components => {
                    let n = self.dataset.as_ref().map(|d| d.components.len()).unwrap_or(0);
                    if self.cursor + 1 < n {
                        self.cursor += 1;
                    }
                }
                _ => self.adjust(-1),
            },
            KeyCode::Char(' ') | KeyCode::Enter if self.focus == Focus::Components => {
                self.toggle_at_cursor();
            }
            KeyCode::Char('r') => self.reset(),
            KeyCode::Char('e') => self.export_svg(),
            _ => {}
        }
        false
    }

    /// Step the focused year/month selector, staying inside the data's range.
    fn adjust(&mut self, delta: i32) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        match self.focus {
            Focus::Year => {
                let (lo, hi) = dataset.year_range();
                self.selection.year = (self.selection.year + delta).clamp(lo, hi);
            }
            Focus::Month => {
                self.selection.month = (self.selection.month as i32 + delta).clamp(1, 12) as u32;
            }
            Focus::Components => return,
        }

        let clamped = self.selection.effective_from(dataset.min_date, dataset.max_date);
        self.selection.year = clamped.year();
        self.selection.month = clamped.month();
        self.status = format!("From {}", clamped.format("%b %Y"));
        self.rederive();
    }

    fn toggle_at_cursor(&mut self) {
        let Some(name) = self
            .dataset
            .as_ref()
            .and_then(|d| d.components.get(self.cursor))
            .cloned()
        else {
            return;
        };
        self.selection.toggle(&name);
        let verb = if self.selection.is_selected(&name) { "Added" } else { "Removed" };
        self.status = format!("{verb} {name}");
        self.rederive();
    }

    /// Back to the default start month and component set.
    fn reset(&mut self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        self.selection = Selection::default_for(&dataset.components, dataset.min_date);
        self.status = "Selection reset.".to_string();
        self.rederive();
    }

    /// Write the current selection as a full-size SVG.
    fn export_svg(&mut self) {
        let Some(dataset) = &self.dataset else {
            self.status = "Nothing to export.".to_string();
            return;
        };
        let state = derive_state(&self.selection, dataset, &ChartLayout::default());
        let path = PathBuf::from(EXPORT_PATH);
        self.status = match write_svg(&path, &build_scene(&state)) {
            Ok(()) => format!("Wrote {}", path.display()),
            Err(err) => format!("Export failed: {err}"),
        };
    }

    /// Recompute state and scene from scratch for the current selection and chart size.
    fn rederive(&mut self) {
        self.hover = None;
        let Some(dataset) = &self.dataset else {
            self.state = None;
            self.scene = None;
            return;
        };
        let state = derive_state(&self.selection, dataset, &layout_for(self.chart_rect));
        self.scene = Some(build_scene(&state));
        self.state = Some(state);
    }

    fn hover_at(&mut self, column: u16, row: u16) {
        self.hover = pointer_in_scene(self.chart_rect, column, row).and_then(|p| {
            self.scene
                .as_ref()
                .and_then(|scene| hit_test(p, scene.markers(), HOVER_TOLERANCE))
        });
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(44)])
            .split(rows[1]);

        let chart_block = Block::default().borders(Borders::ALL);
        let inner = chart_block.inner(body[0]);
        let (chart_rect, insets) = chart_layout(inner);
        if chart_rect != self.chart_rect {
            self.chart_rect = chart_rect;
            self.rederive();
        }

        self.draw_header(frame, rows[0]);
        self.draw_chart(frame, body[0], inner, insets);
        self.draw_controls(frame, body[1]);
        self.draw_footer(frame, rows[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("cpi", Style::default().fg(Color::Cyan)),
            Span::raw(format!("  UK CPI by component | source: {}", self.source)),
        ]));

        if let Some(dataset) = &self.dataset {
            let headline = self
                .state
                .as_ref()
                .and_then(|s| s.headline.as_ref())
                .map(|h| format_change(h.latest))
                .unwrap_or_else(|| "-".to_string());
            lines.push(Line::from(Span::styled(
                format!(
                    "data: {} .. {} | {} components | all items since {}: {headline}",
                    dataset.min_date.format("%b %Y"),
                    dataset.max_date.format("%b %Y"),
                    dataset.components.len(),
                    self.selection.requested_from().format("%b %Y"),
                ),
                Style::default().fg(Color::Gray),
            )));
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect, inner: Rect, insets: Option<AxisInsets>) {
        let title = self
            .state
            .as_ref()
            .map(|s| format!("Change since {}", s.from.format("%b %Y")))
            .unwrap_or_else(|| "Chart".to_string());
        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        if let Some(message) = &self.load_error {
            let msg = Paragraph::new(format!("Failed to load data: {message}"))
                .style(Style::default().fg(Color::Red));
            frame.render_widget(msg, inner);
            return;
        }

        let Some(state) = &self.state else {
            frame.render_widget(Paragraph::new("Waiting for data...").style(Style::default().fg(Color::Yellow)), inner);
            return;
        };
        if state.selection_is_empty() || !state.has_points() {
            let message = if state.selection_is_empty() {
                EMPTY_SELECTION_MESSAGE
            } else {
                NO_DATA_MESSAGE
            };
            frame.render_widget(Paragraph::new(message).style(Style::default().fg(Color::Yellow)), inner);
            return;
        }

        let lines = chart_lines(state);
        let widget = CpiPlottersChart {
            lines: &lines,
            headline: state.headline.as_ref().map(|h| h.latest),
            hovered: self.hover.as_ref().map(|h| (day_number(h.date), h.change)),
            x_bounds: x_bounds(state),
            y_bounds: y_bounds(state),
        };
        frame.render_widget(widget, self.chart_rect);

        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, self.chart_rect, insets, state);
        }
    }

    fn draw_controls(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(area);

        let field = |focus: Focus, label: String| {
            let style = if self.focus == focus {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default()
            };
            ListItem::new(label).style(style)
        };
        let month_name = NaiveDate::from_ymd_opt(2000, self.selection.month.clamp(1, 12), 1)
            .map(|d| d.format("%B").to_string())
            .unwrap_or_default();
        let selectors = List::new(vec![
            field(Focus::Year, format!("Year:  {}", self.selection.year)),
            field(Focus::Month, format!("Month: {month_name}")),
        ])
        .block(Block::default().title("From").borders(Borders::ALL));
        frame.render_widget(selectors, chunks[0]);

        let components = self
            .dataset
            .as_ref()
            .map(|d| d.components.as_slice())
            .unwrap_or_default();
        let items: Vec<ListItem> = components
            .iter()
            .map(|name| {
                let checked = if self.selection.is_selected(name) { "[x]" } else { "[ ]" };
                let color = self
                    .state
                    .as_ref()
                    .and_then(|s| s.series.get(name))
                    .map(|s| terminal_color(s.color_or_default()))
                    .unwrap_or(Color::DarkGray);
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{checked} ")),
                    Span::styled("■ ", Style::default().fg(color)),
                    Span::raw(name.as_str()),
                ]))
            })
            .collect();

        let title = format!("Components ({} selected)", self.selection.components.len());
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(if self.focus == Focus::Components {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            })
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if !components.is_empty() {
            state.select(Some(self.cursor.min(components.len() - 1)));
        }
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab focus  ←/→ ↑/↓ adjust  space toggle  r reset  e export svg  q quit";
        let status = match &self.hover {
            Some(hover) => Span::styled(
                hover.label(),
                Style::default().fg(terminal_color(hover.color)).add_modifier(Modifier::BOLD),
            ),
            None => Span::styled(self.status.as_str(), Style::default().fg(Color::Yellow)),
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            status,
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Scene layout matching a chart rectangle cell for cell, with no margins so
/// the widget's plotting area and the scene coincide.
fn layout_for(chart: Rect) -> ChartLayout {
    ChartLayout {
        width: chart.width as f64 * CELL_W,
        height: chart.height as f64 * CELL_H,
        margins: Margins {
            top: 0.0,
            right: 0.0,
            bottom: 0.0,
            left: 0.0,
        },
        marker_radius: CELL_W / 2.0,
        tick_count: 5,
    }
}

/// Centre of the cell under the mouse, in scene coordinates.
fn pointer_in_scene(chart: Rect, column: u16, row: u16) -> Option<Point> {
    let inside = column >= chart.x
        && column < chart.x + chart.width
        && row >= chart.y
        && row < chart.y + chart.height;
    inside.then(|| {
        Point::new(
            (column - chart.x) as f64 * CELL_W + CELL_W / 2.0,
            (row - chart.y) as f64 * CELL_H + CELL_H / 2.0,
        )
    })
}

fn chart_lines(state: &ChartState) -> Vec<ChartLine> {
    state
        .displayed()
        .map(|s| ChartLine {
            color: s.color_or_default(),
            points: s.points.iter().map(|p| (day_number(p.date), p.change)).collect(),
        })
        .collect()
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// Degenerate domains are padded symmetrically, which keeps points in the
/// middle just like the scene's scales do.
fn x_bounds(state: &ChartState) -> [f64; 2] {
    let (a, b) = state.time_domain;
    let (a, b) = (day_number(a), day_number(b));
    if b > a { [a, b] } else { [a - 15.0, a + 15.0] }
}

fn y_bounds(state: &ChartState) -> [f64; 2] {
    let (a, b) = state.value_domain;
    if b > a { [a, b] } else { [a - 0.01, a + 0.01] }
}

fn terminal_color(c: Rgb) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 7,
        right: 2,
        top: 1,
        bottom: 1,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

/// Tick labels from the derived state, placed on the cells their values map to.
fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    state: &ChartState,
) {
    let style = Style::default().fg(Color::Gray);

    let label_row = chart.y + chart.height;
    if label_row < inner.y + inner.height {
        for &tick in &state.x_ticks {
            let col = chart.x + cell_offset(state.x.map(tick), CELL_W, chart.width);
            let label = state.tick_format.format(tick);
            let width = label.chars().count() as u16;
            let start = col
                .saturating_sub(width / 2)
                .clamp(inner.x, (inner.x + inner.width).saturating_sub(width));
            frame.render_widget(
                Paragraph::new(label).style(style),
                Rect {
                    x: start,
                    y: label_row,
                    width,
                    height: 1,
                },
            );
        }
    }

    for &tick in &state.y_ticks {
        let row = chart.y + cell_offset(state.y.map(tick), CELL_H, chart.height);
        let label = format_change(tick);
        let width = (label.chars().count() as u16).min(insets.left.saturating_sub(1));
        let x = (inner.x + insets.left.saturating_sub(1)).saturating_sub(width);
        if x < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x,
                y: row,
                width,
                height: 1,
            },
        );
    }
}

/// Cell index for a scene coordinate, clamped into `[0, cells)`.
fn cell_offset(px: f64, cell: f64, cells: u16) -> u16 {
    let idx = (px / cell).floor();
    idx.clamp(0.0, cells.saturating_sub(1) as f64) as u16
}
