use crate::aggregate::select_commune;
use crate::dataset::Dataset;
use crate::presenter::{
    ChartSpec, DashboardView, Direction as Trend, MetricView, NO_DATA_MESSAGE, PAGE_TITLE,
    SELECT_PROMPT, X_AXIS_LABEL, Y_AXIS_LABEL,
};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Chart, Dataset as ChartDataset, GraphType, List, ListItem,
        ListState, Paragraph, Wrap,
    },
    Frame, Terminal,
};
use std::io;
use tracing::debug;

const PAGE_JUMP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

pub struct App<'a> {
    pub dataset: &'a Dataset,
    /// Indices into `dataset.communes()` that match the search filter
    pub visible: Vec<usize>,
    pub state: ListState,
    pub search: String,
    pub input_mode: InputMode,
    /// View for the highlighted commune; `None` when the filter matches nothing
    pub view: Option<DashboardView>,
    current: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        let mut app = Self {
            dataset,
            visible: (0..dataset.communes().len()).collect(),
            state: ListState::default(),
            search: String::new(),
            input_mode: InputMode::Normal,
            view: None,
            current: None,
        };
        if !app.visible.is_empty() {
            app.state.select(Some(0));
        }
        app.on_select();
        app
    }

    pub fn selected_commune(&self) -> Option<&'a str> {
        let dataset: &'a Dataset = self.dataset;
        self.state
            .selected()
            .and_then(|i| self.visible.get(i))
            .map(|&idx| dataset.communes()[idx].as_str())
    }

    /// Selection handler: recompute the view whenever the highlighted commune changes.
    pub fn on_select(&mut self) {
        let selected = self.selected_commune();
        if selected == self.current.as_deref() && (self.view.is_some() || selected.is_none()) {
            return;
        }

        self.view = selected.map(|commune| {
            debug!(commune, "selection changed");
            DashboardView::from_selection(&select_commune(self.dataset, commune))
        });
        self.current = selected.map(str::to_string);
    }

    fn select(&mut self, index: Option<usize>) {
        self.state.select(index);
        self.on_select();
    }

    pub fn next(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + PAGE_JUMP).min(len - 1),
            None => 0,
        };
        self.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = self.state.selected().map(|i| i.saturating_sub(PAGE_JUMP)).unwrap_or(0);
        self.select(Some(i));
    }

    pub fn first(&mut self) {
        if !self.visible.is_empty() {
            self.select(Some(0));
        }
    }

    pub fn last(&mut self) {
        if !self.visible.is_empty() {
            self.select(Some(self.visible.len() - 1));
        }
    }

    /// Re-filter the commune list (case-insensitive substring) and highlight the first match.
    pub fn apply_search(&mut self) {
        let needle = self.search.to_lowercase();
        self.visible = self
            .dataset
            .communes()
            .iter()
            .enumerate()
            .filter(|(_, name)| needle.is_empty() || name.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();

        let first = if self.visible.is_empty() { None } else { Some(0) };
        self.select(first);
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
        self.apply_search();
    }

    /// Apply one key press. Returns `false` when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.input_mode {
            InputMode::Search => match key.code {
                KeyCode::Enter | KeyCode::Esc => self.input_mode = InputMode::Normal,
                KeyCode::Backspace => {
                    self.search.pop();
                    self.apply_search();
                }
                KeyCode::Char(c) => {
                    self.search.push(c);
                    self.apply_search();
                }
                KeyCode::Down => self.next(),
                KeyCode::Up => self.previous(),
                _ => {}
            },
            InputMode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return false,
                KeyCode::Char('/') => self.input_mode = InputMode::Search,
                KeyCode::Char('c') => self.clear_search(),
                KeyCode::Down | KeyCode::Char('j') => self.next(),
                KeyCode::Up | KeyCode::Char('k') => self.previous(),
                KeyCode::PageDown => self.page_down(),
                KeyCode::PageUp => self.page_up(),
                KeyCode::Home => self.first(),
                KeyCode::End => self.last(),
                _ => {}
            },
        }
        true
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            // Windows reports both press and release
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title and dataset info
            Constraint::Min(0),    // Commune list + dashboard
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(0)])
        .split(chunks[1]);

    render_commune_list(f, content[0], app);
    render_dashboard(f, content[1], app);

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let dataset = app.dataset;

    let spans = vec![
        Span::styled(
            PAGE_TITLE,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{} ventes", dataset.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} communes", dataset.communes().len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("chargé {}", dataset.loaded_at().format("%Y-%m-%d %H:%M UTC")),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_commune_list(f: &mut Frame, area: Rect, app: &mut App) {
    let communes = app.dataset.communes();
    let items: Vec<ListItem> = app
        .visible
        .iter()
        .map(|&idx| ListItem::new(truncate(&communes[idx], 28)))
        .collect();

    let title = match (app.input_mode, app.search.is_empty()) {
        (InputMode::Search, _) => format!(" /{}_ ", app.search),
        (InputMode::Normal, false) => format!(" /{} ", app.search),
        (InputMode::Normal, true) => format!(" {} ", SELECT_PROMPT),
    };

    let border = if app.input_mode == InputMode::Search {
        Color::Yellow
    } else {
        Color::White
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(list, area, &mut app.state);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let view = match &app.view {
        Some(view) => view,
        None => {
            let empty = Paragraph::new("Aucune commune ne correspond à la recherche.")
                .block(block)
                .alignment(Alignment::Center);
            f.render_widget(empty, area);
            return;
        }
    };

    let (heading, panels) = match view {
        DashboardView::NoData { message, .. } => {
            let fallback = Paragraph::new(message.as_str())
                .block(block)
                .wrap(Wrap { trim: true });
            f.render_widget(fallback, area);
            return;
        }
        DashboardView::Report {
            heading, panels, ..
        } => (heading, panels),
    };

    let block = block.title(format!(" {} ", heading));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Metrics
            Constraint::Min(8),    // Charts
        ])
        .split(inner);

    let metric_cols = halves(rows[0]);
    let chart_cols = halves(rows[1]);

    for (i, panel) in panels.iter().take(2).enumerate() {
        render_metric(f, metric_cols[i], &panel.metric);
        render_chart(f, chart_cols[i], &panel.chart);
    }
}

fn halves(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area)
}

fn render_metric(f: &mut Frame, area: Rect, metric: &MetricView) {
    let (arrow, color) = match metric.direction {
        Some(Trend::Up) => ("↑ ", Color::Green),
        Some(Trend::Down) => ("↓ ", Color::Red),
        Some(Trend::Flat) => ("= ", Color::Gray),
        None => ("", Color::DarkGray),
    };

    let content = vec![
        Line::from(Span::styled(
            metric.label.as_str(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            metric.value.as_str(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{}{}", arrow, metric.delta),
            Style::default().fg(color),
        )),
    ];

    let widget = Paragraph::new(content).block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, area);
}

fn render_chart(f: &mut Frame, area: Rect, spec: &ChartSpec) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", spec.title));

    if spec.is_empty() {
        let empty = Paragraph::new(NO_DATA_MESSAGE)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(empty, area);
        return;
    }

    let points: Vec<(f64, f64)> = spec.points.iter().map(|&(x, y)| (x as f64, y)).collect();
    let (x_bounds, y_bounds) = chart_bounds(spec);

    let datasets = vec![
        ChartDataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&points),
        ChartDataset::default()
            .marker(Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Yellow))
            .data(&points),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title(X_AXIS_LABEL)
                .style(Style::default().fg(Color::Gray))
                .bounds(x_bounds)
                .labels(x_labels(spec)),
        )
        .y_axis(
            Axis::default()
                .title(Y_AXIS_LABEL)
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format!("{:.0}", y_bounds[0])),
                    Span::raw(format!("{:.0}", (y_bounds[0] + y_bounds[1]) / 2.0)),
                    Span::raw(format!("{:.0}", y_bounds[1])),
                ]),
        );

    f.render_widget(chart, area);
}

/// Axis bounds for a non-empty chart. A single year or a flat zero series
/// would give a zero-width range, so those get widened.
fn chart_bounds(spec: &ChartSpec) -> ([f64; 2], [f64; 2]) {
    let first = spec.x_ticks.first().copied().unwrap_or(0) as f64;
    let last = spec.x_ticks.last().copied().unwrap_or(0) as f64;
    let x = if last > first {
        [first, last]
    } else {
        [first - 1.0, last + 1.0]
    };

    let (lo, hi) = spec.y_range.unwrap_or((0.0, 1.0));
    let y = if hi > lo { [lo, hi] } else { [lo, lo + 1.0] };

    (x, y)
}

/// One label per year; ratatui spaces labels evenly, which matches a step of one year.
fn x_labels(spec: &ChartSpec) -> Vec<Span<'static>> {
    match spec.x_ticks.as_slice() {
        [only] => vec![Span::raw(""), Span::raw(only.to_string()), Span::raw("")],
        ticks => ticks.iter().map(|y| Span::raw(y.to_string())).collect(),
    }
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.visible.len();

    let mut status_spans = vec![Span::styled(
        format!(" Commune: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if !app.search.is_empty() {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Filtre: {}", app.search),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" effacer)"));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("/", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Rechercher | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Rapide | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quitter"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Transaction;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            Transaction::new("Paris", "Appartement", 2020, 9000.0),
            Transaction::new("Paris", "Appartement", 2021, 9500.0),
            Transaction::new("Lyon", "Maison", 2021, 4000.0),
            Transaction::new("Saint-Étienne", "Maison", 2022, 1800.0),
            Transaction::new("Saint-Malo", "Appartement", 2022, 5200.0),
        ])
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn heading(app: &App) -> Option<String> {
        match &app.view {
            Some(DashboardView::Report { heading, .. }) => Some(heading.clone()),
            _ => None,
        }
    }

    #[test]
    fn test_new_app_selects_first_commune() {
        let data = dataset();
        let app = App::new(&data);

        assert_eq!(app.selected_commune(), Some("Paris"));
        assert_eq!(heading(&app).unwrap(), "Évolution du prix au m² pour : Paris");
    }

    #[test]
    fn test_navigation_recomputes_view() {
        let data = dataset();
        let mut app = App::new(&data);

        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.selected_commune(), Some("Lyon"));
        assert_eq!(app.view.as_ref().unwrap().commune(), "Lyon");

        app.handle_key(key(KeyCode::Up));
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.selected_commune(), Some("Saint-Malo"));
    }

    #[test]
    fn test_page_and_bounds_keys() {
        let data = dataset();
        let mut app = App::new(&data);

        app.handle_key(key(KeyCode::PageDown));
        assert_eq!(app.state.selected(), Some(3));
        app.handle_key(key(KeyCode::PageUp));
        assert_eq!(app.state.selected(), Some(0));
        app.handle_key(key(KeyCode::End));
        assert_eq!(app.selected_commune(), Some("Saint-Malo"));
        app.handle_key(key(KeyCode::Home));
        assert_eq!(app.selected_commune(), Some("Paris"));
    }

    #[test]
    fn test_search_filters_case_insensitively() {
        let data = dataset();
        let mut app = App::new(&data);

        app.handle_key(key(KeyCode::Char('/')));
        for c in "saint".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }

        assert_eq!(app.visible.len(), 2);
        assert_eq!(app.selected_commune(), Some("Saint-Étienne"));

        // 'q' is text while searching, not quit
        assert!(app.handle_key(key(KeyCode::Char('q'))));
        assert!(app.visible.is_empty());
        assert!(app.view.is_none());

        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.visible.len(), 2);

        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(app.visible.len(), 4);
        assert_eq!(app.selected_commune(), Some("Paris"));
    }

    #[test]
    fn test_quit_keys() {
        let data = dataset();
        let mut app = App::new(&data);

        assert!(!app.handle_key(key(KeyCode::Char('q'))));
        assert!(!app.handle_key(key(KeyCode::Esc)));
    }

    #[test]
    fn test_empty_dataset() {
        let data = Dataset::from_records(Vec::new());
        let mut app = App::new(&data);

        assert_eq!(app.selected_commune(), None);
        assert!(app.view.is_none());
        app.next();
        app.page_down();
        app.last();
        assert_eq!(app.state.selected(), None);
    }

    #[test]
    fn test_chart_bounds_single_year() {
        let spec = ChartSpec {
            title: "Maisons - Prix au m²".to_string(),
            x_label: X_AXIS_LABEL,
            y_label: Y_AXIS_LABEL,
            points: vec![(2022, 1800.0)],
            x_ticks: vec![2022],
            y_range: Some((1710.0, 1890.0)),
        };

        let (x, y) = chart_bounds(&spec);

        assert_eq!(x, [2021.0, 2023.0]);
        assert_eq!(y, [1710.0, 1890.0]);
        assert_eq!(x_labels(&spec).len(), 3);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Saint-Étienne", 40), "Saint-Étienne");
        assert_eq!(truncate("Évry-Courcouronnes", 8), "Évry-...");
    }

    #[test]
    fn test_renders_report_and_fallback() {
        let data = dataset();
        let mut app = App::new(&data);
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();

        terminal.draw(|f| ui(f, &mut app)).unwrap();
        let screen = buffer_text(terminal.backend().buffer());
        assert!(screen.contains("9,500€/m²"));
        assert!(screen.contains("5.56% depuis 12 mois"));

        app.view = Some(DashboardView::from_selection(&select_commune(&data, "Nulle-Part")));
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        let screen = buffer_text(terminal.backend().buffer());
        assert!(screen.contains(NO_DATA_MESSAGE));
        assert!(!screen.contains("9,500€/m²"));
    }

    fn buffer_text(buffer: &ratatui::buffer::Buffer) -> String {
        let area = buffer.area;
        let mut text = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }
}
