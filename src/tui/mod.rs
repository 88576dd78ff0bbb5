use std::future::Future;
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap,
};
use time::OffsetDateTime;
use tokio::runtime::Handle;

use crate::api::{ApiClient, ApiError};
use crate::core::timestamp::{format_day, format_display, parse_day};
use crate::core::{DomainDetail, HealthStatus, NewReport, Report, RiskLevel, StatusUpdate};
use crate::logs::{Mutation, Outcome};
use crate::views::{
    CollectionState, DomainDetailView, FormPhase, LookupState, RELOAD_DELAY, ReportCollection,
    ReportForm, SaveState, SortKey,
};

/// Slack added to the client timeout before a background request is given up on.
const PENDING_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct Options {
    pub color: bool,
    pub default_initials: String,
    pub home_dir: PathBuf,
}

pub fn run(handle: Handle, client: ApiClient, opts: Options) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;

    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout)).context("initialize terminal")?;
    terminal.clear().ok();

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        run_app(&mut terminal, handle, client, opts)
    }));

    let _ = terminal.show_cursor();
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);

    match res {
        Ok(res) => res,
        Err(_) => Err(anyhow::anyhow!(
            "the dashboard panicked (terminal state has been restored)"
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Reports = 0,
    NewReport = 1,
    Detail = 2,
}

impl Tab {
    const TITLES: [&'static str; 3] = ["Reports", "New Report", "Domain Detail"];

    fn next(self) -> Self {
        match self {
            Tab::Reports => Tab::NewReport,
            Tab::NewReport => Tab::Detail,
            Tab::Detail => Tab::Reports,
        }
    }

    fn prev(self) -> Self {
        match self {
            Tab::Reports => Tab::Detail,
            Tab::NewReport => Tab::Reports,
            Tab::Detail => Tab::NewReport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterInput {
    Domain,
    From,
    To,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Domain,
    Source,
    AbuseType,
    Confidence,
    Timestamp,
}

impl FormField {
    const ALL: [FormField; 5] = [
        FormField::Domain,
        FormField::Source,
        FormField::AbuseType,
        FormField::Confidence,
        FormField::Timestamp,
    ];

    fn label(self) -> &'static str {
        match self {
            FormField::Domain => "Domain",
            FormField::Source => "Reporter source",
            FormField::AbuseType => "Abuse type",
            FormField::Confidence => "Confidence (0-100)",
            FormField::Timestamp => "Timestamp (UTC)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailField {
    Query,
    Status,
    Initials,
    Notes,
}

impl DetailField {
    const ALL: [DetailField; 4] = [
        DetailField::Query,
        DetailField::Status,
        DetailField::Initials,
        DetailField::Notes,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Health {
    Unknown,
    Ok,
    Down(String),
}

/// A request running on the async runtime, polled from the draw loop.
struct Pending<T> {
    rx: mpsc::Receiver<T>,
    started_at: Instant,
}

fn spawn<T, F>(handle: &Handle, fut: F) -> Pending<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    handle.spawn(async move {
        let _ = tx.send(fut.await);
    });
    Pending {
        rx,
        started_at: Instant::now(),
    }
}

/// Takes the result out of `slot` once available. Waiting longer than `limit`, or a
/// dropped sender, yields `ApiError::Abandoned`.
fn take_ready<T>(
    slot: &mut Option<Pending<Result<T, ApiError>>>,
    limit: Duration,
) -> Option<Result<T, ApiError>> {
    let pending = slot.take()?;
    match pending.rx.try_recv() {
        Ok(res) => Some(res),
        Err(mpsc::TryRecvError::Empty) => {
            if pending.started_at.elapsed() > limit {
                Some(Err(ApiError::Abandoned("timed out waiting for the API")))
            } else {
                *slot = Some(pending);
                None
            }
        }
        Err(mpsc::TryRecvError::Disconnected) => {
            Some(Err(ApiError::Abandoned("background request was lost")))
        }
    }
}

struct App {
    color: bool,
    home_dir: PathBuf,
    handle: Handle,
    client: ApiClient,

    tab: Tab,
    show_help: bool,
    health: Health,

    collection: ReportCollection,
    reports_state: TableState,
    filter_input: Option<FilterInput>,
    filter_buf: String,
    filter_error: Option<String>,

    form: ReportForm,
    form_field: usize,
    reload_at: Option<Instant>,

    detail: DomainDetailView,
    detail_field: usize,

    pending_health: Option<Pending<Result<HealthStatus, ApiError>>>,
    pending_reports: Option<Pending<Result<Vec<Report>, ApiError>>>,
    pending_create: Option<Pending<Result<Report, ApiError>>>,
    create_audit: Option<(NewReport, OffsetDateTime)>,
    pending_lookup: Option<Pending<Result<DomainDetail, ApiError>>>,
    pending_save: Option<Pending<Result<(), ApiError>>>,
    save_audit: Option<(String, StatusUpdate, OffsetDateTime)>,

    tick: u64,
}

impl App {
    fn new(handle: Handle, client: ApiClient, opts: Options) -> Self {
        Self {
            color: opts.color,
            home_dir: opts.home_dir,
            handle,
            client,
            tab: Tab::Reports,
            show_help: false,
            health: Health::Unknown,
            collection: ReportCollection::new(),
            reports_state: TableState::default(),
            filter_input: None,
            filter_buf: String::new(),
            filter_error: None,
            form: ReportForm::new(OffsetDateTime::now_utc()),
            form_field: 0,
            reload_at: None,
            detail: DomainDetailView::new(opts.default_initials),
            detail_field: 0,
            pending_health: None,
            pending_reports: None,
            pending_create: None,
            create_audit: None,
            pending_lookup: None,
            pending_save: None,
            save_audit: None,
            tick: 0,
        }
    }

    fn is_typing(&self) -> bool {
        match self.tab {
            Tab::Reports => self.filter_input.is_some(),
            Tab::NewReport => true,
            Tab::Detail => true,
        }
    }

    fn start_health(&mut self) {
        let client = self.client.clone();
        self.pending_health = Some(spawn(&self.handle, async move { client.health().await }));
    }

    /// A newer load replaces the one in flight.
    fn start_load_reports(&mut self) {
        self.collection.begin_load();
        let client = self.client.clone();
        self.pending_reports = Some(spawn(&self.handle, async move {
            client.list_reports().await
        }));
    }

    fn start_lookup(&mut self) {
        if let Some(domain) = self.detail.begin_lookup() {
            self.spawn_lookup(domain);
        }
    }

    /// Last submission wins: the receiver of an older lookup is dropped with it.
    fn spawn_lookup(&mut self, domain: String) {
        let client = self.client.clone();
        self.pending_lookup = Some(spawn(&self.handle, async move {
            client.get_domain_detail(&domain).await
        }));
    }

    fn start_create(&mut self) {
        let Some(payload) = self.form.begin_submit() else {
            return;
        };
        self.create_audit = Some((payload.clone(), OffsetDateTime::now_utc()));
        let client = self.client.clone();
        self.pending_create = Some(spawn(&self.handle, async move {
            client.create_report(&payload).await
        }));
    }

    fn start_save(&mut self) {
        let Some((domain, payload)) = self.detail.begin_save() else {
            return;
        };
        self.save_audit = Some((domain.clone(), payload.clone(), OffsetDateTime::now_utc()));
        let client = self.client.clone();
        self.pending_save = Some(spawn(&self.handle, async move {
            client.update_domain_status(&domain, &payload).await
        }));
    }

    /// Everything the dashboard shows is fetched again; the form starts blank.
    fn reload_all(&mut self) {
        tracing::debug!("reloading dashboard");
        self.reload_at = None;
        self.start_health();
        self.start_load_reports();
        self.form = ReportForm::new(OffsetDateTime::now_utc());
        self.form_field = 0;
        if let Some(domain) = self.detail.lookup.detail().map(|d| d.domain.domain_name.clone()) {
            let domain = self.detail.lookup.begin_refresh(&domain);
            self.spawn_lookup(domain);
        }
    }

    fn poll(&mut self) {
        let limit = self.client.timeout() + PENDING_GRACE;

        if let Some(res) = take_ready(&mut self.pending_health, limit) {
            self.health = match res {
                Ok(h) if h.is_ok() => Health::Ok,
                Ok(h) => Health::Down(h.status),
                Err(err) => Health::Down(err.to_string()),
            };
        }

        if let Some(res) = take_ready(&mut self.pending_reports, limit) {
            self.collection.finish_load(res);
            self.clamp_report_selection();
        }

        if let Some(res) = take_ready(&mut self.pending_create, limit) {
            if let Some((payload, started_at)) = self.create_audit.take() {
                let outcome = match &res {
                    Ok(r) => Outcome::Ok {
                        report_id: Some(r.report_id),
                    },
                    Err(e) => Outcome::Error(e.to_string()),
                };
                crate::logs::record_mutation(
                    &self.home_dir,
                    self.client.base_url(),
                    started_at,
                    Mutation::CreateReport(&payload),
                    &outcome,
                );
            }
            let created = res.is_ok();
            self.form.finish_submit(res);
            if created {
                self.reload_at = Some(Instant::now() + RELOAD_DELAY);
            }
        }

        if let Some(res) = take_ready(&mut self.pending_lookup, limit) {
            self.detail.finish_lookup(res);
        }

        if let Some(res) = take_ready(&mut self.pending_save, limit) {
            if let Some((domain, payload, started_at)) = self.save_audit.take() {
                let outcome = match &res {
                    Ok(()) => Outcome::Ok { report_id: None },
                    Err(e) => Outcome::Error(e.to_string()),
                };
                crate::logs::record_mutation(
                    &self.home_dir,
                    self.client.base_url(),
                    started_at,
                    Mutation::UpdateStatus {
                        domain: &domain,
                        update: &payload,
                    },
                    &outcome,
                );
            }
            if let Some(domain) = self.detail.finish_save(res) {
                self.spawn_lookup(domain);
            }
        }

        if self.reload_at.is_some_and(|at| Instant::now() >= at) {
            self.reload_all();
        }
    }

    fn clamp_report_selection(&mut self) {
        let len = self.collection.visible().len();
        let sel = match (len, self.reports_state.selected()) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(i)) => Some(i.min(len - 1)),
        };
        self.reports_state.select(sel);
    }

    fn move_report_selection(&mut self, delta: isize) {
        let len = self.collection.visible().len();
        if len == 0 {
            self.reports_state.select(None);
            return;
        }
        let cur = self.reports_state.selected().unwrap_or(0) as isize;
        let next = (cur + delta).clamp(0, len as isize - 1) as usize;
        self.reports_state.select(Some(next));
    }

    fn selected_report_domain(&self) -> Option<String> {
        let idx = self.reports_state.selected()?;
        self.collection
            .visible()
            .get(idx)
            .map(|r| r.domain_name.clone())
    }
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    handle: Handle,
    client: ApiClient,
    opts: Options,
) -> Result<()> {
    let mut app = App::new(handle, client, opts);
    app.start_health();
    app.start_load_reports();

    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        app.poll();
        terminal.draw(|f| draw(f, &mut app)).context("draw frame")?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("poll terminal events")? {
            if let Event::Key(key) = event::read().context("read terminal event")? {
                if key.kind == KeyEventKind::Press && handle_key(&mut app, key) {
                    break;
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick = app.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    }

    Ok(())
}

/// Returns `true` when the dashboard should exit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    if app.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return false;
    }

    match key.code {
        KeyCode::Tab => {
            app.filter_input = None;
            app.tab = app.tab.next();
            return false;
        }
        KeyCode::BackTab => {
            app.filter_input = None;
            app.tab = app.tab.prev();
            return false;
        }
        KeyCode::F(5) => {
            app.reload_all();
            return false;
        }
        _ => {}
    }

    if !app.is_typing() {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('?') => {
                app.show_help = true;
                return false;
            }
            _ => {}
        }
    }

    match app.tab {
        Tab::Reports => handle_reports_key(app, key),
        Tab::NewReport => handle_form_key(app, key),
        Tab::Detail => handle_detail_key(app, key),
    }
    false
}

fn handle_reports_key(app: &mut App, key: KeyEvent) {
    if let Some(input) = app.filter_input {
        handle_filter_input(app, input, key);
        return;
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.move_report_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_report_selection(1),
        KeyCode::PageUp => app.move_report_selection(-10),
        KeyCode::PageDown => app.move_report_selection(10),
        KeyCode::Char('/') => {
            app.filter_buf = app.collection.filters.domain.clone();
            app.filter_input = Some(FilterInput::Domain);
        }
        KeyCode::Char('f') => {
            app.filter_buf = app.collection.filters.from.map(format_day).unwrap_or_default();
            app.filter_input = Some(FilterInput::From);
        }
        KeyCode::Char('t') => {
            app.filter_buf = app.collection.filters.to.map(format_day).unwrap_or_default();
            app.filter_input = Some(FilterInput::To);
        }
        KeyCode::Char('s') => {
            app.collection.filters.risk = app.collection.filters.risk.next();
            app.clamp_report_selection();
        }
        KeyCode::Char('c') => {
            app.collection.clear_filters();
            app.filter_error = None;
            app.clamp_report_selection();
        }
        KeyCode::Char('r') => app.start_load_reports(),
        KeyCode::Char(c @ '1'..='4') => {
            let idx = (c as usize) - ('1' as usize);
            app.collection.toggle_sort(SortKey::ALL[idx]);
        }
        KeyCode::Enter => {
            if let Some(domain) = app.selected_report_domain() {
                app.detail.lookup.query = domain;
                app.detail_field = 0;
                app.start_lookup();
                app.tab = Tab::Detail;
            }
        }
        _ => {}
    }
}

fn handle_filter_input(app: &mut App, input: FilterInput, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.filter_input = None;
            app.filter_error = None;
        }
        KeyCode::Enter => {
            if input == FilterInput::Domain {
                app.filter_input = None;
                return;
            }
            let value = app.filter_buf.trim();
            let parsed = if value.is_empty() {
                Ok(None)
            } else {
                parse_day(value).map(Some)
            };
            match parsed {
                Ok(day) => {
                    match input {
                        FilterInput::From => app.collection.filters.from = day,
                        FilterInput::To => app.collection.filters.to = day,
                        FilterInput::Domain => {}
                    }
                    app.filter_error = None;
                    app.filter_input = None;
                    app.clamp_report_selection();
                }
                Err(_) => app.filter_error = Some("Use YYYY-MM-DD.".to_string()),
            }
        }
        _ => {
            if edit_text(&mut app.filter_buf, key) && input == FilterInput::Domain {
                app.collection.filters.domain = app.filter_buf.clone();
                app.clamp_report_selection();
            }
        }
    }
}

fn handle_form_key(app: &mut App, key: KeyEvent) {
    let field = FormField::ALL[app.form_field];
    match key.code {
        KeyCode::Up => app.form_field = app.form_field.saturating_sub(1),
        KeyCode::Down => app.form_field = (app.form_field + 1).min(FormField::ALL.len() - 1),
        KeyCode::Enter => app.start_create(),
        KeyCode::Left if field == FormField::AbuseType => {
            app.form.abuse_type = app.form.abuse_type.prev();
        }
        KeyCode::Right | KeyCode::Char(' ') if field == FormField::AbuseType => {
            app.form.abuse_type = app.form.abuse_type.next();
        }
        _ => {
            let buf = match field {
                FormField::Domain => &mut app.form.domain,
                FormField::Source => &mut app.form.source,
                FormField::Confidence => &mut app.form.confidence,
                FormField::Timestamp => &mut app.form.timestamp,
                FormField::AbuseType => return,
            };
            edit_text(buf, key);
        }
    }
}

fn handle_detail_key(app: &mut App, key: KeyEvent) {
    let has_form = app.detail.status.is_some() && app.detail.lookup.detail().is_some();
    let max_field = if has_form { DetailField::ALL.len() - 1 } else { 0 };
    app.detail_field = app.detail_field.min(max_field);
    let field = DetailField::ALL[app.detail_field];

    match key.code {
        KeyCode::Up => app.detail_field = app.detail_field.saturating_sub(1),
        KeyCode::Down => app.detail_field = (app.detail_field + 1).min(max_field),
        KeyCode::Enter => match field {
            DetailField::Query => app.start_lookup(),
            _ => app.start_save(),
        },
        _ => match field {
            DetailField::Query => {
                edit_text(&mut app.detail.lookup.query, key);
            }
            DetailField::Status => {
                if let Some(form) = app.detail.status.as_mut() {
                    match key.code {
                        KeyCode::Left => form.new_status = form.new_status.prev(),
                        KeyCode::Right | KeyCode::Char(' ') => {
                            form.new_status = form.new_status.next();
                        }
                        _ => {}
                    }
                }
            }
            DetailField::Initials => {
                if let Some(form) = app.detail.status.as_mut() {
                    edit_text(&mut form.initials, key);
                }
            }
            DetailField::Notes => {
                if let Some(form) = app.detail.status.as_mut() {
                    edit_text(&mut form.notes, key);
                }
            }
        },
    }
}

/// Returns `true` when `buf` changed.
fn edit_text(buf: &mut String, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => buf.pop().is_some(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let changed = !buf.is_empty();
            buf.clear();
            changed
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            buf.push(c);
            true
        }
        _ => false,
    }
}

fn draw(f: &mut ratatui::Frame, app: &mut App) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(size);

    draw_header(f, chunks[0], app);
    draw_footer(f, chunks[2], app);

    match app.tab {
        Tab::Reports => draw_reports(f, chunks[1], app),
        Tab::NewReport => draw_form(f, chunks[1], app),
        Tab::Detail => draw_detail(f, chunks[1], app),
    }

    if app.show_help {
        draw_help(f, size);
    }
}

fn draw_header(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(44)])
        .split(area);

    let tabs = Tabs::new(Tab::TITLES.to_vec())
        .select(app.tab as usize)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("abusedash v{}", env!("CARGO_PKG_VERSION"))),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    f.render_widget(tabs, chunks[0]);

    let (label, style) = match &app.health {
        Health::Unknown => ("API ...".to_string(), Style::default().fg(Color::DarkGray)),
        Health::Ok => ("API ok".to_string(), Style::default().fg(Color::Green)),
        Health::Down(_) => (
            "API down".to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };
    let line = Line::from(vec![
        Span::styled(label, if app.color { style } else { Style::default() }),
        Span::raw("  "),
        Span::styled(
            truncate_chars(app.client.base_url(), 30),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let w = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(w, chunks[1]);
}

fn draw_footer(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let hint = match app.tab {
        Tab::Reports if app.filter_input.is_some() => {
            "Enter: apply  Esc: cancel  Backspace: delete  Ctrl-U: clear"
        }
        Tab::Reports => {
            "j/k: move  /: domain  f/t: from/to  s: risk  c: clear  1-4: sort  Enter: open  r: reload  ?: help  q: quit"
        }
        Tab::NewReport => "Up/Down: field  Left/Right: abuse type  Enter: submit  Tab: next view",
        Tab::Detail => "Up/Down: field  Enter: look up / save status  Left/Right: status  Tab: next view",
    };
    let line1 = Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)));
    let line2 = match &app.health {
        Health::Down(reason) => Line::from(Span::styled(
            truncate_chars(&format!("API unreachable: {reason}"), area.width as usize),
            Style::default().fg(Color::Red),
        )),
        _ => Line::from(""),
    };
    f.render_widget(Paragraph::new(vec![line1, line2]), area);
}

fn spinner(tick: u64) -> &'static str {
    const FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
    FRAMES[(tick % 4) as usize]
}

fn draw_reports(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let filters = &app.collection.filters;
    let editing = |which: FilterInput| app.filter_input == Some(which);
    let field = |which: FilterInput, current: String| -> Span<'static> {
        if editing(which) {
            Span::styled(
                format!("{}_", app.filter_buf),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )
        } else if current.is_empty() {
            Span::styled("-", Style::default().fg(Color::DarkGray))
        } else {
            Span::raw(current)
        }
    };
    let mut spans = vec![
        Span::styled("Domain: ", Style::default().fg(Color::DarkGray)),
        field(FilterInput::Domain, filters.domain.trim().to_string()),
        Span::styled("  Risk: ", Style::default().fg(Color::DarkGray)),
        Span::raw(filters.risk.to_string()),
        Span::styled("  From: ", Style::default().fg(Color::DarkGray)),
        field(FilterInput::From, filters.from.map(format_day).unwrap_or_default()),
        Span::styled("  To: ", Style::default().fg(Color::DarkGray)),
        field(FilterInput::To, filters.to.map(format_day).unwrap_or_default()),
    ];
    if let Some(err) = &app.filter_error {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(err.clone(), Style::default().fg(Color::Red)));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Filters")),
        chunks[0],
    );

    let sort = app.collection.sort;
    let header = Row::new(SortKey::ALL.iter().enumerate().map(|(i, key)| {
        let marker = if *key == sort.key {
            format!(" {}", sort.direction.arrow())
        } else {
            String::new()
        };
        Cell::from(format!("{}:{}{marker}", i + 1, key.label()))
    }))
    .style(Style::default().add_modifier(Modifier::BOLD));

    let (title, rows): (String, Vec<Row>) = match app.collection.state() {
        CollectionState::Loading => (
            format!("Reports {}", spinner(app.tick)),
            vec![Row::new(vec![Cell::from("Loading reports...")])],
        ),
        CollectionState::Error(msg) => (
            "Reports".to_string(),
            vec![Row::new(vec![Cell::from(Span::styled(
                msg.clone(),
                Style::default().fg(Color::Red),
            ))])],
        ),
        CollectionState::Loaded(all) => {
            let visible = app.collection.visible();
            let title = if app.collection.filters.is_active() {
                format!("Reports ({}/{})", visible.len(), all.len())
            } else {
                format!("Reports ({})", all.len())
            };
            let rows = if visible.is_empty() {
                vec![Row::new(vec![Cell::from("No reports match the current filters.")])]
            } else {
                visible
                    .iter()
                    .map(|r| {
                        Row::new(vec![
                            Cell::from(r.domain_name.clone()),
                            Cell::from(r.abuse_type.as_str()),
                            Cell::from(Span::styled(
                                r.risk_level.as_str(),
                                risk_style(r.risk_level, app.color),
                            )),
                            Cell::from(format_display(r.reported_timestamp)),
                        ])
                    })
                    .collect()
            };
            (title, rows)
        }
    };

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Length(16),
            Constraint::Length(10),
            Constraint::Length(22),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(table, chunks[1], &mut app.reports_state);
}

fn draw_form(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let form = &app.form;
    let mut lines = Vec::<Line>::new();
    for (i, field) in FormField::ALL.iter().enumerate() {
        let focused = i == app.form_field;
        let value = match field {
            FormField::Domain => form.domain.clone(),
            FormField::Source => form.source.clone(),
            FormField::AbuseType => format!("< {} >", form.abuse_type),
            FormField::Confidence => form.confidence.clone(),
            FormField::Timestamp => form.timestamp.clone(),
        };
        lines.push(field_line(field.label(), value, focused));
    }
    lines.push(Line::from(""));

    let status = match form.phase() {
        FormPhase::Submitting => Some(Span::styled(
            format!("Submitting {}", spinner(app.tick)),
            Style::default().fg(Color::Yellow),
        )),
        FormPhase::Created(report) => Some(Span::styled(
            format!(
                "Report created: #{} {} risk={}",
                report.report_id, report.domain_name, report.risk_level
            ),
            Style::default().fg(Color::Green),
        )),
        FormPhase::Invalid(_) | FormPhase::Failed(_) => form
            .message()
            .map(|m| Span::styled(m, Style::default().fg(Color::Red))),
        FormPhase::Idle => None,
    };
    if let Some(span) = status {
        lines.push(Line::from(span));
    }
    if app.reload_at.is_some() {
        lines.push(Line::from(Span::styled(
            "Reloading dashboard...",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let w = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("New abuse report"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, area);
}

fn field_line(label: &str, value: String, focused: bool) -> Line<'static> {
    let marker = if focused { "> " } else { "  " };
    let value_style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(marker),
        Span::styled(format!("{label:<20}"), Style::default().fg(Color::DarkGray)),
        Span::styled(if focused { format!("{value}_") } else { value }, value_style),
    ])
}

fn draw_detail(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(1)])
        .split(area);

    let lookup = &app.detail.lookup;
    let mut top = vec![field_line(
        "Domain",
        lookup.query.clone(),
        app.detail_field == 0,
    )];
    match lookup.state() {
        LookupState::Loading => top.push(Line::from(Span::styled(
            format!("Loading {}", spinner(app.tick)),
            Style::default().fg(Color::Yellow),
        ))),
        _ => {
            if let Some(msg) = lookup.message() {
                top.push(Line::from(Span::styled(msg, Style::default().fg(Color::Red))));
            }
        }
    }
    f.render_widget(
        Paragraph::new(top).block(Block::default().borders(Borders::ALL).title("Lookup")),
        chunks[0],
    );

    let Some(detail) = lookup.detail() else {
        let hint = match lookup.state() {
            LookupState::Idle => "Type a domain and press Enter.",
            _ => "",
        };
        f.render_widget(
            Paragraph::new(hint).block(Block::default().borders(Borders::ALL)),
            chunks[1],
        );
        return;
    };

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let mut left = vec![
        Line::from(vec![
            Span::styled("Domain  ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                detail.domain.domain_name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Status  ", Style::default().fg(Color::DarkGray)),
            Span::raw(detail.domain.current_status.clone()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("Reports ({})", detail.reports.len()),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    if detail.reports.is_empty() {
        left.push(Line::from("  none"));
    }
    for r in &detail.reports {
        left.push(Line::from(vec![
            Span::raw(format!("  {}  ", format_display(r.reported_timestamp))),
            Span::raw(format!("{:<10} ", r.abuse_type.as_str())),
            Span::styled(r.risk_level.as_str(), risk_style(r.risk_level, app.color)),
        ]));
    }
    left.push(Line::from(""));
    left.push(Line::from(Span::styled(
        format!("Status history ({})", detail.status_history.len()),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if detail.status_history.is_empty() {
        left.push(Line::from("  none"));
    }
    for entry in &detail.status_history {
        left.push(Line::from(format!("  {}", crate::ui::history_line(entry))));
    }
    f.render_widget(
        Paragraph::new(Text::from(left))
            .block(Block::default().borders(Borders::ALL).title("Detail"))
            .wrap(Wrap { trim: false }),
        cols[0],
    );

    let mut right = Vec::<Line>::new();
    if let Some(form) = &app.detail.status {
        right.push(field_line(
            "New status",
            format!("< {} >", form.new_status),
            app.detail_field == 1,
        ));
        right.push(field_line("Initials", form.initials.clone(), app.detail_field == 2));
        right.push(field_line("Notes", form.notes.clone(), app.detail_field == 3));
        right.push(Line::from(""));
        let msg = match form.state() {
            SaveState::Saving => Some(Span::styled(
                format!("Saving {}", spinner(app.tick)),
                Style::default().fg(Color::Yellow),
            )),
            SaveState::Success => form
                .message()
                .map(|m| Span::styled(m, Style::default().fg(Color::Green))),
            SaveState::Invalid(_) | SaveState::Failure(_) => form
                .message()
                .map(|m| Span::styled(m, Style::default().fg(Color::Red))),
            SaveState::Idle => None,
        };
        if let Some(span) = msg {
            right.push(Line::from(span));
        }
    }
    f.render_widget(
        Paragraph::new(Text::from(right))
            .block(Block::default().borders(Borders::ALL).title("Update status"))
            .wrap(Wrap { trim: false }),
        cols[1],
    );
}

fn draw_help(f: &mut ratatui::Frame, area: Rect) {
    let text = Text::from(vec![
        Line::from(Span::styled(
            "abusedash dashboard",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Everywhere:"),
        Line::from("  Tab / Shift-Tab : switch view"),
        Line::from("  F5              : reload everything"),
        Line::from("  Ctrl-C          : quit"),
        Line::from(""),
        Line::from("Reports:"),
        Line::from("  j/k, Up/Down : move      Enter : open domain"),
        Line::from("  /            : domain filter (substring, case-insensitive)"),
        Line::from("  f / t        : from / to day (YYYY-MM-DD, UTC, inclusive)"),
        Line::from("  s            : cycle risk ALL > HIGH > MEDIUM > LOW"),
        Line::from("  c            : clear filters"),
        Line::from("  1-4          : sort by column, again to reverse"),
        Line::from("  r            : reload reports"),
        Line::from(""),
        Line::from("Forms (New Report, Domain Detail):"),
        Line::from("  Up/Down : field    Left/Right : cycle choice"),
        Line::from("  Enter   : submit   Backspace / Ctrl-U : delete / clear"),
        Line::from(""),
        Line::from("  ? or Esc closes this help."),
    ]);
    let popup = centered_rect(70, 70, area);
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false }),
        popup,
    );
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    let mut s = String::new();
    for (i, ch) in input.chars().enumerate() {
        if i >= max_chars {
            s.push('…');
            break;
        }
        s.push(ch);
    }
    s
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn risk_style(risk: RiskLevel, enabled: bool) -> Style {
    if !enabled {
        return Style::default();
    }
    match risk {
        RiskLevel::Low => Style::default().fg(Color::Green),
        RiskLevel::Medium => Style::default().fg(Color::Yellow),
        RiskLevel::High => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}
