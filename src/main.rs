use std::collections::HashMap;
use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use scout_terminal::config::AppConfig;
use scout_terminal::data_processor::{PlayerRecord, Position, StatKey};
use scout_terminal::recommender::Recommendation;
use scout_terminal::state::{AppState, Delta, ProviderCommand, Screen, apply_delta};
use scout_terminal::{feed, persist};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    players_refresh: Duration,
    last_players_request: HashMap<u32, Instant>,
}

impl App {
    fn new(cfg: &AppConfig, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        let players_refresh = std::env::var("PLAYERS_POLL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(60)
            .max(10);
        Self {
            state: AppState::new(cfg),
            should_quit: false,
            cmd_tx,
            players_refresh: Duration::from_secs(players_refresh),
            last_players_request: HashMap::new(),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.help_overlay {
            self.state.help_overlay = false;
            return;
        }
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('?') => {
                self.state.help_overlay = true;
                return;
            }
            KeyCode::Char('1') => {
                self.state.screen = Screen::Dashboard;
                return;
            }
            KeyCode::Char('2') => {
                self.state.screen = Screen::Players;
                return;
            }
            KeyCode::Char('3') => {
                self.state.screen = Screen::Similar;
                return;
            }
            KeyCode::Char('l') | KeyCode::Char('L') => {
                self.state.cycle_league();
                self.request_players(true);
                return;
            }
            KeyCode::Char('r') => {
                self.request_players(true);
                return;
            }
            KeyCode::Char('R') => {
                self.request_league_players();
                return;
            }
            KeyCode::Char('c') => {
                self.send(ProviderCommand::ClearCache, "Cache clear");
                return;
            }
            _ => {}
        }
        match self.state.screen {
            Screen::Dashboard => self.on_key_dashboard(key),
            Screen::Players => self.on_key_players(key),
            Screen::PlayerDetail => self.on_key_detail(key),
            Screen::Similar => self.on_key_similar(key),
        }
    }

    fn on_key_dashboard(&mut self, key: KeyEvent) {
        if let KeyCode::Char('m') = key.code {
            self.state.cycle_dashboard_metric();
        }
    }

    fn on_key_players(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('s') => self.state.cycle_sort(),
            KeyCode::Char('p') => self.state.cycle_position_filter(),
            KeyCode::Char('d') | KeyCode::Enter => {
                if let Some(record) = self.state.selected_player().cloned() {
                    self.state.open_detail(record, Screen::Players);
                }
            }
            KeyCode::Char('f') => {
                if let Some((id, position)) =
                    self.state.selected_player().map(|r| (r.id, r.position))
                {
                    self.state.query.reference = Some(id);
                    self.state.query.position = position;
                    self.state.screen = Screen::Similar;
                }
            }
            KeyCode::Char('e') => self.request_export(),
            _ => {}
        }
    }

    fn on_key_detail(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('b') | KeyCode::Esc => {
                self.state.screen = self.state.detail_back;
            }
            KeyCode::Char('u') => {
                let Some(record) = self.state.detail.as_ref() else {
                    return;
                };
                let season = self.state.season;
                let player_id = record.id;
                self.send(
                    ProviderCommand::FetchPlayer { player_id, season },
                    "Player refresh",
                );
            }
            KeyCode::Char('f') => {
                if let Some(record) = self.state.detail.as_ref() {
                    self.state.query.reference = Some(record.id);
                    self.state.query.position = record.position;
                    self.state.screen = Screen::Similar;
                }
            }
            _ => {}
        }
    }

    fn on_key_similar(&mut self, key: KeyEvent) {
        let query = &mut self.state.query;
        match key.code {
            KeyCode::Char('b') | KeyCode::Esc => {
                self.state.screen = Screen::Players;
                return;
            }
            KeyCode::Char('s') => query.features.shooting = !query.features.shooting,
            KeyCode::Char('a') => query.features.passing = !query.features.passing,
            KeyCode::Char('d') => query.features.defense = !query.features.defense,
            KeyCode::Char('u') => query.features.duels = !query.features.duels,
            KeyCode::Char('g') => query.features.goalkeeping = !query.features.goalkeeping,
            KeyCode::Char('o') => query.features.profile = !query.features.profile,
            KeyCode::Char('p') => {
                query.position = match query.position {
                    None => Some(Position::Goalkeeper),
                    Some(Position::Goalkeeper) => Some(Position::Defender),
                    Some(Position::Defender) => Some(Position::Midfielder),
                    Some(Position::Midfielder) => Some(Position::Attacker),
                    Some(Position::Attacker) => None,
                };
            }
            KeyCode::Char('x') => query.reference = None,
            KeyCode::Char('[') => {
                let next = query.min_rating.unwrap_or(6.5) - 0.1;
                query.min_rating = (next > 0.0).then_some((next * 10.0).round() / 10.0);
            }
            KeyCode::Char(']') => {
                let next = query.min_rating.map_or(6.5, |v| v + 0.1);
                query.min_rating = Some((next * 10.0).round() / 10.0);
            }
            KeyCode::Char('{') => {
                let next = query.max_age.unwrap_or(30.0) - 1.0;
                query.max_age = (next > 14.0).then_some(next);
            }
            KeyCode::Char('}') => {
                query.max_age = Some(query.max_age.map_or(30.0, |v| v + 1.0));
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                query.limit = (query.limit + 1).min(25);
            }
            KeyCode::Char('-') => {
                query.limit = query.limit.saturating_sub(1).max(1);
            }
            KeyCode::Enter => self.state.run_recommendation(),
            KeyCode::Char('e') => self.request_export(),
            _ => {}
        }
    }

    fn request_players(&mut self, announce: bool) {
        let league_id = self.state.current_league_id();
        let season = self.state.season;
        let Some(tx) = &self.cmd_tx else {
            if announce {
                self.state.push_log("[INFO] Player fetch unavailable");
            }
            return;
        };
        if tx
            .send(ProviderCommand::FetchTopPlayers { league_id, season })
            .is_err()
        {
            if announce {
                self.state.push_log("[WARN] Player request failed");
            }
        } else {
            if announce {
                self.state.push_log(format!(
                    "[INFO] Player request sent (league {league_id})"
                ));
            }
            self.state.players_loading = true;
            self.last_players_request.insert(league_id, Instant::now());
        }
    }

    fn request_league_players(&mut self) {
        let league_id = self.state.current_league_id();
        let season = self.state.season;
        if self
            .send(
                ProviderCommand::FetchLeaguePlayers { league_id, season },
                "League fetch",
            )
            .is_some()
        {
            self.state.players_loading = true;
            self.last_players_request.insert(league_id, Instant::now());
        }
    }

    fn request_export(&mut self) {
        let league_id = self.state.current_league_id();
        let path = std::env::var("SCOUT_EXPORT_PATH")
            .unwrap_or_else(|_| "scout_report.xlsx".to_string());
        // The current recommendation run rides along as its own sheet.
        let recommendations = self.state.recommendations.clone();
        self.send(
            ProviderCommand::ExportPlayers {
                path,
                league_id,
                recommendations,
            },
            "Export",
        );
    }

    fn send(&mut self, cmd: ProviderCommand, label: &str) -> Option<()> {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log(format!("[INFO] {label} unavailable"));
            return None;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {label} request failed"));
            None
        } else {
            self.state.push_log(format!("[INFO] {label} request sent"));
            Some(())
        }
    }

    // Fetch the selected league when nothing is loaded yet, then keep it
    // fresh on the poll interval.
    fn maybe_refresh_players(&mut self) {
        let league_id = self.state.current_league_id();
        let due = match self.last_players_request.get(&league_id) {
            Some(t) => t.elapsed() >= self.players_refresh,
            None => true,
        };
        if due {
            self.request_players(false);
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = AppConfig::load();
    if let Err(err) = cfg.save() {
        eprintln!("warning: could not save config: {err}");
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    feed::spawn_provider(cfg.clone(), tx, cmd_rx);

    let mut app = App::new(&cfg, Some(cmd_tx));
    persist::load_into_state(&mut app.state);
    app.state
        .push_log(format!("[INFO] Source: {}", cfg.api_source.label()));

    let res = run_app(&mut terminal, &mut app, rx);

    persist::save_from_state(&app.state);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.maybe_refresh_players();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Dashboard => render_dashboard(frame, chunks[1], &app.state),
        Screen::Players => render_players(frame, chunks[1], &app.state),
        Screen::PlayerDetail => render_detail(frame, chunks[1], &app.state),
        Screen::Similar => render_similar(frame, chunks[1], &app.state),
    }

    let footer = Paragraph::new(footer_text(&app.state))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        render_help(frame);
    }
}

fn header_text(state: &AppState) -> String {
    let league = state.current_league();
    let loaded = state
        .current_table()
        .map(|t| t.len())
        .unwrap_or_default();
    let loading = if state.players_loading { " (loading...)" } else { "" };
    let updated = state
        .fetched_label()
        .map(|t| format!(" | updated {t}"))
        .unwrap_or_default();
    format!(
        "SCOUT TERMINAL | {} ({}) | season {} | {} players{}{}",
        league.name, league.country, state.season, loaded, loading, updated
    )
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Dashboard => {
            "1 dash 2 players 3 similar | m metric | l league | r refresh | c clear cache | ? help | q quit"
                .to_string()
        }
        Screen::Players => match &state.export_notice {
            Some(notice) => notice.clone(),
            None => {
                "j/k move | s sort | p position | Enter detail | f similar | e export | R full league | q quit"
                    .to_string()
            }
        },
        Screen::PlayerDetail => "b back | u refresh | f similar | q quit".to_string(),
        Screen::Similar => {
            "toggles: s a d u g o | p position | [/] rating | {/} age | +/- limit | x drop ref | Enter run"
                .to_string()
        }
    }
}

fn render_dashboard(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(8)])
        .split(area);

    let metric = state.dashboard_metric();
    let title = format!(" Top players by {} (m to cycle) ", metric.label());
    match state.current_table() {
        Some(table) if !table.is_empty() => {
            let top = table.top_by_metric(metric, 8);
            let scale = metric_scale(metric);
            let bars: Vec<Bar> = top
                .iter()
                .map(|r| {
                    let value = r.stat(metric).unwrap_or_default();
                    Bar::default()
                        .value((value * scale).round().max(0.0) as u64)
                        .text_value(format_metric(value))
                        .label(Line::from(short_name(&r.name)))
                        .style(Style::default().fg(Color::Cyan))
                })
                .collect();
            let chart = BarChart::default()
                .block(Block::default().borders(Borders::ALL).title(title))
                .data(BarGroup::default().bars(&bars))
                .bar_width(9)
                .bar_gap(1);
            frame.render_widget(chart, rows[0]);
        }
        _ => {
            let placeholder = Paragraph::new("No player data yet. Press r to fetch.")
                .block(Block::default().borders(Borders::ALL).title(title));
            frame.render_widget(placeholder, rows[0]);
        }
    }

    render_console(frame, rows[1], state);
}

fn render_console(frame: &mut Frame, area: Rect, state: &AppState) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .logs
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|l| log_line(l))
        .collect();
    let console =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Console "));
    frame.render_widget(console, area);
}

fn log_line(raw: &str) -> Line<'_> {
    let style = if raw.contains("[WARN]") {
        Style::default().fg(Color::Yellow)
    } else if raw.contains("[ERROR]") {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Gray)
    };
    Line::from(Span::styled(raw, style))
}

fn render_players(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = state.filtered_players();
    let filter = state
        .position_filter
        .map(|p| p.label())
        .unwrap_or("all positions");
    let title = format!(
        " Players [{}] sort: {} ({} rows) ",
        filter,
        state.sort.label(),
        rows.len()
    );

    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{:<24} {:<20} {:<11} {:>4} {:>6} {:>6} {:>7}",
            "NAME", "TEAM", "POS", "AGE", "RATE", "GOALS", "ASSIST"
        ),
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    let visible = area.height.saturating_sub(3) as usize;
    let (start, end) = visible_range(state.selected, rows.len(), visible);
    for (i, record) in rows.iter().enumerate().take(end).skip(start) {
        let style = if i == state.selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(player_row_text(record), style)));
    }

    let list = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn player_row_text(record: &PlayerRecord) -> String {
    format!(
        "{:<24} {:<20} {:<11} {:>4} {:>6} {:>6} {:>7}",
        truncate(&record.name, 24),
        truncate(&record.team, 20),
        record.position.map(|p| p.label()).unwrap_or("-"),
        record
            .age()
            .map(|a| format!("{a:.0}"))
            .unwrap_or_else(|| "-".to_string()),
        record
            .rating()
            .map(|r| format!("{r:.2}"))
            .unwrap_or_else(|| "-".to_string()),
        record
            .stat(StatKey::GoalsTotal)
            .map(|g| format!("{g:.0}"))
            .unwrap_or_else(|| "-".to_string()),
        record
            .stat(StatKey::Assists)
            .map(|a| format!("{a:.0}"))
            .unwrap_or_else(|| "-".to_string()),
    )
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(record) = state.detail.as_ref() else {
        let empty = Paragraph::new("No player selected.")
            .block(Block::default().borders(Borders::ALL).title(" Player "));
        frame.render_widget(empty, area);
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let mut lines = vec![
        Line::from(Span::styled(
            record.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            "{} | {} | {}",
            record.team,
            record.position.map(|p| p.label()).unwrap_or("-"),
            record.league_name
        )),
        Line::from(format!(
            "{} {} {}",
            record.nationality.clone().unwrap_or_default(),
            record.height.clone().unwrap_or_default(),
            record.weight.clone().unwrap_or_default()
        )),
        Line::from(""),
    ];
    for key in StatKey::ALL {
        if let Some(value) = record.stat(*key) {
            lines.push(Line::from(format!(
                "{:<24} {:>10}",
                key.label(),
                format_metric(value)
            )));
        }
    }
    let info = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Player #{} ", record.id)),
    );
    frame.render_widget(info, columns[0]);

    let mut similar_lines = Vec::new();
    if state.detail_similar.is_empty() {
        similar_lines.push(Line::from("No similar players computed."));
    }
    for (i, rec) in state.detail_similar.iter().enumerate() {
        similar_lines.push(recommendation_line(i, rec));
    }
    let similar = Paragraph::new(similar_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Similar players "),
    );
    frame.render_widget(similar, columns[1]);
}

fn render_similar(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(38), Constraint::Min(1)])
        .split(area);

    let query = &state.query;
    let toggles = &query.features;
    let on = |b: bool| if b { "[x]" } else { "[ ]" };
    let reference = query
        .reference
        .and_then(|id| {
            state
                .current_table()
                .and_then(|t| t.get_by_id(id))
                .map(|r| format!("{} (#{id})", r.name))
        })
        .unwrap_or_else(|| "none (centroid ranking)".to_string());

    let mut lines = vec![
        Line::from(format!("reference: {reference}")),
        Line::from(format!(
            "position:  {}",
            query.position.map(|p| p.label()).unwrap_or("any")
        )),
        Line::from(format!(
            "min rate:  {}",
            query
                .min_rating
                .map(|v| format!("{v:.1}"))
                .unwrap_or_else(|| "-".to_string())
        )),
        Line::from(format!(
            "max age:   {}",
            query
                .max_age
                .map(|v| format!("{v:.0}"))
                .unwrap_or_else(|| "-".to_string())
        )),
        Line::from(format!("limit:     {}", query.limit)),
        Line::from(""),
        Line::from(Span::styled(
            "features",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("{} (s) shooting", on(toggles.shooting))),
        Line::from(format!("{} (a) passing", on(toggles.passing))),
        Line::from(format!("{} (d) defense", on(toggles.defense))),
        Line::from(format!("{} (u) duels", on(toggles.duels))),
        Line::from(format!("{} (g) goalkeeping", on(toggles.goalkeeping))),
        Line::from(format!("{} (o) profile", on(toggles.profile))),
    ];
    if let Some(notice) = &state.recommend_notice {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        )));
    }
    let panel =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Query "));
    frame.render_widget(panel, columns[0]);

    let mut result_lines = Vec::new();
    if state.recommendations.is_empty() {
        result_lines.push(Line::from("Press Enter to run the recommendation."));
    }
    for (i, rec) in state.recommendations.iter().enumerate() {
        result_lines.push(recommendation_line(i, rec));
    }
    let results = Paragraph::new(result_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Recommendations "),
    );
    frame.render_widget(results, columns[1]);
}

fn recommendation_line(i: usize, rec: &Recommendation) -> Line<'static> {
    Line::from(format!(
        "{:>2}. {:<22} {:<14} {:<11} sim {:.3}",
        i + 1,
        truncate(&rec.player.name, 22),
        truncate(&rec.player.team, 14),
        rec.player.position.map(|p| p.label()).unwrap_or("-"),
        rec.similarity
    ))
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(62, 18, frame.size());
    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from(Span::styled(
            "Keys",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("1/2/3      dashboard / players / similar"),
        Line::from("l          cycle league    r refresh (top scorers)"),
        Line::from("R          full league fetch (paged)"),
        Line::from("m          dashboard metric"),
        Line::from("j/k s p    move / sort / position filter"),
        Line::from("Enter      open player detail"),
        Line::from("f          similar-players query for selection"),
        Line::from("e          export XLSX    c clear HTTP cache"),
        Line::from("similar:   s a d u g o toggles, [/] {/} +/- x"),
        Line::from("q          quit"),
        Line::from(""),
        Line::from("any key closes this overlay"),
    ];
    let help =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Help "));
    frame.render_widget(help, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 || visible == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }
    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

// Fractional metrics get an integer bar scale so small values still show.
fn metric_scale(metric: StatKey) -> f64 {
    match metric {
        StatKey::Rating => 10.0,
        StatKey::GoalsPer90 | StatKey::AssistsPer90 => 100.0,
        _ => 1.0,
    }
}

fn format_metric(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.2}")
    }
}

fn short_name(name: &str) -> String {
    let last = name.split_whitespace().last().unwrap_or(name);
    truncate(last, 9)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
