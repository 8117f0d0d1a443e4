//! TUI UI Rendering
//!
//! Renders the terminal UI using ratatui with 6 zones:
//! - Header: engine state, meta line
//! - Trade: last trade progress
//! - Overview: settings, wallet, API usage meter
//! - Stats: strategy KPI gauges, risk profile table, leader
//! - Logs: scrollable, pinned to the tail unless the user scrolled away
//! - Footer: key bindings, or the open editor

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, LineGauge, List, ListItem, Paragraph, Row, Table},
    Frame,
};

use super::app::{AppState, InputTarget};
use crate::api::types::EngineState;
use crate::core::dispatcher::CommandKind;
use crate::core::format::Severity;
use crate::core::risk::RiskProfile;
use crate::core::usage::MeterClass;

/// Main draw function - renders the entire UI
///
/// Takes `&mut` because the log panel reports its height back to the
/// scroll state.
pub fn draw(frame: &mut Frame, state: &mut AppState) {
    // Below ~36 rows the log panel clips to nothing; saturating math keeps it safe
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Trade
            Constraint::Length(10), // Overview
            Constraint::Length(8), // Stats
            Constraint::Min(6),    // Logs
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], state);
    draw_trade(frame, chunks[1], state);
    draw_overview(frame, chunks[2], state);
    draw_stats(frame, chunks[3], state);
    draw_logs(frame, chunks[4], state);
    draw_footer(frame, chunks[5], state);
}

fn state_color(state: EngineState) -> Color {
    match state {
        EngineState::Running => Color::Green,
        EngineState::Stopping => Color::Yellow,
        EngineState::Idle => Color::DarkGray,
        EngineState::Unknown => Color::Gray,
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warn => Color::Yellow,
        Severity::Success => Color::Green,
        Severity::Info => Color::Cyan,
    }
}

fn meter_color(class: MeterClass) -> Color {
    match class {
        MeterClass::Ok => Color::Green,
        MeterClass::Warn => Color::Yellow,
        MeterClass::Critical => Color::Red,
    }
}

fn label_value<'a>(label: &'a str, value: impl Into<String>) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<9}", label), Style::default().fg(Color::DarkGray)),
        Span::raw(value.into()),
    ])
}

/// Engine state, meta line and busy markers
fn draw_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let view = state.engine.view();

    let mut spans = vec![
        Span::styled(
            format!("● {}", view.label.to_uppercase()),
            Style::default()
                .fg(state_color(view.state))
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if view.optimistic {
        spans.push(Span::styled(" (pending)", Style::default().fg(Color::DarkGray)));
    }
    if !view.meta.is_empty() {
        spans.push(Span::raw("  │  "));
        spans.push(Span::raw(view.meta));
    }
    for (kind, label) in [(CommandKind::Start, "starting…"), (CommandKind::Stop, "stopping…")] {
        if state.is_busy(kind) {
            spans.push(Span::styled(
                format!("  {}", label),
                Style::default().fg(Color::Yellow),
            ));
        }
    }

    let title = format!("Engine Console  {}  up {}", state.api_url, state.uptime_str());
    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(header, area);
}

/// Last trade as a progress bar
fn draw_trade(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().borders(Borders::ALL).title("Last trade");
    match state.engine.view().trade {
        Some(trade) => {
            let label = if trade.detail.is_empty() {
                trade.label
            } else {
                format!("{} · {}", trade.label, trade.detail)
            };
            let gauge = Gauge::default()
                .block(block)
                .gauge_style(Style::default().fg(Color::Cyan))
                .percent(trade.percent.min(100))
                .label(label);
            frame.render_widget(gauge, area);
        }
        None => {
            let empty = Paragraph::new(Span::styled("no trade yet", Style::default().fg(Color::DarkGray)))
                .block(block);
            frame.render_widget(empty, area);
        }
    }
}

/// Settings | wallet | usage
fn draw_overview(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(area);

    let settings = &state.settings;
    let contracts = if settings.contracts.is_empty() {
        "none".to_string()
    } else {
        settings.contracts.join(", ")
    };
    let live_color = if settings.live == "ready" { Color::Green } else { Color::Red };
    let settings_lines = vec![
        label_value("address", settings.address.clone()),
        label_value("chain", settings.chain.clone()),
        label_value("mode", settings.mode.clone()),
        label_value("balance", settings.balance_source.clone()),
        label_value("risk", settings.risk_profile.clone()),
        Line::from(vec![
            Span::styled(format!("{:<9}", "live"), Style::default().fg(Color::DarkGray)),
            Span::styled(settings.live, Style::default().fg(live_color)),
        ]),
        label_value("strategy", settings.strategy.clone()),
        label_value("contracts", contracts),
    ];
    frame.render_widget(
        Paragraph::new(settings_lines).block(Block::default().borders(Borders::ALL).title("Settings")),
        chunks[0],
    );

    let wallet = &state.wallet;
    let mut wallet_lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{} {}", wallet.balance, wallet.symbol),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
        ]),
        label_value("usd", wallet.usd.clone()),
    ];
    if let Some(badge) = &wallet.source_badge {
        wallet_lines.push(Line::from(Span::styled(badge.clone(), Style::default().fg(Color::DarkGray))));
    }
    if let Some(chain) = &wallet.chain {
        wallet_lines.push(label_value("chain", chain.clone()));
    }
    if let Some(collection) = &wallet.collection {
        wallet_lines.push(label_value("holds", collection.clone()));
    }
    frame.render_widget(
        Paragraph::new(wallet_lines).block(Block::default().borders(Borders::ALL).title("Wallet")),
        chunks[1],
    );

    draw_usage(frame, chunks[2], state);
}

fn draw_usage(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().borders(Borders::ALL).title("API usage");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    match &state.usage {
        Some(usage) => {
            let gauge = LineGauge::default()
                .filled_style(Style::default().fg(meter_color(usage.class)))
                .ratio((usage.percent / 100.0).clamp(0.0, 1.0))
                .label(format!("{:.1}%", usage.percent));
            frame.render_widget(gauge, rows[0]);
            frame.render_widget(
                Paragraph::new(usage.caption.clone())
                    .style(Style::default().fg(Color::DarkGray))
                    .wrap(ratatui::widgets::Wrap { trim: true }),
                rows[1],
            );
        }
        None => {
            frame.render_widget(
                Paragraph::new(Span::styled("no data", Style::default().fg(Color::DarkGray))),
                rows[0],
            );
        }
    }
}

/// KPI gauges | risk table and leader
fn draw_stats(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let kpi_block = Block::default().borders(Borders::ALL).title("Strategy winrate");
    let kpi_inner = kpi_block.inner(chunks[0]);
    frame.render_widget(kpi_block, chunks[0]);

    let kpi_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(1); state.kpi.len()])
        .split(kpi_inner);
    for (gauge, row) in state.kpi.iter().zip(kpi_rows.iter()) {
        let highlight = gauge.name == state.leader.best;
        let color = if highlight { Color::Green } else { Color::Cyan };
        let widget = LineGauge::default()
            .filled_style(Style::default().fg(color))
            .ratio(gauge.winrate / 100.0)
            .label(format!("{:<12}{:>5.1}%", gauge.name, gauge.winrate));
        frame.render_widget(widget, *row);
    }

    let header = Row::new(vec!["profile", "trades", "winrate", "avg", "total"])
        .style(Style::default().fg(Color::DarkGray));
    let rows: Vec<Row> = state
        .risk
        .rows
        .iter()
        .map(|row| {
            let style = if row.is_best {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if row.is_best { "★ " } else { "  " };
            Row::new(vec![
                Cell::from(format!("{}{}", marker, row.profile)),
                Cell::from(row.trades.clone()),
                Cell::from(row.winrate.clone()),
                Cell::from(row.avg_profit.clone()),
                Cell::from(row.total_profit.clone()),
            ])
            .style(style)
        })
        .collect();

    let leader = if state.leader.narrative.is_empty() {
        format!("Leader: {}", state.leader.best)
    } else {
        format!("Leader: {} · {}", state.leader.best, state.leader.narrative)
    };
    let mut block = Block::default().borders(Borders::ALL).title(leader);
    if let Some(profile) = RiskProfile::parse(&state.settings.risk_profile) {
        block = block.title_bottom(Line::styled(
            profile.description(),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let table = Table::new(
        rows,
        [
            Constraint::Length(15),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(block);
    frame.render_widget(table, chunks[1]);
}

/// Draw scrollable log panel
fn draw_logs(frame: &mut Frame, area: Rect, state: &mut AppState) {
    let viewport = area.height.saturating_sub(2) as usize;
    state.logs.scroll_mut().set_viewport(viewport);

    let offset = state.logs.scroll().offset();
    let log_items: Vec<ListItem> = state
        .logs
        .buffer()
        .entries()
        .iter()
        .skip(offset)
        .take(viewport)
        .map(|entry| {
            let text = entry.text.lines().map(str::trim).collect::<Vec<_>>().join(" ");
            ListItem::new(Line::from(vec![
                Span::styled(entry.time.clone(), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(
                    format!("[{}]", entry.label),
                    Style::default().fg(severity_color(entry.severity)),
                ),
                Span::raw(" "),
                Span::raw(text),
            ]))
        })
        .collect();

    let scroll = state.logs.scroll();
    let mut title = String::from("Logs (↑/↓ PgUp/PgDn scroll, End=follow, L=debug)");
    if scroll.is_paused() {
        title.push_str(" [PAUSED]");
    }
    if state.show_debug_logs {
        title.push_str(" [DEBUG ON]");
    }
    if state.dropped_logs_count > 0 {
        title.push_str(&format!(" [dropped {}]", state.dropped_logs_count));
    }

    let logs = List::new(log_items).block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(logs, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let content = match &state.input {
        Some(input) => {
            let prompt = match input.target {
                InputTarget::Contracts => "contracts (comma/space separated or JSON array)",
                InputTarget::OpenSeaKey => "OpenSea API key",
            };
            Line::from(vec![
                Span::styled(format!("{}: ", prompt), Style::default().fg(Color::Yellow)),
                Span::raw(input.buffer.clone()),
                Span::styled("█", Style::default().fg(Color::Yellow)),
                Span::styled("  Enter=save Esc=cancel", Style::default().fg(Color::DarkGray)),
            ])
        }
        None => Line::from(Span::styled(
            "s start  x stop  m mode  c chain  b balance  r risk  t strategy  p contracts  o opensea  h rpc  T test  u reload  q quit",
            Style::default().fg(Color::DarkGray),
        )),
    };

    frame.render_widget(
        Paragraph::new(content).block(Block::default().borders(Borders::ALL)),
        area,
    );
}
