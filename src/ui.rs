use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};
use crate::types::AMOUNT_PRESETS;
use crate::util_text::{format_stx, truncate_address};

const ACCENT: Color = Color::Rgb(0xfc, 0x64, 0x32);
const DIM: Color = Color::DarkGray;
const OK: Color = Color::Green;

// ===============================
// Top-level draw
// ===============================
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(5), // stats
            Constraint::Length(8), // form
            Constraint::Min(3),    // recent tips
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    header(f, chunks[0], app);
    stats(f, chunks[1], app);
    form(f, chunks[2], app);
    recent(f, chunks[3], app);
    footer(f, chunks[4], app);

    if app.toast_message().is_some() {
        draw_toast(f, app);
    }
}

fn panel(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused { ACCENT } else { DIM }))
}

// ===============================
// Header / Stats
// ===============================
fn header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "STX Tip Jar",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}  ", app.network()), Style::default().fg(DIM)),
    ];
    match app.address_display() {
        Some(addr) => {
            spans.push(Span::styled("● ", Style::default().fg(OK)));
            spans.push(Span::raw(addr));
            if let Some(b) = app.wallet().balance {
                spans.push(Span::styled(
                    format!("  {} STX", format_stx(b)),
                    Style::default().fg(DIM),
                ));
            }
        }
        None if app.is_connecting() => {
            spans.push(Span::styled("connecting...", Style::default().fg(DIM)))
        }
        None => spans.push(Span::styled("not connected", Style::default().fg(DIM))),
    }

    let owner = app
        .owner()
        .map(|o| format!("owner {}", truncate_address(o)))
        .unwrap_or_default();
    let lines = vec![
        Line::from(spans),
        Line::from(Span::styled(
            format!("{}  {owner}", app.contract()),
            Style::default().fg(DIM),
        )),
    ];
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::BOTTOM)),
        area,
    );
}

fn stat_box(f: &mut Frame, area: Rect, title: &str, value: String) {
    let p = Paragraph::new(Line::from(Span::styled(
        value,
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .block(panel(title, false));
    f.render_widget(p, area);
}

fn stats(f: &mut Frame, area: Rect, app: &App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);
    stat_box(f, cols[0], "Total tipped", format!("{} STX", app.total_display()));
    stat_box(f, cols[1], "Tips", app.count_display());
    stat_box(
        f,
        cols[2],
        "Recent tippers",
        app.unique_tippers().to_string(),
    );
}

// ===============================
// Tip form
// ===============================
fn form(f: &mut Frame, area: Rect, app: &App) {
    let editing_amount = app.input_mode() == InputMode::Amount;
    let editing_message = app.input_mode() == InputMode::Message;
    let field = |label: &str, value: &str, active: bool| {
        Line::from(vec![
            Span::styled(format!("{label:<9}"), Style::default().fg(DIM)),
            Span::styled(
                value.to_string(),
                if active {
                    Style::default().fg(ACCENT).add_modifier(Modifier::UNDERLINED)
                } else {
                    Style::default()
                },
            ),
        ])
    };

    let presets = AMOUNT_PRESETS
        .iter()
        .enumerate()
        .map(|(i, stx)| format!("[{}] {stx}", i + 1))
        .collect::<Vec<_>>()
        .join("  ");
    let message = if app.message_input().is_empty() && !editing_message {
        "(optional)"
    } else {
        app.message_input()
    };
    let send_hint = if app.is_sending() {
        Span::styled("sending...", Style::default().fg(DIM))
    } else if app.can_send() {
        Span::styled("[s] Send tip", Style::default().fg(OK))
    } else {
        Span::styled("connect a wallet to tip", Style::default().fg(DIM))
    };

    let mut lines = vec![
        field("Amount", &format!("{} STX", app.amount_input()), editing_amount),
        Line::from(Span::styled(format!("         {presets}"), Style::default().fg(DIM))),
        field("Message", message, editing_message),
        Line::from(vec![Span::raw("         "), send_hint]),
    ];
    if let Some(txid) = app.last_txid() {
        lines.push(field("Last tx", txid, false));
        lines.push(Line::from(Span::styled(
            app.network().explorer_tx_url(txid),
            Style::default().fg(OK),
        )));
    }
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(panel("Send a tip", editing_amount || editing_message)),
        area,
    );
}

// ===============================
// Recent tips
// ===============================
fn recent(f: &mut Frame, area: Rect, app: &App) {
    let tips = app.recent_tips();
    let items: Vec<ListItem> = if tips.is_empty() {
        vec![ListItem::new(Span::styled(
            "No tips yet",
            Style::default().fg(DIM),
        ))]
    } else {
        tips.iter()
            .map(|t| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:>10} STX  ", format_stx(t.amount)),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!("{}  ", truncate_address(&t.tipper))),
                    Span::styled(format!("#{}  ", t.block), Style::default().fg(DIM)),
                    Span::raw(t.message.clone()),
                ]))
            })
            .collect()
    };
    let title = format!("Recent tips ({} STX)", format_stx(app.recent_total()));
    f.render_widget(List::new(items).block(panel(&title, false)), area);
}

// ===============================
// Footer / Toast
// ===============================
fn footer(f: &mut Frame, area: Rect, app: &App) {
    let keys = match app.input_mode() {
        InputMode::Normal => {
            "c connect  d disconnect  a amount  m message  1-4 presets  s send  r refresh  q quit"
        }
        InputMode::Amount | InputMode::Message => "type to edit  Enter/Esc done",
    };
    f.render_widget(
        Paragraph::new(Span::styled(keys, Style::default().fg(DIM))),
        area,
    );
}

fn draw_toast(f: &mut Frame, app: &App) {
    let Some(msg) = app.toast_message() else {
        return;
    };
    let area = f.area();
    let width = (msg.chars().count() as u16 + 4).min(area.width.saturating_sub(2)).max(10);
    let rect = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(4),
        width: width.min(area.width),
        height: 3.min(area.height),
    };
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(msg)
            .wrap(Wrap { trim: true })
            .block(panel("", true)),
        rect,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Network, DEFAULT_CONTRACT};
    use crate::types::{AppEvent, Tip, TipStats, TxOutcome, WalletState};
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(app: &App) -> String {
        let mut term = Terminal::new(TestBackend::new(110, 30)).unwrap();
        term.draw(|f| draw(f, app)).unwrap();
        let buf = term.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn renders_stats_and_recent_tips() {
        let mut app = App::new(
            Network::Mainnet,
            DEFAULT_CONTRACT.parse().unwrap(),
            1,
            WalletState::connected("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7".into()),
        );
        app.on_event(AppEvent::StatsLoaded(TipStats {
            total_tips: 2,
            total_amount: 1_500_000,
        }));
        app.on_event(AppEvent::RecentTipsLoaded(vec![Tip {
            tipper: "SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWY".into(),
            amount: 1_000_000,
            message: "gm".into(),
            block: 42,
        }]));

        let s = screen(&app);
        assert!(s.contains("1.5 STX"));
        assert!(s.contains("SP2J6Z...9EJ7"));
        assert!(s.contains("SP3E0D...XXWY"));
        assert!(s.contains("gm"));
        assert!(s.contains("[s] Send tip"));
    }

    #[test]
    fn renders_last_transaction_with_explorer_link() {
        let mut app = App::new(
            Network::Mainnet,
            DEFAULT_CONTRACT.parse().unwrap(),
            1,
            WalletState::connected("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7".into()),
        );
        assert!(!screen(&app).contains("Last tx"));

        app.on_event(AppEvent::TipSubmitted(TxOutcome {
            txid: "0xabc123".into(),
        }));
        let s = screen(&app);
        assert!(s.contains("Last tx  0xabc123"));
        assert!(s.contains("https://explorer.hiro.so/txid/0xabc123?chain=mainnet"));
    }

    #[test]
    fn renders_disconnected_placeholder() {
        let app = App::new(
            Network::Testnet,
            DEFAULT_CONTRACT.parse().unwrap(),
            1,
            WalletState::default(),
        );
        let s = screen(&app);
        assert!(s.contains("not connected"));
        assert!(s.contains("No tips yet"));
    }
}
