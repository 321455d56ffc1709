use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use prodle::{
    protocol::{Attribute, Outcome, PlayerProfile},
    session::{GuessAttempt, NoticeKind, Phase},
    timer::Urgency,
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;
const ATTRIBUTE_WIDTH: usize = 14;

const ORANGE: Color = Color::Rgb(255, 107, 53);
const WARNING_RED: Color = Color::Rgb(255, 68, 68);
const GOLD: Color = Color::Rgb(255, 215, 0);

fn outcome_color(outcome: Outcome) -> Color {
    match outcome {
        Outcome::Exact => Color::Green,
        Outcome::Partial => Color::Yellow,
        Outcome::Higher | Outcome::Lower | Outcome::Wrong => Color::Red,
    }
}

/// Cuts `text` to `width` terminal columns, marking the cut with an ellipsis.
fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return format!("{text:width$}");
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    format!("{out:width$}")
}

fn attempt_line(attempt: &GuessAttempt) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut spans = vec![
        Span::styled(fit(&attempt.guessed_name, 16), bold),
        if attempt.correct {
            Span::styled(" ✓ ", bold.fg(Color::Green))
        } else {
            Span::styled(" ✗ ", bold.fg(Color::Red))
        },
    ];
    for attribute in Attribute::ALL {
        let outcome = attempt.comparison.outcome(attribute);
        let value = attribute.value(&attempt.comparison.guessed_player);
        let text = match outcome.arrow() {
            Some(arrow) => format!("{value} {arrow}"),
            None => value,
        };
        spans.push(Span::styled(
            fit(&text, ATTRIBUTE_WIDTH),
            Style::default().fg(outcome_color(outcome)),
        ));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn header_line() -> Line<'static> {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let mut spans = vec![Span::styled(fit("Player", 16), dim), Span::raw("   ")];
    for attribute in Attribute::ALL {
        spans.push(Span::styled(fit(attribute.label(), ATTRIBUTE_WIDTH), dim));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn profile_summary(player: &PlayerProfile) -> String {
    Attribute::ALL
        .iter()
        .map(|a| format!("{}: {}", a.label(), a.value(player)))
        .join(" · ")
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        let progress = session.progress();
        let timer = session.timer();

        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let timer_style = match timer.urgency() {
            Urgency::Normal => bold_style.fg(ORANGE),
            Urgency::Warning => bold_style.fg(WARNING_RED),
            Urgency::Critical => bold_style.fg(Color::Red).add_modifier(Modifier::SLOW_BLINK),
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(area);

        let status = Line::from(vec![
            Span::styled("PRODLE", bold_style.fg(GOLD)),
            Span::styled(format!("  {}  ", session.difficulty()), dim_style),
            Span::raw(format!(
                "Player {}/{}   ",
                progress.current_target_index, progress.total_targets
            )),
            Span::raw(format!("Score: {}   ", progress.score)),
            Span::raw(format!("Found: {}   ", progress.targets_found)),
            Span::styled(timer.formatted(), timer_style),
        ]);
        Paragraph::new(status).render(chunks[0], buf);

        let body = chunks[2];
        match session.phase() {
            Phase::Setup => {
                Paragraph::new(Span::styled("Creating a new game…", italic_style))
                    .alignment(Alignment::Center)
                    .render(body, buf);
            }
            Phase::Countdown => {
                if let Some(count) = session.countdown().current() {
                    let color = if count == 1 { WARNING_RED } else { GOLD };
                    let middle = Rect {
                        y: body.y + body.height / 2,
                        height: 1,
                        ..body
                    };
                    Paragraph::new(Span::styled(count.to_string(), bold_style.fg(color)))
                        .alignment(Alignment::Center)
                        .render(middle, buf);
                }
            }
            Phase::Active | Phase::Transitioning => self.render_board(body, buf),
            Phase::Ended | Phase::Submitted => self.render_end(body, buf),
        }

        let footer = if self.quit_armed {
            Line::from(Span::styled(
                "A game is in progress. Press Esc again to leave.",
                bold_style.fg(Color::Yellow),
            ))
        } else if let Some(notice) = session.notice() {
            let color = match notice.kind {
                NoticeKind::Success => Color::Green,
                NoticeKind::Error => Color::Red,
            };
            Line::from(Span::styled(notice.text.clone(), bold_style.fg(color)))
        } else {
            let help = match session.phase() {
                Phase::Active | Phase::Transitioning => {
                    "enter: guess  ↑/↓: suggestions  tab: complete  esc: quit"
                }
                Phase::Ended => "enter: save score  ctrl+r: play again  esc: quit",
                Phase::Submitted => "r: play again  q: quit",
                Phase::Setup | Phase::Countdown => "esc: quit",
            };
            Line::from(Span::styled(help, dim_style))
        };
        Paragraph::new(footer)
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }
}

impl App {
    fn render_board(&self, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        let suggestions = session.autocomplete().suggestions();
        let suggestion_rows = suggestions.len() as u16;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(suggestion_rows),
                Constraint::Length(2),
                Constraint::Min(1),
            ])
            .split(area);

        let input_style = if session.accepts_guesses() {
            Style::default()
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let title = if session.guess_in_flight() {
            " Checking… "
        } else {
            " Who is it? "
        };
        Paragraph::new(Line::from(vec![
            Span::raw("> "),
            Span::styled(self.input.clone(), input_style),
        ]))
        .block(Block::default().borders(Borders::ALL).title(title))
        .render(chunks[0], buf);

        let lines = suggestions
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if session.autocomplete().selected() == Some(i) {
                    Line::from(Span::styled(
                        format!("  {name}"),
                        Style::default().add_modifier(Modifier::REVERSED),
                    ))
                } else {
                    Line::from(Span::raw(format!("  {name}")))
                }
            })
            .collect::<Vec<_>>();
        Paragraph::new(lines).render(chunks[1], buf);

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let highlight = if session.show_banner() {
            Line::from(Span::styled("Bravo!", bold.fg(Color::Green)))
        } else if let Some(player) = session.revealed() {
            Line::from(vec![
                Span::styled(format!("{} ", player.player_username), bold.fg(Color::Green)),
                Span::raw(profile_summary(player)),
            ])
        } else {
            Line::default()
        };
        Paragraph::new(highlight)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);

        let mut rows = vec![header_line()];
        // newest first
        rows.extend(session.history().iter().rev().map(attempt_line));
        Paragraph::new(rows).render(chunks[3], buf);
    }

    fn render_end(&self, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        let progress = session.progress();
        let bold = Style::default().add_modifier(Modifier::BOLD);

        let mut lines = vec![
            Line::from(Span::styled("Time's up!", bold.fg(GOLD))),
            Line::default(),
            Line::from(Span::styled(format!("Final score: {}", progress.score), bold)),
            Line::from(format!(
                "Players found: {}/{}",
                progress.targets_found, progress.total_targets
            )),
        ];
        if let Some(missed) = session.missed_target() {
            lines.push(Line::from(vec![
                Span::raw("You were looking for "),
                Span::styled(missed.player_username.clone(), bold.fg(Color::Cyan)),
            ]));
        }
        lines.push(Line::default());

        let form = session.score_form();
        match session.phase() {
            Phase::Submitted => {
                lines.push(Line::from(Span::styled(
                    "Score saved!",
                    bold.fg(Color::Green),
                )));
                if let Some(rank) = form.rank {
                    lines.push(Line::from(format!("Leaderboard rank: #{rank}")));
                }
            }
            _ if form.submitting => {
                lines.push(Line::from(Span::styled(
                    "Saving…",
                    Style::default().add_modifier(Modifier::ITALIC),
                )));
            }
            _ => {
                lines.push(Line::from(vec![
                    Span::raw("Your name: "),
                    Span::styled(format!("{}_", self.input), bold),
                ]));
            }
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
