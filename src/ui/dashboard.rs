// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine le tableau des cours et le calculateur avec les widgets de ratatui
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Widgets : composants UI (Block, Paragraph, List)
// 3. Layout : découpage de l'espace en zones
// 4. Style : couleurs tirées de la Palette du thème courant
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, SelectorFocus};
use crate::display::{BoardState, RateCard, RateQuote};
use crate::ui::theme::Palette;

/// Dessine l'interface complète
///
/// Le mode AmountInput garde le même écran : seul le footer et le curseur
/// du calculateur changent.
pub fn render(frame: &mut Frame, app: &App) {
    let palette = app.theme.palette();
    let size = frame.size();

    // Fond du thème sur toute la surface
    frame.render_widget(Block::default().style(Style::default().bg(palette.background)), size);

    let chunks = create_layout(size);
    render_header(frame, app, &palette, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(chunks[1]);

    render_board(frame, app, &palette, columns[0]);
    render_calculator(frame, app, &palette, columns[1]);

    if app.is_in_amount_input() {
        render_input_footer(frame, app, &palette, chunks[2]);
    } else {
        render_footer(frame, app, &palette, chunks[2]);
    }
}

/// Crée le layout principal (header, content, footer)
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Tableau + calculateur
            Constraint::Length(4), // Footer
        ])
        .split(area)
        .to_vec()
}

fn bordered<'a>(palette: &Palette, title: &'a str) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(title)
}

// ============================================================================
// Header : titre, source et heure du chargement
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let block = bordered(palette, " Kursboard ").title_alignment(Alignment::Center);

    let status = if app.is_loading_data() {
        Span::styled(
            format!("⏳ {}", app.loading_message.as_deref().unwrap_or("Загрузка курсов...")),
            Style::default().fg(palette.warning).add_modifier(Modifier::BOLD),
        )
    } else {
        match app.rates.origin {
            Some(origin) => Span::styled(
                format!(
                    "Источник : {}  •  обновлено {}",
                    origin.label(),
                    app.rates.loaded_at.format("%d.%m.%Y %H:%M:%S")
                ),
                Style::default().fg(palette.muted),
            ),
            None => Span::styled("Курсы не загружены", Style::default().fg(palette.error)),
        }
    };

    let line = Line::from(vec![
        Span::styled(
            "Курсы валют  ",
            Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
        ),
        status,
        Span::styled(format!("  •  {}", app.theme.label()), Style::default().fg(palette.muted)),
    ]);

    let paragraph = Paragraph::new(line).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tableau des cours
// ============================================================================

fn render_board(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let block = bordered(palette, " Покупка / Продажа ");

    let cards = match app.board_state() {
        BoardState::Cards(cards) => cards,
        BoardState::Unavailable { message, phone } => {
            let text = vec![
                Line::from(""),
                Line::from(Span::styled(
                    message,
                    Style::default().fg(palette.error).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(phone, Style::default().fg(palette.accent))),
            ];
            let paragraph = Paragraph::new(text)
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }
    };

    let items: Vec<ListItem> = cards
        .iter()
        .enumerate()
        .map(|(index, card)| {
            let mut item = ListItem::new(card_line(card, palette));
            if index == app.selected_index {
                item = item.style(
                    Style::default()
                        .bg(palette.selection)
                        .add_modifier(Modifier::BOLD),
                );
            }
            item
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

/// Une ligne du tableau : ticker, nom, achat, vente (ou invitation à appeler)
fn card_line<'a>(card: &'a RateCard, palette: &Palette) -> Line<'a> {
    let mut spans = vec![
        Span::styled(
            format!(" [{}] ", card.flag_region.to_uppercase()),
            Style::default().fg(palette.muted),
        ),
        Span::styled(
            format!("{:<4}", card.label),
            Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {:<24}", card.display_name), Style::default().fg(palette.muted)),
    ];

    let (buy, sell) = card.quote.buy_sell();
    spans.push(Span::styled(format!("{:>12}", buy), Style::default().fg(palette.buy)));
    spans.push(Span::styled(format!("{:>12}", sell), Style::default().fg(palette.sell)));

    if let RateQuote::CallForRate { prompt, phone, .. } = &card.quote {
        spans.push(Span::styled(
            format!("  {} {}", prompt, phone),
            Style::default().fg(palette.accent),
        ));
    }

    Line::from(spans)
}

// ============================================================================
// Calculateur
// ============================================================================

fn render_calculator(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let block = bordered(palette, " Калькулятор ");

    let amount_style = if app.is_in_amount_input() {
        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.text)
    };

    let mut amount_spans = vec![
        Span::styled("Сумма : ", Style::default().fg(palette.muted)),
        Span::styled(app.calculator.amount_text.clone(), amount_style),
    ];
    if app.is_in_amount_input() {
        amount_spans.push(Span::styled(
            "█",
            Style::default().fg(palette.text).add_modifier(Modifier::SLOW_BLINK),
        ));
    }

    let text = vec![
        Line::from(""),
        Line::from(amount_spans),
        Line::from(""),
        selector_line(app, palette, "Из   : ", &app.calculator.from_code, SelectorFocus::From),
        selector_line(app, palette, "В    : ", &app.calculator.to_code, SelectorFocus::To),
        Line::from(""),
        Line::from(vec![
            Span::styled("Итого : ", Style::default().fg(palette.muted)),
            Span::styled(
                app.conversion().to_string(),
                Style::default().fg(palette.buy).add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn selector_line<'a>(
    app: &App,
    palette: &Palette,
    prefix: &'a str,
    code: &str,
    focus: SelectorFocus,
) -> Line<'a> {
    let label = app
        .rates
        .list
        .find(code)
        .map(|record| format!("{} · {}", record.display_code(), record.display_name))
        .unwrap_or_else(|| code.to_string());

    let style = if app.focus == focus {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(palette.text)
    };

    Line::from(vec![
        Span::styled(prefix, Style::default().fg(palette.muted)),
        Span::styled(format!("◀ {} ▶", label), style),
    ])
}

// ============================================================================
// Footer : raccourcis ou confirmation
// ============================================================================

fn key_span<'a>(key: &'a str, palette: &Palette) -> Span<'a> {
    Span::styled(key, Style::default().fg(palette.accent).add_modifier(Modifier::BOLD))
}

fn render_footer(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border));

    let lines = if app.is_awaiting_quit_confirmation() {
        vec![Line::from(vec![
            Span::styled(
                "⚠  Нажмите ",
                Style::default().fg(palette.warning).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "[q]",
                Style::default()
                    .fg(palette.error)
                    .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
            ),
            Span::styled(
                " ещё раз для выхода, любая другая клавиша отменит ⚠",
                Style::default().fg(palette.warning).add_modifier(Modifier::BOLD),
            ),
        ])]
    } else {
        vec![
            Line::from(vec![
                key_span("[q]", palette),
                Span::raw(" Выход  "),
                key_span("[↑↓ / j k]", palette),
                Span::raw(" Выбор  "),
                key_span("[Enter]", palette),
                Span::raw(" В калькулятор  "),
                key_span("[r]", palette),
                Span::raw(" Обновить  "),
                key_span("[t]", palette),
                Span::raw(" Тема"),
            ]),
            Line::from(vec![
                key_span("[a]", palette),
                Span::raw(" Сумма  "),
                key_span("[Tab]", palette),
                Span::raw(" Из/В  "),
                key_span("[← → / h l]", palette),
                Span::raw(" Валюта  "),
                key_span("[s]", palette),
                Span::raw(" Поменять"),
            ]),
        ]
    };

    let paragraph = Paragraph::new(lines).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn render_input_footer(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.buy));

    let input_line = Line::from(vec![
        Span::styled("Сумма : ", Style::default().fg(palette.border).add_modifier(Modifier::BOLD)),
        Span::styled(app.calculator.amount_text.clone(), Style::default().fg(palette.text)),
        Span::styled("█", Style::default().fg(palette.text).add_modifier(Modifier::SLOW_BLINK)),
    ]);

    let help_line = Line::from(vec![
        Span::styled("[Enter]", Style::default().fg(palette.buy).add_modifier(Modifier::BOLD)),
        Span::raw(" Готово  "),
        Span::styled("[ESC]", Style::default().fg(palette.error).add_modifier(Modifier::BOLD)),
        Span::raw(" Отмена"),
    ]);

    let paragraph = Paragraph::new(vec![input_line, help_line])
        .block(block)
        .alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tests : rendu sur un backend de test
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    use crate::api::{hardcoded_list, LoadedRates, RateOrigin};

    fn draw(app: &App) -> Buffer {
        let backend = TestBackend::new(180, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        terminal.backend().buffer().clone()
    }

    fn buffer_text(buffer: &Buffer) -> String {
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_renders_unavailable_state() {
        let text = buffer_text(&draw(&App::new()));
        assert!(text.contains("Позвоните нам"));
        assert!(text.contains("626-99-99"));
    }

    #[test]
    fn test_renders_board_and_result() {
        let mut app = App::with_rates(Arc::new(LoadedRates::new(hardcoded_list(), RateOrigin::Bundled)));
        app.calculator.amount_text = "100".to_string();

        let text = buffer_text(&draw(&app));
        assert!(text.contains("95.50 ₽"));
        assert!(text.contains("Уточняйте курс по телефону"));
        assert!(text.contains("9780.00 RUB"));
        assert!(text.contains("резервные данные"));
    }
}
