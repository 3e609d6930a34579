use rust_decimal::prelude::ToPrimitive;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Tabs},
    Frame,
};

use crate::cli::state::{App, Tab};
use crate::cli::util::{bar, fmt_money};
use crate::database::models::NotificationStatus;

pub fn draw(f: &mut Frame, app: &mut App) {
    // tabs | content | status bar
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(1)])
        .split(f.area());

    let title = match &app.user {
        Some(user) => format!("FinanceFlow - {}", user.name),
        None => "FinanceFlow".to_string(),
    };
    let titles = Tab::ALL.iter().map(|t| Line::from(Span::raw(t.title()))).collect::<Vec<_>>();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(tabs, root[0]);

    match app.tab {
        Tab::Overview => draw_overview(f, root[1], app),
        Tab::Budgets => draw_budgets(f, root[1], app),
        Tab::Goals => draw_goals(f, root[1], app),
        Tab::Notifications => draw_notifications(f, root[1], app),
    }
    f.render_widget(Paragraph::new(app.status.as_str()), root[2]);

    if app.user.is_none() {
        let area = center_rect(root[1], 54, 5);
        f.render_widget(Clear, area);
        let p = Paragraph::new(format!("Email: {}_", app.email.value))
            .block(Block::default().borders(Borders::ALL).title("Sign in"));
        f.render_widget(p, area);
    }
}

fn draw_overview(f: &mut Frame, area: Rect, app: &App) {
    let Some(stats) = &app.data.overview else {
        f.render_widget(Block::default().borders(Borders::ALL).title("Overview"), area);
        return;
    };

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let mut lines = vec![
        format!("Period   : {} .. {}", stats.start_date, stats.end_date),
        format!("Income   : {}", fmt_money(&stats.total_income)),
        format!("Expenses : {}", fmt_money(&stats.total_expense)),
        format!("Net      : {}", fmt_money(&stats.net)),
        format!("Entries  : {}", stats.transaction_count),
        format!("Unread   : {}", stats.unread_notifications),
        String::new(),
        "Spending by category".into(),
    ];
    for share in &stats.expense_by_category {
        lines.push(format!(
            "  {:<18} {:>10} {:>6.1}%",
            share.category,
            fmt_money(&share.amount),
            share.percentage
        ));
    }
    let summary = Paragraph::new(lines.join("\n"))
        .block(Block::default().borders(Borders::ALL).title("This month"));
    f.render_widget(summary, cols[0]);

    let header = Row::new(vec!["Date", "Type", "Category", "Description", "Amount"]);
    let rows: Vec<Row> = stats
        .recent_transactions
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(t.date.to_string()),
                Cell::from(t.kind.as_str()),
                Cell::from(t.category.clone()),
                Cell::from(t.description.clone()),
                Cell::from(fmt_money(&t.amount)),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(11),
        Constraint::Length(8),
        Constraint::Length(16),
        Constraint::Min(10),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Recent transactions"));
    f.render_widget(table, cols[1]);
}

fn draw_budgets(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(vec!["Category", "Budget", "Spent", "Remaining", "Progress"]);
    let rows: Vec<Row> = app
        .data
        .budgets
        .iter()
        .map(|b| {
            let pct = b.progress.to_f64().unwrap_or(0.0);
            Row::new(vec![
                Cell::from(b.budget.category.clone()),
                Cell::from(fmt_money(&b.budget.amount)),
                Cell::from(fmt_money(&b.spent)),
                Cell::from(fmt_money(&b.remaining)),
                Cell::from(format!("{} {}%", bar(pct, 20), b.progress)),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(20),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Min(30),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Budgets (Up/Down)"))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(table, area, &mut app.budget_sel);
}

fn draw_goals(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(vec!["Goal", "Status", "Saved", "Target", "Days", "Progress"]);
    let rows: Vec<Row> = app
        .data
        .goals
        .iter()
        .map(|(g, p)| {
            let track = if p.is_on_track { "on track" } else { "behind" };
            Row::new(vec![
                Cell::from(g.name.clone()),
                Cell::from(format!("{:?}", g.status)),
                Cell::from(fmt_money(&g.current_amount)),
                Cell::from(fmt_money(&g.target_amount)),
                Cell::from(p.days_remaining.to_string()),
                Cell::from(format!("{} {:.0}% {}", bar(p.percentage, 20), p.percentage, track)),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(22),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(6),
        Constraint::Min(30),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Goals (Up/Down)"))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(table, area, &mut app.goal_sel);
}

fn draw_notifications(f: &mut Frame, area: Rect, app: &mut App) {
    let items: Vec<ListItem> = app
        .data
        .notifications
        .iter()
        .map(|n| {
            let marker = if n.status == NotificationStatus::Unread { "*" } else { " " };
            let mut style = Style::default();
            if n.status == NotificationStatus::Unread {
                style = style.add_modifier(Modifier::BOLD);
            }
            ListItem::new(vec![
                Line::styled(format!("{marker} [{}] {}", n.created_at.format("%Y-%m-%d"), n.title), style),
                Line::from(format!("    {}", n.message)),
            ])
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Notifications (Enter=read, a=read all)"),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.note_sel);
}

fn center_rect(rect: Rect, w: u16, h: u16) -> Rect {
    let x = rect.x + rect.width.saturating_sub(w) / 2;
    let y = rect.y + rect.height.saturating_sub(h) / 2;
    Rect { x, y, width: w.min(rect.width), height: h.min(rect.height) }
}
