// src/cli/state.rs
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::widgets::{ListState, TableState};

use crate::cli::api::Client;
use crate::cli::input::LineEdit;
use crate::database::models::{BudgetProgress, Goal, Notification, NotificationStatus, User};
use crate::services::dashboard::DashboardStats;
use crate::services::goals::GoalProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Budgets,
    Goals,
    Notifications,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Overview, Tab::Budgets, Tab::Goals, Tab::Notifications];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Budgets => "Budgets",
            Tab::Goals => "Goals",
            Tab::Notifications => "Notifications",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn shift(self, delta: isize) -> Tab {
        let n = Self::ALL.len() as isize;
        Self::ALL[(self.index() as isize + delta).rem_euclid(n) as usize]
    }
}

#[derive(Default)]
pub struct Data {
    pub overview: Option<DashboardStats>,
    pub budgets: Vec<BudgetProgress>,
    pub goals: Vec<(Goal, GoalProgress)>,
    pub notifications: Vec<Notification>,
}

pub struct App {
    pub api: Client,
    pub tab: Tab,
    pub status: String,
    pub quit: bool,
    /// `None` until an email has been entered.
    pub user: Option<User>,
    pub email: LineEdit,
    pub data: Data,
    pub budget_sel: TableState,
    pub goal_sel: TableState,
    pub note_sel: ListState,
}

impl App {
    pub fn new(api: Client) -> Self {
        Self {
            api,
            tab: Tab::Overview,
            status: "Enter your email and press Enter | Esc to quit".into(),
            quit: false,
            user: None,
            email: LineEdit::default(),
            data: Data::default(),
            budget_sel: TableState::default(),
            goal_sel: TableState::default(),
            note_sel: ListState::default(),
        }
    }

    pub async fn refresh(&mut self) -> anyhow::Result<()> {
        let Some(user) = &self.user else { return Ok(()) };
        let id = user.id;

        self.data = Data {
            overview: Some(self.api.overview(id).await?),
            budgets: self.api.budgets(id).await?,
            goals: self.api.goals(id).await?,
            notifications: self.api.notifications(id).await?,
        };
        clamp(&mut self.budget_sel, self.data.budgets.len());
        clamp(&mut self.goal_sel, self.data.goals.len());
        clamp_list(&mut self.note_sel, self.data.notifications.len());

        let unread = self
            .data
            .notifications
            .iter()
            .filter(|n| n.status == NotificationStatus::Unread)
            .count();
        self.status = format!("{} unread | Tab/←/→ switch | r refresh | q quit", unread);
        Ok(())
    }

    pub async fn handle_key(&mut self, k: KeyEvent) -> anyhow::Result<()> {
        if k.kind != KeyEventKind::Press {
            return Ok(());
        }
        if self.user.is_none() {
            return self.handle_login_input(k).await;
        }

        match k.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Char('r') => {
                if let Err(e) = self.refresh().await {
                    self.status = format!("Refresh failed: {e}");
                }
            }
            KeyCode::Tab | KeyCode::Right => self.tab = self.tab.shift(1),
            KeyCode::BackTab | KeyCode::Left => self.tab = self.tab.shift(-1),
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Enter if self.tab == Tab::Notifications => self.mark_selected_read().await,
            KeyCode::Char('a') if self.tab == Tab::Notifications => self.mark_all_read().await,
            _ => {}
        }
        Ok(())
    }

    async fn handle_login_input(&mut self, k: KeyEvent) -> anyhow::Result<()> {
        match k.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Char(c) => self.email.push(c),
            KeyCode::Backspace => self.email.backspace(),
            KeyCode::Left => self.email.left(),
            KeyCode::Right => self.email.right(),
            KeyCode::Enter => match self.api.find_user(&self.email.value).await? {
                Some(user) => {
                    self.user = Some(user);
                    self.refresh().await?;
                }
                None => {
                    self.status = format!("No user with email {}", self.email.value.trim());
                    self.email.clear();
                }
            },
            _ => {}
        }
        Ok(())
    }

    fn move_selection(&mut self, delta: isize) {
        match self.tab {
            Tab::Overview => {}
            Tab::Budgets => step(&mut self.budget_sel, self.data.budgets.len(), delta),
            Tab::Goals => step(&mut self.goal_sel, self.data.goals.len(), delta),
            Tab::Notifications => {
                let n = self.data.notifications.len();
                if n > 0 {
                    let cur = self.note_sel.selected().unwrap_or(0) as isize;
                    self.note_sel.select(Some((cur + delta).rem_euclid(n as isize) as usize));
                }
            }
        }
    }

    async fn mark_selected_read(&mut self) {
        let (Some(user), Some(idx)) = (&self.user, self.note_sel.selected()) else { return };
        let Some(note) = self.data.notifications.get(idx) else { return };
        let (user_id, id) = (user.id, note.id);

        match self.api.mark_read(user_id, id).await {
            Ok(()) => {
                self.refresh().await.ok();
            }
            Err(e) => self.status = format!("Update failed: {e}"),
        }
    }

    async fn mark_all_read(&mut self) {
        let Some(user) = &self.user else { return };
        match self.api.mark_all_read(user.id).await {
            Ok(n) => {
                self.refresh().await.ok();
                self.status = format!("Marked {n} notifications as read");
            }
            Err(e) => self.status = format!("Update failed: {e}"),
        }
    }
}

fn step(sel: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        sel.select(None);
        return;
    }
    let cur = sel.selected().unwrap_or(0) as isize;
    sel.select(Some((cur + delta).rem_euclid(len as isize) as usize));
}

fn clamp(sel: &mut TableState, len: usize) {
    match (len, sel.selected()) {
        (0, _) => sel.select(None),
        (n, Some(i)) if i >= n => sel.select(Some(n - 1)),
        (_, None) => sel.select(Some(0)),
        _ => {}
    }
}

fn clamp_list(sel: &mut ListState, len: usize) {
    match (len, sel.selected()) {
        (0, _) => sel.select(None),
        (n, Some(i)) if i >= n => sel.select(Some(n - 1)),
        (_, None) => sel.select(Some(0)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_wrap_around() {
        assert_eq!(Tab::Overview.shift(-1), Tab::Notifications);
        assert_eq!(Tab::Notifications.shift(1), Tab::Overview);
        assert_eq!(Tab::Budgets.shift(1), Tab::Goals);
    }

    #[test]
    fn selection_clamps_to_rows() {
        let mut sel = TableState::default();
        clamp(&mut sel, 3);
        assert_eq!(sel.selected(), Some(0));
        step(&mut sel, 3, -1);
        assert_eq!(sel.selected(), Some(2));
        clamp(&mut sel, 2);
        assert_eq!(sel.selected(), Some(1));
        clamp(&mut sel, 0);
        assert_eq!(sel.selected(), None);
    }
}
