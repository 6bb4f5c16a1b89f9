use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::collections::HashMap;
use std::io;

use crate::connectivity::ManualLink;
use crate::controller::{Confirmation, Gesture, Link, NoticeKind, TaskController};
use crate::editor::LineInput;
use crate::models::{PopupMode, Priority};
use crate::view::Tab;

pub struct App {
    controller: TaskController,
    link_switch: Option<ManualLink>,
    pub list_state: ListState,
    pub popup_mode: PopupMode,
    // New task form
    pub new_name: LineInput,
    pub new_priority: Option<Priority>,
    // Inline rename drafts, keyed by task id
    drafts: HashMap<i64, LineInput>,
    pub should_quit: bool,
}

impl App {
    pub fn new(controller: TaskController) -> Self {
        let link_switch = controller.link_switch();
        let mut app = App {
            controller,
            link_switch,
            list_state: ListState::default(),
            popup_mode: PopupMode::None,
            new_name: LineInput::default(),
            new_priority: None,
            drafts: HashMap::new(),
            should_quit: false,
        };
        app.clamp_selection();
        app
    }

    /// Errors end up in the controller's notice line, which is rendered.
    fn run(&mut self, gesture: Gesture) -> bool {
        let ok = self.controller.dispatch(gesture).is_ok();
        self.clamp_selection();
        ok
    }

    fn clamp_selection(&mut self) {
        let len = self.controller.tasks().len();
        let selected = match self.list_state.selected() {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
        self.list_state.select(selected);
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.list_state
            .selected()
            .and_then(|i| self.controller.tasks().get(i))
            .map(|t| t.id)
    }

    fn editing_selected(&self) -> Option<i64> {
        self.selected_id()
            .filter(|id| self.controller.view().is_editing(*id))
    }

    pub fn next_item(&mut self) {
        let len = self.controller.tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous_item(&mut self) {
        let len = self.controller.tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn switch_tab(&mut self, forward: bool) {
        let current = self.controller.view().tab().index();
        let next = if forward {
            (current + 1) % Tab::ALL.len()
        } else {
            (current + Tab::ALL.len() - 1) % Tab::ALL.len()
        };
        self.run(Gesture::SetTab(next));
    }

    fn start_edit(&mut self, id: i64) {
        let Some(name) = self
            .controller
            .tasks()
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.clone())
        else {
            return;
        };
        if self.run(Gesture::ToggleEdit { id }) && self.controller.view().is_editing(id) {
            self.drafts.insert(id, LineInput::new(&name));
        }
    }

    /// Focus left the field: rename if the draft changed.
    fn commit_edit(&mut self, id: i64) {
        let new_name = self
            .drafts
            .remove(&id)
            .map(|d| d.value().to_string())
            .unwrap_or_default();
        self.run(Gesture::CommitEdit { id, new_name });
    }

    fn abandon_edit(&mut self, id: i64) {
        self.drafts.remove(&id);
        self.run(Gesture::ToggleEdit { id });
    }

    pub fn open_add_popup(&mut self) {
        self.controller.clear_notice();
        self.popup_mode = PopupMode::AddTask;
    }

    pub fn close_popup(&mut self) {
        self.popup_mode = PopupMode::None;
        self.new_name.clear();
        self.new_priority = None;
    }

    fn submit_new_task(&mut self) {
        let gesture = Gesture::Add {
            name: self.new_name.value().to_string(),
            priority: self.new_priority,
        };
        // A rejected task keeps the form open with the message shown.
        if self.run(gesture) {
            self.close_popup();
            let last = self.controller.tasks().len().checked_sub(1);
            self.list_state.select(last);
        }
    }

    fn toggle_link(&mut self) {
        if let Some(switch) = &self.link_switch {
            let online = switch.toggle();
            log::info!("link switched {}", if online { "on" } else { "off" });
            self.run(Gesture::Refresh);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self.popup_mode {
            PopupMode::AddTask => self.handle_add_key(key),
            PopupMode::ConfirmDelete => self.handle_confirm_key(key),
            PopupMode::None => match self.editing_selected() {
                Some(id) => self.handle_edit_key(id, key),
                None => self.handle_normal_key(key),
            },
        }
    }

    fn handle_add_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.close_popup(),
            KeyCode::Enter => self.submit_new_task(),
            KeyCode::Up => self.new_priority = Priority::cycle_back(self.new_priority),
            KeyCode::Down => self.new_priority = Priority::cycle(self.new_priority),
            KeyCode::Left => self.new_name.move_cursor_left(),
            KeyCode::Right => self.new_name.move_cursor_right(),
            KeyCode::Home => self.new_name.move_to_start_of_line(),
            KeyCode::End => self.new_name.move_to_end_of_line(),
            KeyCode::Backspace => self.new_name.delete_char(),
            KeyCode::Delete => self.new_name.delete_forward(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.new_name.insert_char(c)
            }
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let confirmation = match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Confirmation::Confirmed,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Confirmation::Cancelled,
            _ => return,
        };
        self.popup_mode = PopupMode::None;
        self.run(Gesture::ResolveDelete(confirmation));
    }

    fn handle_edit_key(&mut self, id: i64, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.commit_edit(id),
            KeyCode::Esc => self.abandon_edit(id),
            KeyCode::Up => {
                self.commit_edit(id);
                self.previous_item();
            }
            KeyCode::Down => {
                self.commit_edit(id);
                self.next_item();
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.commit_edit(id);
                self.switch_tab(key.code == KeyCode::Tab);
            }
            _ => {
                if let Some(draft) = self.drafts.get_mut(&id) {
                    match key.code {
                        KeyCode::Left => draft.move_cursor_left(),
                        KeyCode::Right => draft.move_cursor_right(),
                        KeyCode::Home => draft.move_to_start_of_line(),
                        KeyCode::End => draft.move_to_end_of_line(),
                        KeyCode::Backspace => draft.delete_char(),
                        KeyCode::Delete => draft.delete_forward(),
                        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                            draft.insert_char(c)
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.switch_tab(true),
            KeyCode::BackTab => self.switch_tab(false),
            KeyCode::Char(c @ '1'..='3') => {
                let index = c as usize - '1' as usize;
                self.run(Gesture::SetTab(index));
            }
            KeyCode::Down | KeyCode::Char('j') => self.next_item(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_item(),
            KeyCode::Char('a') => self.open_add_popup(),
            KeyCode::Char(' ') | KeyCode::Char('x') => {
                let selected = self.list_state.selected();
                if let Some(task) = selected.and_then(|i| self.controller.tasks().get(i)) {
                    let gesture = Gesture::ToggleStatus {
                        id: task.id,
                        checked: !task.status.is_complete(),
                    };
                    self.run(gesture);
                }
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = self.selected_id() {
                    self.start_edit(id);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    if self.run(Gesture::Delete { id }) {
                        self.popup_mode = PopupMode::ConfirmDelete;
                    }
                }
            }
            KeyCode::Char('f') => {
                let next = Priority::cycle(self.controller.view().priority_filter());
                self.run(Gesture::SetPriorityFilter(next));
            }
            KeyCode::Char('F') => {
                let next = Priority::cycle_back(self.controller.view().priority_filter());
                self.run(Gesture::SetPriorityFilter(next));
            }
            KeyCode::Char('o') => self.toggle_link(),
            KeyCode::Char('s') => {
                self.run(Gesture::SyncNow);
            }
            KeyCode::Char('r') => {
                self.run(Gesture::Refresh);
            }
            _ => {}
        }
    }
}

pub fn run_tui(controller: TaskController) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(controller);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        log::warn!("tui exited with error: {:?}", err);
    }
    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Tasker"))
        .select(app.controller.view().tab().index())
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::Black),
        );
    f.render_widget(tabs, chunks[0]);

    render_filter(f, app, chunks[1]);
    render_tasks(f, app, chunks[2]);
    render_status(f, app, chunks[3]);

    match app.popup_mode {
        PopupMode::AddTask => render_add_popup(f, app),
        PopupMode::ConfirmDelete => render_confirm_popup(f, app),
        PopupMode::None => {}
    }
}

// Helper function to create centered rectangles for popups
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

fn priority_label(priority: Option<Priority>, none: &'static str) -> Span<'static> {
    Span::styled(
        priority.map_or(none, Priority::as_str),
        Style::default().fg(Priority::color(priority)),
    )
}

fn input_spans(input: &LineInput) -> Vec<Span<'static>> {
    let (before, under, after) = input.split_at_cursor();
    vec![
        Span::raw(before),
        Span::styled(under, Style::default().bg(Color::Cyan).fg(Color::Black)),
        Span::raw(after),
    ]
}

fn render_filter(f: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::raw(" Priority filter: "),
        priority_label(app.controller.view().priority_filter(), "All priorities"),
        Span::styled("  (f/F to change)", Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(area);

    let view_models = app.controller.view_models();
    let items: Vec<ListItem> = view_models
        .iter()
        .map(|task| {
            let checkbox = if task.status.is_complete() { "[x] " } else { "[ ] " };
            let mut spans = vec![Span::raw(checkbox)];
            match app.drafts.get(&task.id).filter(|_| task.is_editing) {
                Some(draft) => spans.extend(input_spans(draft)),
                None => {
                    let style = if task.status.is_complete() {
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::CROSSED_OUT)
                    } else {
                        Style::default().fg(Color::White)
                    };
                    spans.push(Span::styled(task.name.clone(), style));
                }
            }
            spans.push(Span::raw(" "));
            spans.push(Span::styled("●", Style::default().fg(task.priority_color)));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = format!("Tasks ({})", view_models.len());
    let tasks_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(tasks_list, chunks[0], &mut app.list_state);

    let controls = "Controls:\n• a: Add task\n• Space: Toggle done\n• e/Enter: Rename\n• d: Delete\n• Tab/1-3: Switch tab\n• f/F: Priority filter\n• o: Toggle link\n• s: Sync now\n• q: Quit";
    let selected = app
        .list_state
        .selected()
        .and_then(|i| view_models.get(i));
    let mut info_text = match selected {
        Some(task) => format!(
            "Task: {}\nStatus: {}\nPriority: {}\n\n{}",
            task.name, task.status, task.priority_tooltip, controls
        ),
        None => format!("No task selected\n\n{}", controls),
    };
    if app.controller.link() == Link::Offline && !app.controller.offline().is_empty() {
        info_text.push_str("\n\nPending:");
        for queued in app.controller.offline().pending() {
            info_text.push_str(&format!(
                "\n• {} {}",
                queued.queued_at.format("%H:%M"),
                queued.op
            ));
        }
    }

    let info_paragraph = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title("Task Info"))
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));

    f.render_widget(info_paragraph, chunks[1]);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let controller = &app.controller;
    let link = match controller.link() {
        Link::Online => Span::styled(" Online ", Style::default().fg(Color::Black).bg(Color::Green)),
        Link::Offline => {
            let pending = controller.offline().len();
            let since = controller
                .offline()
                .oldest()
                .map(|t| format!(" since {}", t.format("%H:%M")))
                .unwrap_or_default();
            Span::styled(
                format!(
                    " Offline: {} pending{} [{}] ",
                    pending,
                    since,
                    controller.sync_policy()
                ),
                Style::default().fg(Color::Black).bg(Color::Yellow),
            )
        }
    };

    let mut spans = vec![link];
    if let Some(notice) = controller.notice() {
        let color = match notice.kind {
            NoticeKind::Info => Color::White,
            NoticeKind::Error => Color::Red,
        };
        spans.push(Span::styled(format!(" {}", notice.text), Style::default().fg(color)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_add_popup(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(60, 30, f.area());
    let block = Block::default()
        .title("New Task")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::DarkGray));

    let mut name_line = vec![Span::raw("Name: ")];
    name_line.extend(input_spans(&app.new_name));

    let mut lines = vec![
        Line::from(name_line),
        Line::from(vec![
            Span::raw("Priority: "),
            priority_label(app.new_priority, "Select a priority"),
            Span::raw("  (↑/↓)"),
        ]),
        Line::from(""),
    ];
    if let Some(notice) = app.controller.notice() {
        if notice.kind == NoticeKind::Error {
            lines.push(Line::from(Span::styled(
                notice.text.clone(),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines.push(Line::from("Press ENTER to add, ESC to cancel"));

    let content = Paragraph::new(lines)
        .block(block)
        .style(Style::default().fg(Color::White));

    f.render_widget(Clear, popup_area);
    f.render_widget(content, popup_area);
}

fn render_confirm_popup(f: &mut Frame, app: &App) {
    let Some(pending) = app.controller.pending_delete() else {
        return;
    };
    let popup_area = centered_rect(50, 20, f.area());
    let block = Block::default()
        .title("Confirm")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::DarkGray));
    let content = Paragraph::new(format!(
        "Delete task '{}'?\n\ny: Confirm    n/ESC: Cancel",
        pending.name
    ))
    .block(block)
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: false })
    .style(Style::default().fg(Color::White));

    f.render_widget(Clear, popup_area);
    f.render_widget(content, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::AlwaysOnline;
    use crate::database::Database;
    use crate::offline::SyncPolicy;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        let controller = TaskController::new(
            Database::open_in_memory().unwrap(),
            Box::new(AlwaysOnline),
            SyncPolicy::BestEffort,
        )
        .unwrap();
        App::new(controller)
    }

    fn manual_app() -> (App, ManualLink) {
        let link = ManualLink::new(true);
        let controller = TaskController::new(
            Database::open_in_memory().unwrap(),
            Box::new(link.clone()),
            SyncPolicy::BestEffort,
        )
        .unwrap();
        (App::new(controller), link)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add_task(app: &mut App, name: &str, priority_steps: usize) {
        press(app, KeyCode::Char('a'));
        type_text(app, name);
        for _ in 0..priority_steps {
            press(app, KeyCode::Down);
        }
        press(app, KeyCode::Enter);
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn names(app: &App) -> Vec<String> {
        app.controller.tasks().iter().map(|t| t.name.clone()).collect()
    }

    #[test]
    fn add_form_creates_a_task() {
        let mut app = app();
        add_task(&mut app, "Buy milk", 3);
        assert_eq!(app.popup_mode, PopupMode::None);
        assert_eq!(names(&app), vec!["Buy milk"]);
        assert_eq!(app.controller.tasks()[0].priority, Some(Priority::Alta));
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn add_form_without_priority_stays_open() {
        let mut app = app();
        add_task(&mut app, "Buy milk", 0);
        assert_eq!(app.popup_mode, PopupMode::AddTask);
        assert!(names(&app).is_empty());
        assert!(render(&mut app).contains("select a priority for the task"));

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.popup_mode, PopupMode::None);
        assert_eq!(app.new_name.value(), "");
    }

    #[test]
    fn space_toggles_and_tab_requeries() {
        let mut app = app();
        add_task(&mut app, "Walk", 1);
        add_task(&mut app, "Read", 2);

        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.controller.tasks()[0].status.is_complete());

        press(&mut app, KeyCode::Char('2'));
        assert_eq!(names(&app), vec!["Read"]);
        press(&mut app, KeyCode::Tab);
        assert_eq!(names(&app), vec!["Walk"]);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.controller.view().tab(), Tab::All);
    }

    #[test]
    fn inline_edit_commits_on_blur() {
        let mut app = app();
        add_task(&mut app, "Walk", 1);
        add_task(&mut app, "Read", 1);
        press(&mut app, KeyCode::Up);

        press(&mut app, KeyCode::Char('e'));
        assert!(app.controller.view().is_editing(app.selected_id().unwrap()));
        // 'q' goes into the draft instead of quitting.
        press(&mut app, KeyCode::End);
        type_text(&mut app, "ing q");
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Down);

        assert_eq!(names(&app), vec!["Walking q", "Read"]);
        assert_eq!(app.list_state.selected(), Some(1));
        assert!(app.controller.view_models().iter().all(|vm| !vm.is_editing));
    }

    #[test]
    fn escape_abandons_the_edit() {
        let mut app = app();
        add_task(&mut app, "Walk", 1);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Esc);
        assert_eq!(names(&app), vec!["Walk"]);
        assert!(!app.controller.view().is_editing(app.selected_id().unwrap()));
    }

    #[test]
    fn delete_asks_first() {
        let mut app = app();
        add_task(&mut app, "Walk", 1);

        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.popup_mode, PopupMode::ConfirmDelete);
        assert!(render(&mut app).contains("Delete task 'Walk'?"));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(names(&app), vec!["Walk"]);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert!(names(&app).is_empty());
        assert_eq!(app.list_state.selected(), None);
    }

    #[test]
    fn filter_key_cycles_priorities() {
        let mut app = app();
        add_task(&mut app, "Low", 1);
        add_task(&mut app, "High", 3);
        press(&mut app, KeyCode::Char('f'));
        assert_eq!(names(&app), vec!["Low"]);
        press(&mut app, KeyCode::Char('F'));
        assert_eq!(names(&app), vec!["Low", "High"]);
        press(&mut app, KeyCode::Char('F'));
        assert_eq!(names(&app), vec!["High"]);
    }

    #[test]
    fn link_toggle_shows_offline_state() {
        let (mut app, _link) = manual_app();
        press(&mut app, KeyCode::Char('o'));
        assert_eq!(app.controller.link(), Link::Offline);
        add_task(&mut app, "Later", 2);
        let screen = render(&mut app);
        assert!(screen.contains("Offline: 1 pending"));
        assert!(screen.contains("[best-effort]"));
        assert!(screen.contains("insert 'Later'"));

        press(&mut app, KeyCode::Char('o'));
        assert_eq!(app.controller.link(), Link::Online);
        assert!(app.controller.offline().is_empty());
        assert_eq!(names(&app), vec!["Later"]);
    }

    #[test]
    fn edit_started_offline_commits_after_the_link_returns() {
        let (mut app, link) = manual_app();
        press(&mut app, KeyCode::Char('o'));
        add_task(&mut app, "Draft", 2);
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "ed");

        link.set_online(true);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.controller.link(), Link::Online);
        assert_eq!(names(&app), vec!["Drafted"]);
        assert!(app.controller.tasks()[0].id > 0);
        assert!(app.controller.view_models().iter().all(|vm| !vm.is_editing));
    }

    #[test]
    fn renders_tabs_tasks_and_priority_tooltip() {
        let mut app = app();
        add_task(&mut app, "Buy milk", 2);
        let screen = render(&mut app);
        assert!(screen.contains("In progress"));
        assert!(screen.contains("[ ] Buy milk"));
        assert!(screen.contains("Medium priority"));
        assert!(screen.contains("All priorities"));
        assert!(screen.contains("Online"));
    }

    #[test]
    fn quit_key_stops_the_loop() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
