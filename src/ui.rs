use agroreal::dashboard::{self, CLIENTS_ROUTE, PAYMENTS_ROUTE, PURCHASES_ROUTE};
use agroreal::{
    Client, ColorToken, CurrencyFormatter, HistoryRouter, Ledger, Navigator, Page, Palette,
    Payment, Purchase, PurchaseFilter, RegistryCard,
};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::str::FromStr;

pub const PURCHASE_DETAIL_ROUTE: &str = "/purchases/:id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Clients,
    Purchases,
    PurchasePayments(i64),
    Payments,
}

impl View {
    pub fn from_route(route: &str) -> Self {
        let segments: Vec<&str> = route.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["clients"] => View::Clients,
            ["purchases"] => View::Purchases,
            ["purchases", id] => id
                .parse()
                .map(View::PurchasePayments)
                .unwrap_or(View::Purchases),
            ["payments"] => View::Payments,
            _ => View::Dashboard,
        }
    }

    pub fn title(&self) -> String {
        match self {
            View::Dashboard => "Dashboard".to_string(),
            View::Clients => "Clients".to_string(),
            View::Purchases => "Purchases".to_string(),
            View::PurchasePayments(id) => format!("Purchase #{} - Payments", id),
            View::Payments => "Payments".to_string(),
        }
    }
}

/// Card colors resolved against the terminal's named colors
pub struct TerminalPalette;

impl Palette for TerminalPalette {
    type Color = Color;

    fn resolve(&self, token: &ColorToken) -> Option<Color> {
        Color::from_str(token.as_str()).ok()
    }
}

fn color_of(token: Option<&ColorToken>, fallback: Color) -> Color {
    token.and_then(|t| TerminalPalette.resolve(t)).unwrap_or(fallback)
}

pub struct App {
    pub ledger: Ledger,
    pub formatter: CurrencyFormatter,
    pub recent: u32,
    pub navigator: Navigator<HistoryRouter>,
    pub cards: Vec<RegistryCard>,
    pub selected_card: usize,
    pub clients: Vec<Client>,
    pub purchases: Vec<Purchase>,
    pub payments: Vec<Payment>,
    pub state: TableState,
    pub message: Option<String>,
}

impl App {
    pub fn new(ledger: Ledger, formatter: CurrencyFormatter, recent: u32) -> Result<Self> {
        let router = HistoryRouter::new([
            CLIENTS_ROUTE,
            PURCHASES_ROUTE,
            PURCHASE_DETAIL_ROUTE,
            PAYMENTS_ROUTE,
        ]);

        let mut app = Self {
            ledger,
            formatter,
            recent,
            navigator: Navigator::new(router),
            cards: Vec::new(),
            selected_card: 0,
            clients: Vec::new(),
            purchases: Vec::new(),
            payments: Vec::new(),
            state: TableState::default(),
            message: None,
        };
        app.refresh()?;
        Ok(app)
    }

    pub fn view(&self) -> View {
        View::from_route(&self.navigator.router().current())
    }

    /// Reload whatever the current view shows
    pub fn refresh(&mut self) -> Result<()> {
        match self.view() {
            View::Dashboard => {
                self.cards = dashboard::build_dashboard(&self.ledger, &self.formatter, self.recent)?;
            }
            View::Clients => self.clients = self.ledger.list_clients(Page::all(), false)?,
            View::Purchases => {
                self.purchases = self.ledger.list_purchases(Page::all(), PurchaseFilter::All)?
            }
            View::PurchasePayments(id) => {
                self.payments = self.ledger.purchase_payments(id, Page::all())?
            }
            View::Payments => self.payments = self.ledger.list_payments(Page::all())?,
        }

        let len = self.rows();
        self.state.select(if len == 0 { None } else { Some(0) });
        Ok(())
    }

    fn rows(&self) -> usize {
        match self.view() {
            View::Dashboard => 0,
            View::Clients => self.clients.len(),
            View::Purchases => self.purchases.len(),
            View::PurchasePayments(_) | View::Payments => self.payments.len(),
        }
    }

    /// Where Enter leads from the current selection
    fn target(&self) -> Option<String> {
        match self.view() {
            View::Dashboard => self.cards.get(self.selected_card).map(|c| c.route.clone()),
            View::Purchases => self
                .state
                .selected()
                .and_then(|i| self.purchases.get(i))
                .map(|p| format!("{}/{}", PURCHASES_ROUTE, p.id)),
            _ => None,
        }
    }

    pub async fn open_selected(&mut self) -> Result<()> {
        let Some(route) = self.target() else {
            return Ok(());
        };

        match self.navigator.navigate_to(&route).await {
            Ok(()) => {
                self.message = None;
                self.refresh()
            }
            Err(err) => {
                self.message = Some(err.to_string());
                Ok(())
            }
        }
    }

    pub fn back(&mut self) -> Result<()> {
        self.navigator.router().back()?;
        self.message = None;
        self.refresh()
    }

    pub fn next(&mut self) {
        if self.view() == View::Dashboard {
            if !self.cards.is_empty() {
                self.selected_card = (self.selected_card + 1) % self.cards.len();
            }
            return;
        }

        let len = self.rows();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.view() == View::Dashboard {
            if !self.cards.is_empty() {
                self.selected_card = (self.selected_card + self.cards.len() - 1) % self.cards.len();
            }
            return;
        }

        let len = self.rows();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }
}

pub async fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Enter => app.open_selected().await?,
                KeyCode::Esc | KeyCode::Backspace => app.back()?,
                KeyCode::Char('r') => app.refresh()?,
                KeyCode::Down | KeyCode::Right | KeyCode::Char('j') | KeyCode::Tab => app.next(),
                KeyCode::Up | KeyCode::Left | KeyCode::Char('k') | KeyCode::BackTab => {
                    app.previous()
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with breadcrumb
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.view() {
        View::Dashboard => render_cards(f, chunks[1], app),
        View::Clients => render_clients(f, chunks[1], app),
        View::Purchases => render_purchases(f, chunks[1], app),
        View::PurchasePayments(_) | View::Payments => render_payments(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let route = app.navigator.router().current();

    let spans = vec![
        Span::styled(
            " Agroreal ",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::styled(
            app.view().title(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ),
        Span::raw("  "),
        Span::styled(route, Style::default().fg(Color::DarkGray)),
    ];

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_cards(f: &mut Frame, area: Rect, app: &App) {
    if app.cards.is_empty() {
        return;
    }

    let constraints: Vec<Constraint> = app
        .cards
        .iter()
        .map(|_| Constraint::Ratio(1, app.cards.len() as u32))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (i, (card, column)) in app.cards.iter().zip(columns.iter()).enumerate() {
        render_card(f, *column, card, i == app.selected_card);
    }
}

fn render_card(f: &mut Frame, area: Rect, card: &RegistryCard, selected: bool) {
    let icon_color = card.resolve_icon_color(&TerminalPalette).unwrap_or(Color::White);
    let name_color = color_of(card.name_color.as_ref(), Color::White);
    let card_value_color = color_of(card.value_color.as_ref(), Color::Cyan);

    let mut lines = Vec::new();
    if let Some(subtitle) = &card.subtitle {
        lines.push(Line::from(Span::styled(
            subtitle.clone(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::from(""));
    }

    if card.is_empty() {
        lines.push(Line::from(Span::styled(
            "No records yet",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for entry in card.entries() {
        lines.push(Line::from(Span::styled(
            truncate(&entry.name, 32),
            Style::default().fg(name_color).add_modifier(Modifier::BOLD),
        )));

        let mut detail = vec![Span::styled(
            entry.value.to_string(),
            Style::default().fg(color_of(entry.value_color.as_ref(), card_value_color)),
        )];
        if let Some(complement) = &entry.value_complement {
            detail.push(Span::raw("  "));
            detail.push(Span::styled(complement.clone(), Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(detail));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("→ {}", card.action_label),
        Style::default().fg(if selected { Color::Yellow } else { Color::DarkGray }),
    )));

    let border = if selected { Color::Yellow } else { Color::White };
    let title = match &card.icon {
        Some(icon) => format!(" [{}] {} ", icon, card.title),
        None => format!(" {} ", card.title),
    };

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(Span::styled(title, Style::default().fg(icon_color).add_modifier(Modifier::BOLD))),
    );

    f.render_widget(widget, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_rows(f: &mut Frame, area: Rect, state: &mut TableState, table: Table, title: String) {
    let table = table
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} ", title)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, state);
}

fn inactive_style(active: bool) -> Style {
    if active {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
    }
}

fn render_clients(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.clients.iter().map(|c| {
        Row::new(vec![
            Cell::from(c.id.to_string()),
            Cell::from(truncate(&c.name, 30)),
            Cell::from(c.nickname.clone().unwrap_or_default()),
            Cell::from(c.phone.clone().unwrap_or_default()),
            Cell::from(c.email.clone().unwrap_or_default()),
        ])
        .style(inactive_style(c.is_active))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(32),
            Constraint::Length(14),
            Constraint::Length(16),
            Constraint::Min(20),
        ],
    )
    .header(header_row(&["ID", "Name", "Nickname", "Phone", "Email"]));

    let title = app.view().title();
    render_rows(f, area, &mut app.state, table, title);
}

fn render_purchases(f: &mut Frame, area: Rect, app: &mut App) {
    let formatter = &app.formatter;
    let rows = app.purchases.iter().map(|p| {
        let color = color_of(
            Some(&ColorToken::from(dashboard::status_color(p.status))),
            Color::White,
        );

        Row::new(vec![
            Cell::from(p.note_number.clone()),
            Cell::from(truncate(&p.description, 30)),
            Cell::from(formatter.format(p.total_value)),
            Cell::from(formatter.format(p.total_paid_value)),
            Cell::from(p.status.to_string()).style(Style::default().fg(color)),
        ])
        .style(inactive_style(p.is_active))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(32),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Min(8),
        ],
    )
    .header(header_row(&["Note", "Description", "Total", "Paid", "Status"]));

    let title = app.view().title();
    render_rows(f, area, &mut app.state, table, title);
}

fn render_payments(f: &mut Frame, area: Rect, app: &mut App) {
    let formatter = &app.formatter;
    let rows = app.payments.iter().map(|p| {
        Row::new(vec![
            Cell::from(p.receipt_number.clone()),
            Cell::from(p.purchase_id.to_string()),
            Cell::from(formatter.format(p.amount)).style(Style::default().fg(Color::Green)),
            Cell::from(p.method.clone()),
            Cell::from(
                p.payment_date
                    .unwrap_or(p.created_at)
                    .format("%Y-%m-%d")
                    .to_string(),
            ),
        ])
        .style(inactive_style(p.is_active))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Min(10),
        ],
    )
    .header(header_row(&["Receipt", "Purchase", "Amount", "Method", "Date"]));

    let title = app.view().title();
    render_rows(f, area, &mut app.state, table, title);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if let Some(message) = &app.message {
        status_spans.push(Span::styled(format!(" {} ", message), Style::default().fg(Color::Red)));
        status_spans.push(Span::raw(" | "));
    } else if app.view() != View::Dashboard {
        let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
        status_spans.push(Span::styled(
            format!(" Row: {}/{} ", selected, app.rows()),
            Style::default().fg(Color::Cyan),
        ));
        status_spans.push(Span::raw(" | "));
    }

    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Open | "));
    status_spans.push(Span::styled("Esc", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Back | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("r", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Reload | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
