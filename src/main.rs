use std::cell::RefCell;
use std::fs::File;
use std::io::{self, stdout, Stdout};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use env_logger::{Env, Target};
use log::{debug, info};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use twenty48::config::GameConfig;
use twenty48::game::{
    Actuator, DedupSubmitter, Direction, GameSession, Input, RandomSource, ScoreReport,
    ScoreSubmitter, SeededRandom, Snapshot, ThreadRandom, DEFAULT_SIZE,
};
use twenty48::storage::{FileStorage, Leaderboard, LeaderboardEntry};

// ============================================================================
// Command Line
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "twenty48", about = "Play 2048 in the terminal")]
struct Cli {
    /// Board side length
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    size: usize,
    /// Directory for the saved game, best score and leaderboard
    #[arg(long, default_value = ".")]
    state_dir: PathBuf,
    /// Seed for reproducible tile spawns
    #[arg(long)]
    seed: Option<u64>,
    /// Log file (defaults to twenty48.log in the state directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

// ============================================================================
// Visual Constants
// ============================================================================

const CELL_WIDTH: u16 = 8;
const CELL_HEIGHT: u16 = 3;
const INFO_WIDTH: u16 = 20;

// ============================================================================
// Color Mapping
// ============================================================================

fn tile_style(value: u32) -> Style {
    let (bg, fg) = match value {
        2 => (Color::Rgb(238, 228, 218), Color::Rgb(119, 110, 101)),
        4 => (Color::Rgb(237, 224, 200), Color::Rgb(119, 110, 101)),
        8 => (Color::Rgb(242, 177, 121), Color::White),
        16 => (Color::Rgb(245, 149, 99), Color::White),
        32 => (Color::Rgb(246, 124, 95), Color::White),
        64 => (Color::Rgb(246, 94, 59), Color::White),
        128 => (Color::Rgb(237, 207, 114), Color::White),
        256 => (Color::Rgb(237, 204, 97), Color::White),
        512 => (Color::Rgb(237, 200, 80), Color::White),
        1024 => (Color::Rgb(237, 197, 63), Color::White),
        2048 => (Color::Rgb(237, 194, 46), Color::White),
        _ => (Color::Rgb(60, 58, 50), Color::White),
    };
    Style::default().bg(bg).fg(fg).add_modifier(Modifier::BOLD)
}

fn empty_style() -> Style {
    Style::default().bg(Color::Rgb(205, 193, 180))
}

// ============================================================================
// Host Sinks
// ============================================================================

/// Keeps the latest frame for the draw loop.
#[derive(Clone, Default)]
struct FrameSlot(Rc<RefCell<Option<Snapshot>>>);

impl Actuator for FrameSlot {
    fn actuate(&mut self, snapshot: &Snapshot) {
        *self.0.borrow_mut() = Some(snapshot.clone());
    }
}

/// Writes reported scores to the local leaderboard.
struct LeaderboardSink {
    leaderboard: Leaderboard,
    top: Rc<RefCell<Vec<LeaderboardEntry>>>,
}

impl ScoreSubmitter for LeaderboardSink {
    fn submit(&mut self, report: ScoreReport) {
        info!("final score {} ({:?})", report.final_score, report.outcome);
        self.leaderboard.submit(report);
        if let Ok(entries) = self.leaderboard.entries() {
            *self.top.borrow_mut() = entries;
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(frame: &mut Frame, snapshot: &Snapshot, top: &[LeaderboardEntry]) {
    let area = frame.size();
    let size = snapshot.grid.size() as u16;
    let board_width = size * CELL_WIDTH + 2;
    let board_height = size * CELL_HEIGHT + 2;

    let main_area = centered_rect(board_width + INFO_WIDTH, board_height + 2, area);
    let vertical = Layout::vertical([
        Constraint::Length(board_height),
        Constraint::Fill(1),
    ])
    .split(main_area);
    let horizontal = Layout::horizontal([
        Constraint::Length(board_width),
        Constraint::Length(INFO_WIDTH),
    ])
    .split(vertical[0]);

    render_board(frame, snapshot, horizontal[0]);
    render_info(frame, snapshot, top, horizontal[1]);

    let controls_area = Rect {
        x: area.x,
        y: vertical[0].y + vertical[0].height,
        width: area.width,
        height: 1,
    };
    if controls_area.y < area.height {
        let controls = Paragraph::new(Line::from(
            "Arrows/WASD/HJKL: Move | R: Restart | C: Keep playing | Q/ESC: Quit",
        ))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(controls, controls_area);
    }

    if snapshot.terminated {
        render_banner(frame, snapshot, area);
    }
}

fn render_board(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" 2048 ")
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = CELL_WIDTH as usize;
    let mut lines: Vec<Line> = Vec::new();
    for row in snapshot.grid.rows() {
        for line in 0..CELL_HEIGHT {
            let spans: Vec<Span> = row
                .iter()
                .map(|cell| match cell {
                    Some(value) if line == CELL_HEIGHT / 2 => {
                        Span::styled(format!("{:^width$}", value, width = width), tile_style(*value))
                    }
                    Some(value) => Span::styled(" ".repeat(width), tile_style(*value)),
                    None => Span::styled(" ".repeat(width), empty_style()),
                })
                .collect();
            lines.push(Line::from(spans));
        }
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_info(frame: &mut Frame, snapshot: &Snapshot, top: &[LeaderboardEntry], area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Info ")
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        Line::from(Span::styled("Score", Style::default().fg(Color::Yellow))),
        Line::from(format!("{}", snapshot.score)),
        Line::from(""),
        Line::from(Span::styled("Best", Style::default().fg(Color::Cyan))),
        Line::from(format!("{}", snapshot.best_score)),
        Line::from(""),
        Line::from(Span::styled("Top scores", Style::default().fg(Color::Green))),
    ];
    for (rank, entry) in top.iter().take(5).enumerate() {
        lines.push(Line::from(format!("{}. {}", rank + 1, entry.score)));
    }

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

fn render_banner(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let (title, color, hint) = if snapshot.over {
        ("Game over!", Color::Red, "Press R to try again")
    } else {
        ("You win!", Color::Yellow, "C: keep going | R: new game")
    };

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(title, Style::default().fg(color))),
        Line::from(""),
        Line::from(format!("Score: {}", snapshot.score)),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(paragraph, centered_rect(30, 8, area));
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let horizontal = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width.min(area.width)),
        Constraint::Fill(1),
    ])
    .split(area);

    let vertical = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(area.height)),
        Constraint::Fill(1),
    ])
    .split(horizontal[1]);

    vertical[1]
}

// ============================================================================
// Input
// ============================================================================

enum Command {
    Game(Input),
    Quit,
}

fn map_key(code: KeyCode, modifiers: KeyModifiers) -> Option<Command> {
    if code == KeyCode::Esc {
        return Some(Command::Quit);
    }
    // Modified keys belong to the terminal, not the game
    if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) {
        return None;
    }
    let direction = match code {
        KeyCode::Up => Direction::Up,
        KeyCode::Right => Direction::Right,
        KeyCode::Down => Direction::Down,
        KeyCode::Left => Direction::Left,
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'w' | 'k' => Direction::Up,
            'd' | 'l' => Direction::Right,
            's' | 'j' => Direction::Down,
            'a' | 'h' => Direction::Left,
            'r' => return Some(Command::Game(Input::Restart)),
            'c' => return Some(Command::Game(Input::KeepPlaying)),
            'q' => return Some(Command::Quit),
            _ => return None,
        },
        _ => return None,
    };
    Some(Command::Game(Input::Move(direction)))
}

// ============================================================================
// Main Loop
// ============================================================================

fn init_logging(cli: &Cli) -> Result<()> {
    let path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| cli.state_dir.join("twenty48.log"));
    let file = File::create(&path).with_context(|| format!("opening log file {}", path.display()))?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut GameSession,
    frames: &FrameSlot,
    top: &Rc<RefCell<Vec<LeaderboardEntry>>>,
) -> Result<()> {
    loop {
        if let Some(snapshot) = frames.0.borrow().as_ref() {
            let top = top.borrow();
            terminal.draw(|frame| render(frame, snapshot, &top))?;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match map_key(key.code, key.modifiers) {
                Some(Command::Quit) => return Ok(()),
                Some(Command::Game(input)) => {
                    session.handle(input);
                    for event in session.take_events() {
                        debug!("{:?}", event);
                    }
                }
                None => {}
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.state_dir)
        .with_context(|| format!("creating state directory {}", cli.state_dir.display()))?;
    init_logging(&cli)?;

    let config = GameConfig::with_size(cli.size);
    let random: Box<dyn RandomSource> = match cli.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    };
    let storage = FileStorage::new(&cli.state_dir);
    let leaderboard = Leaderboard::in_dir(&cli.state_dir);

    let top = Rc::new(RefCell::new(leaderboard.entries().unwrap_or_default()));
    let frames = FrameSlot::default();

    let mut session = GameSession::new(config, Box::new(storage), random).context("starting game")?;
    session.add_score_submitter(Box::new(DedupSubmitter::new(LeaderboardSink {
        leaderboard,
        top: Rc::clone(&top),
    })));
    session.subscribe(Box::new(frames.clone()));
    info!("started {}x{} game in {}", cli.size, cli.size, cli.state_dir.display());

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut session, &frames, &top);

    // Restore terminal
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result
}
