use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 棋盘格子索引（0-8，行优先：index = row*3 + col）。
pub type CellIndex = usize;

/// 一条获胜连线：三个格子索引。
pub type Line = [CellIndex; 3];

/// 3×3 棋盘的全部获胜连线：三行、三列、两条对角线。固定不变。
pub const WIN_LINES: [Line; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// 执子方。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl FromStr for Mark {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Mark::X),
            "o" => Ok(Mark::O),
            _ => Err(()),
        }
    }
}

/// 单个格子：空，或已被某方占据。
pub type Cell = Option<Mark>;

/// 3×3 棋盘快照。落子不修改原棋盘，而是生成新快照。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; 9],
}

impl Board {
    pub const SIZE: usize = 9;

    pub fn empty() -> Self {
        Self { cells: [None; 9] }
    }

    pub fn cell(&self, index: CellIndex) -> Cell {
        self.cells[index]
    }

    /// 在指定格子落子，返回新快照。已占格子属于调用方违约。
    pub fn with_move(mut self, index: CellIndex, mark: Mark) -> Board {
        debug_assert!(
            self.cells[index].is_none(),
            "cell {index} is already occupied"
        );
        self.cells[index] = Some(mark);
        self
    }

    pub fn vacant_cells(&self) -> impl Iterator<Item = CellIndex> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| index)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_some())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_none())
    }

    pub fn count_of(&self, mark: Mark) -> usize {
        self.cells.iter().filter(|&&cell| cell == Some(mark)).count()
    }

    /// 由子数奇偶推导当前执子方（X 先行）。
    pub fn to_move(&self) -> Mark {
        if self.count_of(Mark::X) <= self.count_of(Mark::O) {
            Mark::X
        } else {
            Mark::O
        }
    }
}

/// 对局模式。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    TwoPlayer,
    VsComputer,
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "two_player" | "local" | "pvp" => Ok(GameMode::TwoPlayer),
            "vs_computer" | "computer" | "ai" => Ok(GameMode::VsComputer),
            _ => Err(()),
        }
    }
}

/// 对局状态机：选模式 → 对局中（电脑回合经过思考子状态）→ 胜/和。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameStatus {
    SelectingMode,
    InProgress,
    AiThinking,
    Won { winner: Mark, line: Line },
    Drawn,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Won { .. } | GameStatus::Drawn)
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        GameStatus::SelectingMode
    }
}

/// 游戏事件流，供前端逐条呈现。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    ModeSelected { mode: GameMode },
    MovePlaced { cell: CellIndex, mark: Mark },
    GameWon { winner: Mark, line: Line },
    GameDrawn,
    BoardReset,
    ReturnedToMenu,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    MarkCountImbalance { x: usize, o: usize },
    MissingMode,
}

/// 游戏整体状态。棋盘、模式与状态机由前端共享读取。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    #[serde(default)]
    pub board: Board,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<GameMode>,
    #[serde(default)]
    pub status: GameStatus,
    /// 人机模式下电脑执的棋子。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_mark: Option<Mark>,
    /// 每次重置递增；用于丢弃为旧棋局计算的延迟落子。
    #[serde(default)]
    pub epoch: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::empty(),
            mode: None,
            status: GameStatus::SelectingMode,
            ai_mark: None,
            epoch: 0,
            event_log: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = Some(mode);
        if mode == GameMode::VsComputer && self.ai_mark.is_none() {
            self.ai_mark = Some(Mark::O);
        }
        self.status = GameStatus::InProgress;
        self
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn to_move(&self) -> Mark {
        self.board.to_move()
    }

    /// 是否轮到电脑落子。
    pub fn is_ai_turn(&self) -> bool {
        !self.is_finished()
            && !matches!(self.status, GameStatus::SelectingMode)
            && self.mode == Some(GameMode::VsComputer)
            && self.ai_mark == Some(self.board.to_move())
    }

    /// 清空棋盘开新局，保留模式。
    pub fn reset_board(&mut self) {
        self.board = Board::empty();
        self.status = if self.mode.is_some() {
            GameStatus::InProgress
        } else {
            GameStatus::SelectingMode
        };
        self.epoch = self.epoch.wrapping_add(1);
        self.event_log.clear();
    }

    /// 退回模式选择菜单，清空模式与棋盘。
    pub fn clear_mode(&mut self) {
        self.mode = None;
        self.ai_mark = None;
        self.board = Board::empty();
        self.status = GameStatus::SelectingMode;
        self.epoch = self.epoch.wrapping_add(1);
        self.event_log.clear();
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let x = self.board.count_of(Mark::X);
        let o = self.board.count_of(Mark::O);
        if o > x || x > o + 1 {
            return Err(IntegrityError::MarkCountImbalance { x, o });
        }
        if self.mode.is_none() && !matches!(self.status, GameStatus::SelectingMode) {
            return Err(IntegrityError::MissingMode);
        }
        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
