//! 游戏核心逻辑模块（棋盘、状态机、规则引擎）。

pub mod rules;
pub mod state;

pub use rules::{evaluate, Outcome, RuleEngine, RuleError, RuleResolution};
pub use state::{
    Board,
    Cell,
    CellIndex,
    GameEvent,
    GameMode,
    GameState,
    GameStatus,
    IntegrityError,
    Line,
    Mark,
    WIN_LINES,
};
