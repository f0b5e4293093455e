use serde::{Deserialize, Serialize};

use super::state::{
    Board, CellIndex, GameEvent, GameMode, GameState, GameStatus, IntegrityError, Line, Mark,
    WIN_LINES,
};

/// 棋盘判定结果。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Outcome {
    InProgress,
    Draw,
    Win { winner: Mark, line: Line },
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

/// 判定棋盘结果：按固定顺序扫描八条连线，命中第一条即为胜；
/// 无连线且棋盘已满为和棋，否则对局未结束。
pub fn evaluate(board: &Board) -> Outcome {
    for line in WIN_LINES {
        let [a, b, c] = line;
        if let Some(mark) = board.cell(a) {
            if board.cell(b) == Some(mark) && board.cell(c) == Some(mark) {
                return Outcome::Win { winner: mark, line };
            }
        }
    }

    if board.is_full() {
        Outcome::Draw
    } else {
        Outcome::InProgress
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    GameFinished,
    ModeNotSelected,
    InvalidStatus {
        expected: GameStatus,
        actual: GameStatus,
    },
    CellOutOfRange {
        cell: usize,
    },
    CellOccupied {
        cell: CellIndex,
    },
    NotHumanTurn,
    NotAiTurn,
    StaleAiMove {
        move_epoch: u32,
        current_epoch: u32,
    },
    IntegrityViolation {
        error: IntegrityError,
    },
}

/// 单次引擎调用的结果：更新后的状态、本次产生的事件与终局判定。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl RuleResolution {
    pub fn new(state: GameState, events: Vec<GameEvent>) -> Self {
        let outcome = match &state.status {
            GameStatus::Won { winner, line } => Some(Outcome::Win {
                winner: *winner,
                line: *line,
            }),
            GameStatus::Drawn => Some(Outcome::Draw),
            _ => None,
        };

        Self {
            state,
            events,
            outcome,
        }
    }
}

#[derive(Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    fn ensure_active(state: &GameState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        Ok(())
    }

    fn ensure_mode_selected(state: &GameState) -> Result<(), RuleError> {
        if state.mode.is_none() {
            return Err(RuleError::ModeNotSelected);
        }
        Ok(())
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    fn ensure_cell_free(board: &Board, cell: usize) -> Result<CellIndex, RuleError> {
        if cell >= Board::SIZE {
            return Err(RuleError::CellOutOfRange { cell });
        }
        if board.cell(cell).is_some() {
            return Err(RuleError::CellOccupied { cell });
        }
        Ok(cell)
    }

    /// 从菜单进入对局。人机模式下电脑默认执 O。
    pub fn select_mode(
        &mut self,
        state: &mut GameState,
        mode: GameMode,
        ai_mark: Option<Mark>,
    ) -> Result<Vec<GameEvent>, RuleError> {
        if !matches!(state.status, GameStatus::SelectingMode) {
            return Err(RuleError::InvalidStatus {
                expected: GameStatus::SelectingMode,
                actual: state.status.clone(),
            });
        }

        state.mode = Some(mode);
        state.ai_mark = match mode {
            GameMode::VsComputer => Some(ai_mark.unwrap_or(Mark::O)),
            GameMode::TwoPlayer => None,
        };
        state.status = GameStatus::InProgress;

        let events = vec![GameEvent::ModeSelected { mode }];
        for event in &events {
            state.record_event(event.clone());
        }
        Ok(events)
    }

    /// 人类落子。执子方由子数奇偶推导。
    pub fn play_cell(
        &mut self,
        state: &mut GameState,
        cell: usize,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_active(state)?;
        Self::ensure_mode_selected(state)?;
        if state.is_ai_turn() {
            return Err(RuleError::NotHumanTurn);
        }
        Self::ensure_integrity(state)?;
        let cell = Self::ensure_cell_free(&state.board, cell)?;

        let mark = state.board.to_move();
        Ok(Self::place(state, cell, mark))
    }

    /// 标记电脑开始思考，返回当前棋局代次供延迟落子校验。
    pub fn begin_ai_turn(&mut self, state: &mut GameState) -> Result<u32, RuleError> {
        Self::ensure_active(state)?;
        if !state.is_ai_turn() {
            return Err(RuleError::NotAiTurn);
        }
        state.status = GameStatus::AiThinking;
        Ok(state.epoch)
    }

    /// 落下先前算好的电脑棋。代次不符或目标格已被占用时拒绝，
    /// 防止把为旧棋盘计算的落子写进新棋局。
    pub fn apply_ai_move(
        &mut self,
        state: &mut GameState,
        cell: usize,
        move_epoch: u32,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_active(state)?;
        Self::ensure_mode_selected(state)?;
        if move_epoch != state.epoch {
            return Err(RuleError::StaleAiMove {
                move_epoch,
                current_epoch: state.epoch,
            });
        }
        let Some(ai_mark) = state.ai_mark else {
            return Err(RuleError::NotAiTurn);
        };
        if state.board.to_move() != ai_mark {
            return Err(RuleError::NotAiTurn);
        }
        Self::ensure_integrity(state)?;
        let cell = Self::ensure_cell_free(&state.board, cell)?;

        Ok(Self::place(state, cell, ai_mark))
    }

    pub fn reset(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_mode_selected(state)?;
        state.reset_board();

        let events = vec![GameEvent::BoardReset];
        for event in &events {
            state.record_event(event.clone());
        }
        Ok(events)
    }

    pub fn return_to_menu(&mut self, state: &mut GameState) -> Vec<GameEvent> {
        state.clear_mode();

        let events = vec![GameEvent::ReturnedToMenu];
        for event in &events {
            state.record_event(event.clone());
        }
        events
    }

    pub fn check_outcome(state: &GameState) -> Outcome {
        evaluate(&state.board)
    }

    fn place(state: &mut GameState, cell: CellIndex, mark: Mark) -> Vec<GameEvent> {
        state.board = state.board.with_move(cell, mark);
        let mut events = vec![GameEvent::MovePlaced { cell, mark }];

        match evaluate(&state.board) {
            Outcome::Win { winner, line } => {
                state.status = GameStatus::Won { winner, line };
                events.push(GameEvent::GameWon { winner, line });
            }
            Outcome::Draw => {
                state.status = GameStatus::Drawn;
                events.push(GameEvent::GameDrawn);
            }
            Outcome::InProgress => {
                state.status = GameStatus::InProgress;
            }
        }

        for event in &events {
            state.record_event(event.clone());
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(layout: &str) -> Board {
        let mut board = Board::empty();
        for (index, ch) in layout.chars().enumerate() {
            match ch {
                'X' | 'x' => board = board.with_move(index, Mark::X),
                'O' | 'o' => board = board.with_move(index, Mark::O),
                _ => {}
            }
        }
        board
    }

    fn setup_state() -> GameState {
        GameState::new().with_mode(GameMode::TwoPlayer)
    }

    #[test]
    fn detects_win_on_every_line() {
        for line in WIN_LINES {
            let mut winning = Board::empty();
            for cell in line {
                winning = winning.with_move(cell, Mark::X);
            }
            assert_eq!(
                evaluate(&winning),
                Outcome::Win {
                    winner: Mark::X,
                    line
                },
                "line {line:?} should be reported as a win"
            );
        }
    }

    #[test]
    fn full_board_without_line_is_a_draw() {
        let full = board("XXOOOXXOX");
        assert_eq!(evaluate(&full), Outcome::Draw);
    }

    #[test]
    fn board_with_vacancies_and_no_line_is_in_progress() {
        assert_eq!(evaluate(&Board::empty()), Outcome::InProgress);
        assert_eq!(evaluate(&board("XOX.O....")), Outcome::InProgress);
    }

    #[test]
    fn evaluate_is_idempotent() {
        let mid_game = board("XOX.O..X.");
        assert_eq!(evaluate(&mid_game), evaluate(&mid_game));
    }

    #[test]
    fn play_cell_alternates_marks() {
        let mut engine = RuleEngine::new();
        let mut state = setup_state();

        engine.play_cell(&mut state, 0).expect("first move");
        engine.play_cell(&mut state, 4).expect("second move");

        assert_eq!(state.board.cell(0), Some(Mark::X));
        assert_eq!(state.board.cell(4), Some(Mark::O));
        assert_eq!(state.to_move(), Mark::X);
    }

    #[test]
    fn play_cell_rejects_occupied_and_out_of_range_cells() {
        let mut engine = RuleEngine::new();
        let mut state = setup_state();

        engine.play_cell(&mut state, 0).expect("move should apply");
        assert_eq!(
            engine.play_cell(&mut state, 0),
            Err(RuleError::CellOccupied { cell: 0 })
        );
        assert_eq!(
            engine.play_cell(&mut state, 9),
            Err(RuleError::CellOutOfRange { cell: 9 })
        );
    }

    #[test]
    fn play_cell_requires_a_selected_mode() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();

        assert_eq!(
            engine.play_cell(&mut state, 0),
            Err(RuleError::ModeNotSelected)
        );
    }

    #[test]
    fn winning_move_transitions_to_won_and_emits_events() {
        let mut engine = RuleEngine::new();
        let mut state = setup_state();
        state.board = board("XX.OO....");

        let events = engine.play_cell(&mut state, 2).expect("winning move");

        assert_eq!(
            state.status,
            GameStatus::Won {
                winner: Mark::X,
                line: [0, 1, 2]
            }
        );
        assert!(
            events.iter().any(|event| matches!(
                event,
                GameEvent::GameWon {
                    winner: Mark::X,
                    line: [0, 1, 2]
                }
            )),
            "a win event should be emitted"
        );
        assert_eq!(engine.play_cell(&mut state, 5), Err(RuleError::GameFinished));
    }

    #[test]
    fn filling_the_board_without_a_line_transitions_to_drawn() {
        let mut engine = RuleEngine::new();
        let mut state = setup_state();
        state.board = board("XXOOOXXO.");

        let events = engine.play_cell(&mut state, 8).expect("final move");

        assert_eq!(state.status, GameStatus::Drawn);
        assert!(events.iter().any(|event| matches!(event, GameEvent::GameDrawn)));
    }

    #[test]
    fn select_mode_leaves_the_menu_once() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();

        engine
            .select_mode(&mut state, GameMode::VsComputer, None)
            .expect("mode selection");
        assert_eq!(state.mode, Some(GameMode::VsComputer));
        assert_eq!(state.ai_mark, Some(Mark::O), "computer defaults to O");
        assert_eq!(state.status, GameStatus::InProgress);

        assert!(matches!(
            engine.select_mode(&mut state, GameMode::TwoPlayer, None),
            Err(RuleError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn human_move_is_rejected_on_the_computers_turn() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new().with_mode(GameMode::VsComputer);

        engine.play_cell(&mut state, 0).expect("human move");
        assert_eq!(engine.play_cell(&mut state, 1), Err(RuleError::NotHumanTurn));
    }

    #[test]
    fn ai_handshake_applies_a_move_for_the_current_epoch() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new().with_mode(GameMode::VsComputer);

        engine.play_cell(&mut state, 0).expect("human move");
        let epoch = engine.begin_ai_turn(&mut state).expect("computer's turn");
        assert_eq!(state.status, GameStatus::AiThinking);

        engine
            .apply_ai_move(&mut state, 4, epoch)
            .expect("computed move should apply");
        assert_eq!(state.board.cell(4), Some(Mark::O));
        assert_eq!(state.status, GameStatus::InProgress);
    }

    #[test]
    fn stale_ai_move_is_discarded_after_a_reset() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new().with_mode(GameMode::VsComputer);

        engine.play_cell(&mut state, 0).expect("human move");
        let epoch = engine.begin_ai_turn(&mut state).expect("computer's turn");
        engine.reset(&mut state).expect("reset mid-think");
        engine.play_cell(&mut state, 0).expect("human move in new game");

        assert_eq!(
            engine.apply_ai_move(&mut state, 4, epoch),
            Err(RuleError::StaleAiMove {
                move_epoch: epoch,
                current_epoch: epoch + 1,
            })
        );
    }

    #[test]
    fn ai_move_is_rejected_when_the_target_cell_is_taken() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new().with_mode(GameMode::VsComputer);

        engine.play_cell(&mut state, 4).expect("human move");
        let epoch = engine.begin_ai_turn(&mut state).expect("computer's turn");

        assert_eq!(
            engine.apply_ai_move(&mut state, 4, epoch),
            Err(RuleError::CellOccupied { cell: 4 })
        );
    }

    #[test]
    fn reset_keeps_the_mode_and_bumps_the_epoch() {
        let mut engine = RuleEngine::new();
        let mut state = setup_state();

        engine.play_cell(&mut state, 0).expect("move");
        let epoch_before = state.epoch;
        engine.reset(&mut state).expect("reset");

        assert!(state.board.is_blank());
        assert_eq!(state.mode, Some(GameMode::TwoPlayer));
        assert_eq!(state.status, GameStatus::InProgress);
        assert_eq!(state.epoch, epoch_before + 1);
    }

    #[test]
    fn returning_to_menu_clears_the_mode() {
        let mut engine = RuleEngine::new();
        let mut state = setup_state();

        engine.play_cell(&mut state, 0).expect("move");
        engine.return_to_menu(&mut state);

        assert!(state.board.is_blank());
        assert_eq!(state.mode, None);
        assert_eq!(state.status, GameStatus::SelectingMode);
    }

    #[test]
    fn integrity_violations_surface_as_rule_errors() {
        let mut engine = RuleEngine::new();
        let mut state = setup_state();
        state.board = board("XX.......");

        assert_eq!(
            engine.play_cell(&mut state, 2),
            Err(RuleError::IntegrityViolation {
                error: IntegrityError::MarkCountImbalance { x: 2, o: 0 }
            })
        );
    }
}
