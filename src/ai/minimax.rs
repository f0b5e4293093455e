use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::game::{evaluate, Board, CellIndex, Mark, Outcome};

/// 空棋盘开局候选格排序：中心最优，其次四角，最后四边。
const OPENING_PREFERENCE: [CellIndex; 9] = [4, 0, 2, 6, 8, 1, 3, 5, 7];

/// 开局只在排序最靠前的几格里随机挑选，保证首手有变化但不弱。
const OPENING_POOL: usize = 3;

/// 终局基准分，按深度衰减：速胜得分高，缓败得分高。
const WIN_SCORE: i32 = 10;

/// 一次选点的结果与搜索统计，供前端展示。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<CellIndex>,
    pub score: i32,
    pub nodes: u64,
}

struct SearchStats {
    nodes: u64,
}

impl SearchStats {
    fn new() -> Self {
        Self { nodes: 0 }
    }
}

/// 电脑棋手。随机性只来自注入的 RNG，便于测试固定种子。
pub struct AiAgent {
    rng: SmallRng,
}

impl AiAgent {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// 为 `mark` 一方挑选落点；棋盘已满时返回 None。
    pub fn select_move(&mut self, board: &Board, mark: Mark) -> Option<CellIndex> {
        self.decide(board, mark).cell
    }

    pub fn decide(&mut self, board: &Board, mark: Mark) -> AiDecision {
        if board.is_full() {
            return AiDecision {
                cell: None,
                score: 0,
                nodes: 0,
            };
        }

        // 空棋盘不走完整搜索，从排序靠前的候选格里随机开局
        if board.is_blank() {
            let cell = OPENING_PREFERENCE[..OPENING_POOL]
                .choose(&mut self.rng)
                .copied();
            return AiDecision {
                cell,
                score: 0,
                nodes: 0,
            };
        }

        let mut stats = SearchStats::new();
        let mut best_cell = None;
        let mut best_score = i32::MIN;

        for cell in board.vacant_cells() {
            let child = board.with_move(cell, mark);
            let score = minimax(&child, 1, false, mark, &mut stats);

            if score > best_score {
                best_score = score;
                best_cell = Some(cell);
            }
        }

        AiDecision {
            cell: best_cell,
            score: best_score,
            nodes: stats.nodes,
        }
    }
}

impl Default for AiAgent {
    fn default() -> Self {
        Self::new()
    }
}

/// 穷举极小极大搜索。`depth` 为距根局面的步数，用来给终局分加权，
/// 使搜索偏向更快的胜利与更晚的失败。
fn minimax(
    board: &Board,
    depth: i32,
    maximizing: bool,
    ai_mark: Mark,
    stats: &mut SearchStats,
) -> i32 {
    stats.nodes += 1;

    match evaluate(board) {
        Outcome::Win { winner, .. } => {
            return if winner == ai_mark {
                WIN_SCORE - depth
            } else {
                depth - WIN_SCORE
            };
        }
        Outcome::Draw => return 0,
        Outcome::InProgress => {}
    }

    if maximizing {
        let mut best = i32::MIN;
        for cell in board.vacant_cells() {
            let child = board.with_move(cell, ai_mark);
            let score = minimax(&child, depth + 1, false, ai_mark, stats);
            if score > best {
                best = score;
            }
        }
        best
    } else {
        let mut worst = i32::MAX;
        for cell in board.vacant_cells() {
            let child = board.with_move(cell, ai_mark.opponent());
            let score = minimax(&child, depth + 1, true, ai_mark, stats);
            if score < worst {
                worst = score;
            }
        }
        worst
    }
}
