//! AI 算法模块（极小极大搜索与开局启发）。

pub mod minimax;

pub use minimax::{AiAgent, AiDecision};
