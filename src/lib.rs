pub mod ai;
pub mod game;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{AiAgent, AiDecision};
pub use game::{
    evaluate, Board, Cell, CellIndex, GameEvent, GameMode, GameState, GameStatus, IntegrityError,
    Line, Mark, Outcome, RuleEngine, RuleError, RuleResolution, WIN_LINES,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn resolution_from_events(state: &GameState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state.clone(), events)
}

/// 延迟计算的电脑落子应答：决策本身与计算时所处的棋局代次。
#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    epoch: u32,
}

#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(initial_state_json: Option<String>) -> Result<GameEngine, JsValue> {
        let state = if let Some(json) = initial_state_json {
            serde_json::from_str(&json).map_err(serde_to_js_error)?
        } else {
            GameState::new()
        };
        Ok(GameEngine { state })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.state = state;
        Ok(())
    }

    pub fn select_mode(&mut self, mode: &str) -> Result<String, JsValue> {
        let mode = GameMode::from_str(mode).map_err(|_| JsValue::from_str("unknown game mode"))?;
        let mut engine = RuleEngine::new();
        let events = engine
            .select_mode(&mut self.state, mode, None)
            .map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    /// 人类在指定格子落子。
    pub fn play_cell(&mut self, cell: u8) -> Result<String, JsValue> {
        let mut engine = RuleEngine::new();
        let events = engine
            .play_cell(&mut self.state, cell as usize)
            .map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    /// 标记电脑开始思考，返回本局代次；随后用 think_ai 计算、apply_ai_move 落子。
    pub fn begin_ai_turn(&mut self) -> Result<u32, JsValue> {
        let mut engine = RuleEngine::new();
        engine.begin_ai_turn(&mut self.state).map_err(to_js_error)
    }

    /// 在延迟之后为当前局面计算电脑落子，返回 Promise。
    /// 延迟只为观感节奏，搜索本身是同步完成的。
    pub fn think_ai(&self, delay_ms: Option<u32>) -> Promise {
        let board = self.state.board;
        let mark = self.state.board.to_move();
        let epoch = self.state.epoch;
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new();
            let decision = agent.decide(&board, mark);
            web_sys::console::debug_1(
                &format!(
                    "ai decision: cell={:?} score={} nodes={}",
                    decision.cell, decision.score, decision.nodes
                )
                .into(),
            );
            let json = serde_json::to_string(&AiMoveResponse { decision, epoch })
                .map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    /// 落下先前算好的电脑棋。代次不符或目标格已被占用时报错，
    /// 前端应丢弃该落子而不是重试。
    pub fn apply_ai_move(&mut self, cell: u8, epoch: u32) -> Result<String, JsValue> {
        let mut engine = RuleEngine::new();
        let events = engine
            .apply_ai_move(&mut self.state, cell as usize, epoch)
            .map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    /// 清空棋盘开新局，保留已选模式。
    pub fn reset(&mut self) -> Result<String, JsValue> {
        let mut engine = RuleEngine::new();
        let events = engine.reset(&mut self.state).map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    /// 退回模式选择菜单。
    pub fn to_menu(&mut self) -> Result<String, JsValue> {
        let mut engine = RuleEngine::new();
        let events = engine.return_to_menu(&mut self.state);
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn outcome(&self) -> Result<JsValue, JsValue> {
        to_value(&RuleEngine::check_outcome(&self.state)).map_err(JsValue::from)
    }
}

/// 创建初始（菜单）游戏状态，方便前端调试或初始化。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::new()).map_err(JsValue::from)
}

/// 判定传入棋盘的结果（纯函数）。
#[wasm_bindgen(js_name = "evaluateBoard")]
pub fn evaluate_board(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    to_value(&evaluate(&board)).map_err(JsValue::from)
}

/// 为指定一方挑选落点（纯函数）；mark 省略时由棋盘子数推导。
#[wasm_bindgen(js_name = "selectMove")]
pub fn select_move(board: JsValue, mark: Option<String>) -> Result<Option<u8>, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let mark = match mark {
        Some(raw) => {
            Mark::from_str(&raw).map_err(|_| JsValue::from_str("unknown player mark"))?
        }
        None => board.to_move(),
    };

    let mut agent = AiAgent::new();
    Ok(agent.select_move(&board, mark).map(|cell| cell as u8))
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
