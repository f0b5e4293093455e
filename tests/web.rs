//! 浏览器环境下走通 wasm 接口的冒烟测试。

#![cfg(target_arch = "wasm32")]

use tictactoe_core::GameEngine;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn two_player_game_reaches_a_win() {
    let mut engine = GameEngine::new(None).expect("engine");
    engine.select_mode("two_player").expect("mode");

    // X: 0, 1, 2 — top row; O: 3, 4
    for cell in [0u8, 3, 1, 4, 2] {
        engine.play_cell(cell).expect("legal move");
    }

    let json = engine.state_json().expect("state json");
    assert!(json.contains("\"type\":\"Won\""), "state was: {json}");
}

#[wasm_bindgen_test]
fn computer_turn_applies_a_valid_move() {
    let mut engine = GameEngine::new(None).expect("engine");
    engine.select_mode("vs_computer").expect("mode");

    engine.play_cell(0).expect("human move");
    let epoch = engine.begin_ai_turn().expect("computer's turn");
    engine.apply_ai_move(4, epoch).expect("move for current epoch");

    let json = engine.state_json().expect("state json");
    assert!(json.contains("\"o\""), "computer mark missing: {json}");
}

#[wasm_bindgen_test]
fn deferred_move_is_rejected_after_a_reset() {
    let mut engine = GameEngine::new(None).expect("engine");
    engine.select_mode("vs_computer").expect("mode");

    engine.play_cell(0).expect("human move");
    let epoch = engine.begin_ai_turn().expect("computer's turn");
    engine.reset().expect("reset mid-think");
    engine.play_cell(0).expect("human move in the new game");

    assert!(
        engine.apply_ai_move(4, epoch).is_err(),
        "a move computed for the old board must be discarded"
    );
}
