//! Keyboard and touch mapping

use crate::session::Intent;

/// Intent for a `KeyboardEvent.key` value
pub fn intent_for_key(key: &str) -> Option<Intent> {
    match key {
        "ArrowLeft" | "a" | "A" => Some(Intent::MoveLeft),
        "ArrowRight" | "d" | "D" => Some(Intent::MoveRight),
        "r" | "R" => Some(Intent::Restart),
        _ => None,
    }
}

/// Intent for a touch at `x` on a surface `width` wide
///
/// Any tap restarts after game over; otherwise the left half moves left and
/// the right half moves right.
pub fn intent_for_touch(x: f32, width: f32, game_over: bool) -> Intent {
    if game_over {
        Intent::Restart
    } else if x < width / 2.0 {
        Intent::MoveLeft
    } else {
        Intent::MoveRight
    }
}
