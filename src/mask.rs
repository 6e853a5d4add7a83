// src/mask.rs
//
// Trainable-token masks over a gold trajectory. Tokens the interpreter
// writes (after an execute marker, through the following line break) are
// not agent predictions, and neither are tokens the agent has already been
// given as context.

use serde::{Deserialize, Serialize};

use crate::tokenizer::{ControlTokens, TokenId};

/// A gold token sequence with index-aligned masks. `true` means trainable,
/// except in `auto_generated`, where `true` marks interpreter output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldMask {
    pub gold_sequence: Vec<TokenId>,
    pub auto_generated: Vec<bool>,
    /// `!auto_generated`
    pub parity_mask: Vec<bool>,
    /// Positions past the prefix already consumed by the rollout.
    pub prefix_mask: Vec<bool>,
    /// `parity_mask && prefix_mask`
    pub trainable_mask: Vec<bool>,
}

/// The fully worked reference dialogue for `a + b`.
pub fn gold_text(a: i64, b: i64, control: &ControlTokens) -> String {
    let sum = a + b;
    format!(
        "{bos}What is {a}+{b}?{sp}{a}+{b}{exec}{sum}{nl}{esp}{sum}{eos}",
        bos = control.bos.text,
        sp = control.scratchpad_start.text,
        exec = control.execute.text,
        nl = control.line_break.text,
        esp = control.scratchpad_end.text,
        eos = control.eos.text,
    )
}

/// Marks interpreter output. Boundaries sit one token after each execute
/// marker and one token after each line break; a position is auto-generated
/// when an odd number of boundaries have been crossed.
pub fn auto_generated_mask(ids: &[TokenId], control: &ControlTokens) -> Vec<bool> {
    let is_boundary = |prev: TokenId| prev == control.execute.id || prev == control.line_break.id;

    let mut odd = false;
    let mut mask = Vec::with_capacity(ids.len());
    for i in 0..ids.len() {
        if i > 0 && is_boundary(ids[i - 1]) {
            odd = !odd;
        }
        mask.push(odd);
    }
    mask
}

/// Builds every mask for `gold_sequence`, treating the first `consumed`
/// positions as already supplied context.
pub fn build(gold_sequence: Vec<TokenId>, consumed: usize, control: &ControlTokens) -> GoldMask {
    let auto_generated = auto_generated_mask(&gold_sequence, control);
    let parity_mask: Vec<bool> = auto_generated.iter().map(|auto| !auto).collect();
    let prefix_mask: Vec<bool> = (0..gold_sequence.len()).map(|i| i >= consumed).collect();
    let trainable_mask = parity_mask
        .iter()
        .zip(&prefix_mask)
        .map(|(parity, prefix)| *parity && *prefix)
        .collect();

    GoldMask {
        gold_sequence,
        auto_generated,
        parity_mask,
        prefix_mask,
        trainable_mask,
    }
}
