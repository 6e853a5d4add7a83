use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tokenizer::ControlTokens;

/// Per-episode state: the question and its bookkeeping. Operands never change
/// once drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub episode_index: u64,
    pub operand_a: i64,
    pub operand_b: i64,
    /// `[BOS]What is {a}+{b}?`
    pub prompt: String,
    /// `[BOS]What is {a}+{b}?{a+b}[EOS]`
    pub expected_answer: String,
    pub action_count: usize,
}

impl Episode {
    pub fn new(operand_a: i64, operand_b: i64, episode_index: u64, control: &ControlTokens) -> Self {
        let prompt = format!("{}What is {operand_a}+{operand_b}?", control.bos.text);
        let expected_answer = format!("{prompt}{}{}", operand_a + operand_b, control.eos.text);

        Self {
            id: Uuid::new_v4(),
            episode_index,
            operand_a,
            operand_b,
            prompt,
            expected_answer,
            action_count: 0,
        }
    }

    /// Draws both operands independently from `0..max_val`.
    pub fn draw<R: Rng>(
        rng: &mut R,
        max_val: i64,
        episode_index: u64,
        control: &ControlTokens,
    ) -> Self {
        let a = rng.gen_range(0..max_val);
        let b = rng.gen_range(0..max_val);
        Self::new(a, b, episode_index, control)
    }

    pub fn operands(&self) -> (i64, i64) {
        (self.operand_a, self.operand_b)
    }

    pub fn answer(&self) -> i64 {
        self.operand_a + self.operand_b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{ControlTokenNames, VocabTokenizer};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn control() -> ControlTokens {
        let tokenizer = VocabTokenizer::arithmetic().unwrap();
        ControlTokens::resolve(&tokenizer, &ControlTokenNames::default()).unwrap()
    }

    #[test]
    fn test_prompt_and_expected_answer() {
        let episode = Episode::new(2, 3, 1, &control());

        assert_eq!(episode.prompt, "[BOS]What is 2+3?");
        assert_eq!(episode.expected_answer, "[BOS]What is 2+3?5[EOS]");
        assert_eq!(episode.answer(), 5);
        assert_eq!(episode.action_count, 0);
    }

    #[test]
    fn test_draw_stays_in_range() {
        let control = control();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for index in 0..200 {
            let (a, b) = Episode::draw(&mut rng, 4, index, &control).operands();
            assert!((0..4).contains(&a) && (0..4).contains(&b), "{a} {b}");
        }
    }
}
