//! Challenge generation for the stub server.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;

/// A small arithmetic question and its answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathChallenge {
    pub question: String,
    pub answer: i64,
}

impl MathChallenge {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let a: i64 = rng.random_range(1..=20);
        let b: i64 = rng.random_range(1..=20);

        match rng.random_range(0..3) {
            0 => Self::new(format!("What is {a} + {b}?"), a + b),
            // Keep subtraction non-negative
            1 => {
                let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
                Self::new(format!("What is {hi} - {lo}?"), hi - lo)
            }
            _ => {
                let b = b % 10 + 1;
                Self::new(format!("What is {a} × {b}?"), a * b)
            }
        }
    }

    fn new(question: String, answer: i64) -> Self {
        Self { question, answer }
    }
}

/// Opaque random token (128 bits, URL-safe)
pub fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
