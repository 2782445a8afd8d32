//! Password policy and strength estimation
//!
//! The only hard gate is [`MIN_PASSWORD_LENGTH`]. Everything else is a
//! warning: the vault logs it at setup and the UI may show it, but a
//! password that clears the length floor is always accepted.
//!
//! | Level  | Bits   |
//! |--------|--------|
//! | Weak   | < 36   |
//! | Fair   | 36–59  |
//! | Strong | ≥ 60   |

use std::collections::HashSet;

/// Passwords shorter than this are rejected outright
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Entropy at which a password counts as strong (bits)
pub const STRONG_ENTROPY_BITS: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    Weak,
    Fair,
    Strong,
}

#[derive(Debug, Clone)]
pub struct PasswordAnalysis {
    pub entropy_bits: f64,
    pub strength: PasswordStrength,
    pub warnings: Vec<String>,
}

/// Words that show up in every wallet-targeted dictionary attack
const COMMON_FRAGMENTS: &[&str] = &[
    "password", "qwerty", "123456", "letmein", "iloveyou", "admin", "welcome", "wallet",
    "crypto", "ether", "bitcoin", "metamask", "secret", "moon", "hodl",
];

/// Whether a password clears the hard length floor (counted in characters)
pub fn meets_length_floor(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

/// Estimate password entropy from its character pool, with penalties for
/// dictionary fragments, repetition and keyboard/number runs.
pub fn analyze(password: &str) -> PasswordAnalysis {
    let mut warnings = Vec::new();
    let length = password.chars().count();
    if length == 0 {
        return PasswordAnalysis {
            entropy_bits: 0.0,
            strength: PasswordStrength::Weak,
            warnings: vec!["Password is empty".to_string()],
        };
    }

    let pool: u32 = [
        (password.chars().any(|c| c.is_ascii_lowercase()), 26),
        (password.chars().any(|c| c.is_ascii_uppercase()), 26),
        (password.chars().any(|c| c.is_ascii_digit()), 10),
        (
            password
                .chars()
                .any(|c| c.is_ascii_punctuation() || c == ' '),
            33,
        ),
        (password.chars().any(|c| !c.is_ascii()), 100),
    ]
    .iter()
    .filter(|(present, _)| *present)
    .map(|(_, size)| size)
    .sum();

    let mut bits = length as f64 * f64::from(pool.max(1)).log2();

    let lower = password.to_lowercase();
    if COMMON_FRAGMENTS.iter().any(|w| lower.contains(w)) {
        bits *= 0.5;
        warnings.push("Contains a common password fragment".to_string());
    }

    let distinct: HashSet<char> = password.chars().collect();
    if distinct.len() * 2 < length {
        bits *= 0.6;
        warnings.push("Too many repeated characters".to_string());
    }

    let runs = count_runs(password);
    if runs > 2 {
        bits -= runs as f64 * 2.0;
        warnings.push("Contains sequential runs like abc or 321".to_string());
    }

    if length < 12 {
        warnings.push("Consider 12 or more characters".to_string());
    }

    let entropy_bits = bits.max(0.0);
    let strength = if entropy_bits >= STRONG_ENTROPY_BITS {
        PasswordStrength::Strong
    } else if entropy_bits >= 36.0 {
        PasswordStrength::Fair
    } else {
        PasswordStrength::Weak
    };

    PasswordAnalysis {
        entropy_bits,
        strength,
        warnings,
    }
}

/// Ascending or descending three-character runs
fn count_runs(password: &str) -> usize {
    let codes: Vec<i64> = password.chars().map(|c| c as i64).collect();
    codes
        .windows(3)
        .filter(|w| {
            let step = w[1] - w[0];
            (step == 1 || step == -1) && w[2] - w[1] == step
        })
        .count()
}
