//! Common small types shared across the engine.

use serde::{Deserialize, Serialize};

/// Progress information for a long-running operation (chunk scan, fetch,
/// apply). Expressed as a simple current/total counter, per §4.5's
/// `(bundles_done + blocks_done) / (bundles_total + blocks_total)` formula.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub message: Option<String>,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Self {
            current: 0,
            total,
            message: None,
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.current as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    pub fn advance(&mut self, n: u64) {
        self.current = (self.current + n).min(self.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_of_empty_total_is_complete() {
        let p = Progress::new(0);
        assert_eq!(p.percentage(), 100.0);
        assert!(p.is_complete());
    }

    #[test]
    fn advance_clamps_to_total() {
        let mut p = Progress::new(2);
        p.advance(5);
        assert_eq!(p.current, 2);
        assert!(p.is_complete());
    }
}
