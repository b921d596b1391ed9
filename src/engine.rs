//! # Decision Engine
//! Pure, testable logic that maps `(sentiment score, confidence)` → discrete
//! trading signal. No I/O; the LLM-backed signal generator falls back to
//! this rule on any failure.
//!
//! Policy (strict inequalities, by contract):
//!   score > 0.3  and confidence > 0.5 → BUY
//!   score < -0.3 and confidence > 0.5 → SELL
//!   otherwise                          → HOLD
//! Reported confidence is the scorer's confidence expressed as a percentage.

use crate::signal::{SignalAction, SignalDecision};

pub fn decide(sentiment_score: f64, confidence: f64) -> SignalDecision {
    if sentiment_score > 0.3 && confidence > 0.5 {
        SignalDecision {
            signal: SignalAction::Buy,
            confidence: confidence * 100.0,
            reasoning: "Strong positive sentiment".to_string(),
        }
    } else if sentiment_score < -0.3 && confidence > 0.5 {
        SignalDecision {
            signal: SignalAction::Sell,
            confidence: confidence * 100.0,
            reasoning: "Strong negative sentiment".to_string(),
        }
    } else {
        SignalDecision {
            signal: SignalAction::Hold,
            confidence: confidence * 100.0,
            reasoning: "Mixed or uncertain sentiment".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_requires_strictly_above_both_thresholds() {
        assert_eq!(decide(0.31, 0.51).signal, SignalAction::Buy);
        // Exactly at the boundary is not enough.
        assert_eq!(decide(0.3, 0.6).signal, SignalAction::Hold);
        assert_eq!(decide(0.5, 0.5).signal, SignalAction::Hold);
    }

    #[test]
    fn sell_mirrors_buy_boundary() {
        assert_eq!(decide(-0.31, 0.51).signal, SignalAction::Sell);
        assert_eq!(decide(-0.3, 0.6).signal, SignalAction::Hold);
    }

    #[test]
    fn low_confidence_always_holds() {
        assert_eq!(decide(0.9, 0.4).signal, SignalAction::Hold);
        assert_eq!(decide(-0.9, 0.4).signal, SignalAction::Hold);
    }

    #[test]
    fn confidence_is_scaled_to_percent() {
        let d = decide(0.5, 0.72);
        assert!((d.confidence - 72.0).abs() < 1e-9);
    }
}
