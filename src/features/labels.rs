//! Forward-looking direction labels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the close `horizon` records ahead.
///
/// `Bullish` is the positive class for the classifier, the threshold and
/// every metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Bullish,
    Bearish,
}

impl Label {
    /// The class reported as "positive"
    pub const POSITIVE: Label = Label::Bullish;

    pub fn is_positive(&self) -> bool {
        *self == Self::POSITIVE
    }

    /// 1.0 for the positive class, 0.0 otherwise
    pub fn as_target(&self) -> f64 {
        if self.is_positive() {
            1.0
        } else {
            0.0
        }
    }

    pub fn from_positive(positive: bool) -> Self {
        if positive {
            Label::Bullish
        } else {
            Label::Bearish
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Bullish => f.write_str("Bullish"),
            Label::Bearish => f.write_str("Bearish"),
        }
    }
}

/// Label each close against the close `horizon` records later.
///
/// A strictly higher future close is Bullish; an equal or lower one is
/// Bearish. The last `horizon` records have no future close and stay `None`.
pub fn label_closes(closes: &[f64], horizon: usize) -> Vec<Option<Label>> {
    let n = closes.len();
    (0..n)
        .map(|t| {
            let future = closes.get(t + horizon).filter(|_| horizon > 0)?;
            Some(Label::from_positive(future - closes[t] > 0.0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_higher_is_bullish() {
        let closes = [10.0, 11.0, 12.0, 9.0, 12.0, 13.0];
        let labels = label_closes(&closes, 2);

        assert_eq!(labels[0], Some(Label::Bullish)); // 12 > 10
        assert_eq!(labels[1], Some(Label::Bearish)); // 9 < 11
        assert_eq!(labels[2], Some(Label::Bearish)); // 12 == 12
        assert_eq!(labels[3], Some(Label::Bullish)); // 13 > 9
        assert_eq!(labels[4], None);
        assert_eq!(labels[5], None);
    }

    #[test]
    fn test_flat_series_is_bearish() {
        let labels = label_closes(&[5.0; 10], 7);
        assert!(labels[..3].iter().all(|l| *l == Some(Label::Bearish)));
        assert!(labels[3..].iter().all(Option::is_none));
    }

    #[test]
    fn test_short_series_has_no_labels() {
        let labels = label_closes(&[1.0, 2.0, 3.0], 7);
        assert!(labels.iter().all(Option::is_none));
    }

    #[test]
    fn test_positive_class_convention() {
        assert!(Label::Bullish.is_positive());
        assert!(!Label::Bearish.is_positive());
        assert_eq!(Label::Bullish.as_target(), 1.0);
        assert_eq!(Label::from_positive(false), Label::Bearish);
    }
}
