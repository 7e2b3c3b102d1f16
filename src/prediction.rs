use serde::Serialize;

/// A single label produced by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// Confidence score in `[0, 1]`.
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Predictions ordered by descending confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Predictions(Vec<Prediction>);

impl Predictions {
    /// Rank raw classifier output.
    ///
    /// Blank labels and non-finite scores are dropped, the rest are clamped
    /// to `[0, 1]`. Ties keep the classifier's order.
    pub fn ranked(raw: Vec<Prediction>) -> Self {
        let mut preds: Vec<Prediction> = raw
            .into_iter()
            .filter(|p| p.confidence.is_finite() && !p.label.trim().is_empty())
            .map(|mut p| {
                p.confidence = p.confidence.clamp(0.0, 1.0);
                p
            })
            .collect();
        preds.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Self(preds)
    }

    pub fn top(&self) -> Option<&Prediction> {
        self.0.first()
    }

    pub fn into_top(self) -> Option<Prediction> {
        self.0.into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Prediction] {
        &self.0
    }
}
