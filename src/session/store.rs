use crate::models::{DetectedRectangle, DetectionDebugInfo, DetectionOutput};

/// Latest detection results plus the operator's selection.
///
/// The selection is kept as a position into `rectangles`, so it can never point
/// at a rectangle outside the current set.
#[derive(Debug, Default)]
pub struct ResultStore {
    rectangles: Vec<DetectedRectangle>,
    debug_info: DetectionDebugInfo,
    selection: Option<usize>,
}

impl ResultStore {
    pub fn rectangles(&self) -> &[DetectedRectangle] {
        &self.rectangles
    }

    pub fn debug_info(&self) -> &DetectionDebugInfo {
        &self.debug_info
    }

    pub fn selection(&self) -> Option<&DetectedRectangle> {
        self.selection.and_then(|idx| self.rectangles.get(idx))
    }

    /// Replace the result set in algorithm order; clears the selection
    pub fn install(&mut self, output: DetectionOutput) {
        self.rectangles = output.rectangles;
        self.debug_info = output.debug_info;
        self.selection = None;
    }

    /// Select `rectangle` if it is a member of the current set.
    /// Returns false (and leaves the selection alone) otherwise.
    pub fn select(&mut self, rectangle: &DetectedRectangle) -> bool {
        match self.rectangles.iter().position(|r| r == rectangle) {
            Some(idx) => {
                self.selection = Some(idx);
                true
            }
            None => false,
        }
    }

    /// Returns true if a selection was cleared
    pub fn clear_selection(&mut self) -> bool {
        self.selection.take().is_some()
    }

    /// Drop everything; returns true if a selection was cleared
    pub fn clear(&mut self) -> bool {
        self.rectangles.clear();
        self.debug_info = DetectionDebugInfo::default();
        self.clear_selection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessingStep;

    fn sample() -> DetectionOutput {
        DetectionOutput {
            rectangles: vec![
                DetectedRectangle::new(10, 10, 250, 350, 0.9),
                DetectedRectangle::new(0, 0, 100, 100, 0.4),
                DetectedRectangle::new(5, 5, 20, 10, 0.7),
            ],
            debug_info: DetectionDebugInfo {
                processing_steps: vec![
                    ProcessingStep::new(serde_json::json!("blur")),
                    ProcessingStep::new(serde_json::json!("edges")),
                ],
            },
        }
    }

    #[test]
    fn install_keeps_algorithm_order() {
        let mut store = ResultStore::default();
        store.install(sample());
        let confidences: Vec<f64> = store.rectangles().iter().map(|r| r.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.4, 0.7]);
        assert_eq!(store.debug_info().processing_steps.len(), 2);
        assert!(store.selection().is_none());
    }

    #[test]
    fn selects_only_members() {
        let mut store = ResultStore::default();
        store.install(sample());

        let member = store.rectangles()[1].clone();
        assert!(store.select(&member));
        assert_eq!(store.selection(), Some(&member));

        let foreign = DetectedRectangle::new(1, 2, 3, 4, 0.5);
        assert!(!store.select(&foreign));
        assert_eq!(store.selection(), Some(&member));
    }

    #[test]
    fn new_results_clear_selection() {
        let mut store = ResultStore::default();
        store.install(sample());
        let first = store.rectangles()[0].clone();
        store.select(&first);

        store.install(sample());
        assert!(store.selection().is_none());
    }

    #[test]
    fn clear_empties_everything() {
        let mut store = ResultStore::default();
        store.install(sample());
        let first = store.rectangles()[0].clone();
        store.select(&first);

        assert!(store.clear());
        assert!(store.rectangles().is_empty());
        assert!(store.debug_info().is_empty());
        assert!(store.selection().is_none());
        assert!(!store.clear());
    }
}
