use sugarbuild_core::domain::milestone::{Milestone, install_milestones};

/// Observes install driver output
pub trait ProgressObserver: Send {
    /// Feeds a chunk of driver output
    ///
    /// # Returns
    /// Labels of the milestones this chunk completed, in order
    fn observe(&mut self, text: &str) -> Vec<String>;

    /// Whether the final milestone has been reached
    fn is_finished(&self) -> bool;

    /// Marks every milestone incomplete again
    fn reset(&mut self);

    /// `(completed, total)` milestone counts
    fn progress(&self) -> (usize, usize);
}

/// Tracks the silent install milestones
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    milestones: Vec<Milestone>,
}

impl MilestoneTracker {
    pub fn new() -> Self {
        Self::with_milestones(install_milestones())
    }

    pub fn with_milestones(milestones: Vec<Milestone>) -> Self {
        Self { milestones }
    }
}

impl Default for MilestoneTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for MilestoneTracker {
    fn observe(&mut self, text: &str) -> Vec<String> {
        self.milestones
            .iter_mut()
            .filter(|m| !m.complete && text.contains(&m.marker))
            .filter_map(|m| m.mark_complete().then(|| m.label.clone()))
            .collect()
    }

    fn is_finished(&self) -> bool {
        self.milestones.last().is_some_and(|m| m.complete)
    }

    fn reset(&mut self) {
        for milestone in &mut self.milestones {
            milestone.complete = false;
        }
    }

    fn progress(&self) -> (usize, usize) {
        let done = self.milestones.iter().filter(|m| m.complete).count();
        (done, self.milestones.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> MilestoneTracker {
        MilestoneTracker::with_milestones(vec![
            Milestone::new("step one", "One"),
            Milestone::new("step two", "Two"),
            Milestone::new("all done", "Done"),
        ])
    }

    #[test]
    fn test_each_milestone_reported_once() {
        let mut tracker = small();

        assert_eq!(tracker.observe("... step one ..."), vec!["One"]);
        assert!(tracker.observe("step one again").is_empty());
        assert_eq!(tracker.progress(), (1, 3));
        assert!(!tracker.is_finished());
    }

    #[test]
    fn test_one_chunk_can_complete_several() {
        let mut tracker = small();

        let labels = tracker.observe("step two\nstep one\n");
        assert_eq!(labels, vec!["One", "Two"]);
    }

    #[test]
    fn test_finished_only_on_final_marker() {
        let mut tracker = small();

        tracker.observe("step one step two");
        assert!(!tracker.is_finished());
        tracker.observe("all done");
        assert!(tracker.is_finished());
    }

    #[test]
    fn test_final_marker_out_of_order_still_finishes() {
        let mut tracker = small();
        assert_eq!(tracker.observe("all done"), vec!["Done"]);
        assert!(tracker.is_finished());
        assert_eq!(tracker.progress(), (1, 3));
    }

    #[test]
    fn test_reset() {
        let mut tracker = MilestoneTracker::new();
        tracker.observe("Inserting nothing; Populating the database tables with demo data");
        assert!(tracker.is_finished());

        tracker.reset();
        assert!(!tracker.is_finished());
        assert_eq!(tracker.progress(), (0, 9));
    }
}
