//! Install milestone domain types
//!
//! A milestone is a fragment of text the install wizard prints when it
//! reaches a checkpoint. The set is ordered; the last milestone marks a
//! finished install.

use serde::{Deserialize, Serialize};

/// One textual checkpoint of the install wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Fragment searched for in the driver output
    pub marker: String,
    /// Human-readable progress label
    pub label: String,
    pub complete: bool,
}

impl Milestone {
    pub fn new(marker: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            label: label.into(),
            complete: false,
        }
    }

    /// Marks the milestone complete
    ///
    /// Returns `true` only on the first call.
    pub fn mark_complete(&mut self) -> bool {
        if self.complete {
            return false;
        }
        self.complete = true;
        true
    }
}

/// The ordered milestones of a silent install
pub fn install_milestones() -> Vec<Milestone> {
    vec![
        Milestone::new(
            "Creating Sugar configuration file (config.php)",
            "Creating Sugar Configuration File...",
        ),
        Milestone::new(
            "Creating Sugar application tables, audit tables and relationship metadata",
            "Creating application/audit tables and relationship data...",
        ),
        Milestone::new("Creating the database", "Creating the database..."),
        Milestone::new("Creating default Sugar data", "Creating default Sugar data..."),
        Milestone::new(
            "Updating license information...",
            "Updating license information...",
        ),
        Milestone::new("Creating default users...", "Creating default users..."),
        Milestone::new("Creating default reports...", "Creating default reports..."),
        Milestone::new(
            "Creating default scheduler jobs...",
            "Creating default scheduler jobs...",
        ),
        Milestone::new(
            "Populating the database tables with demo data",
            "Inserting demo data...",
        ),
    ]
}
