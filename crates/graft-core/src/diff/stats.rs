use crate::diff::viewer::DiffChange;

/// Added/removed line counts for a hunk list. Recomputed from the list
/// alone, so rendering is idempotent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
}

impl DiffStats {
    pub fn from_changes(changes: &[DiffChange]) -> Self {
        let mut stats = Self::default();
        for change in changes {
            stats.added += change.inserted_lines();
            stats.removed += change.deleted_lines();
        }
        stats
    }

    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }

    /// Compact label shown next to the file link, e.g. `+12 -3`.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut label = String::new();
        if self.added > 0 {
            label.push_str(&format!("+{}", self.added));
        }
        if self.removed > 0 {
            if !label.is_empty() {
                label.push(' ');
            }
            label.push_str(&format!("-{}", self.removed));
        }
        label
    }
}
