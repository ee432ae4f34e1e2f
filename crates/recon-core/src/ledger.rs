//! Conflict ledger: the per-conflict resolution state machine.
//!
//! ```text
//! unresolved ──resolve──▶ user_resolved
//!      │ ────auto──────▶ auto_resolved
//!      └────ignore─────▶ ignored
//! ```
//!
//! Every exit from `unresolved` is terminal. Nothing re-opens a conflict and
//! nothing deletes one; the caller persists the ledger as a whole.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use recon_model::{
    ConflictId, ConflictSeverity, MappingConflict, NewConflict, ReconError, ResolutionAction,
    ResolutionStatus, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LedgerFile")]
pub struct ConflictLedger {
    conflicts: Vec<MappingConflict>,
}

/// Persisted shape, checked before it becomes a ledger.
#[derive(Deserialize)]
struct LedgerFile {
    #[serde(default)]
    conflicts: Vec<MappingConflict>,
}

impl TryFrom<LedgerFile> for ConflictLedger {
    type Error = ReconError;

    fn try_from(file: LedgerFile) -> Result<Self> {
        let ledger = Self {
            conflicts: file.conflicts,
        };
        ledger.validate()?;
        Ok(ledger)
    }
}

impl ConflictLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn get(&self, id: ConflictId) -> Option<&MappingConflict> {
        self.conflicts.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingConflict> {
        self.conflicts.iter()
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &MappingConflict> {
        self.conflicts.iter().filter(|c| c.is_unresolved())
    }

    /// All conflicts, most severe first, then oldest first.
    pub fn triage(&self) -> Vec<&MappingConflict> {
        let mut ordered: Vec<&MappingConflict> = self.conflicts.iter().collect();
        ordered.sort_by(|a, b| a.triage_cmp(b));
        ordered
    }

    /// Unresolved conflict counts per severity.
    pub fn open_by_severity(&self) -> BTreeMap<ConflictSeverity, usize> {
        let mut counts = BTreeMap::new();
        for conflict in self.unresolved() {
            *counts.entry(conflict.severity).or_insert(0) += 1;
        }
        counts
    }

    /// Check that every conflict id is unique. Lookups by id assume it.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for conflict in &self.conflicts {
            if !seen.insert(conflict.id) {
                return Err(ReconError::InvalidInput(format!(
                    "duplicate conflict id {} in ledger",
                    conflict.id
                )));
            }
        }
        Ok(())
    }

    /// Open a conflict, or return the unresolved one already recorded for the
    /// same problem.
    pub fn open_conflict(&mut self, request: NewConflict) -> Result<&MappingConflict> {
        if request.description.trim().is_empty() {
            return Err(ReconError::InvalidInput(
                "conflict description must not be empty".to_string(),
            ));
        }
        let key = request.key();
        if let Some(index) = self
            .conflicts
            .iter()
            .position(|c| c.is_unresolved() && c.key == key)
        {
            debug!(
                id = %self.conflicts[index].id,
                conflict_type = request.conflict_type.as_str(),
                "conflict already open"
            );
            return Ok(&self.conflicts[index]);
        }

        let id = self.next_id()?;
        let conflict = MappingConflict::open(id, request);
        info!(
            %id,
            conflict_type = conflict.conflict_type.as_str(),
            severity = conflict.severity.as_str(),
            "opened conflict"
        );
        self.conflicts.push(conflict);
        let index = self.conflicts.len() - 1;
        Ok(&self.conflicts[index])
    }

    /// Record a human resolution. `action` must name a known resolution
    /// action and `notes` is the mandatory audit note.
    pub fn resolve_conflict(
        &mut self,
        id: ConflictId,
        action: &str,
        details: Option<serde_json::Value>,
        notes: &str,
    ) -> Result<&MappingConflict> {
        self.resolve_conflict_by(id, None, action, details, notes)
    }

    /// Same as [`resolve_conflict`](Self::resolve_conflict), recording who resolved it.
    pub fn resolve_conflict_by(
        &mut self,
        id: ConflictId,
        resolved_by: Option<&str>,
        action: &str,
        details: Option<serde_json::Value>,
        notes: &str,
    ) -> Result<&MappingConflict> {
        let index = self.open_index(id, ResolutionStatus::UserResolved)?;
        let action: ResolutionAction = action.parse()?;
        let notes = required_note(notes, "resolution notes")?;
        let conflict = &mut self.conflicts[index];
        conflict.resolution_status = ResolutionStatus::UserResolved;
        conflict.resolution_action = Some(action);
        conflict.resolution_details = details;
        conflict.user_notes = Some(notes);
        conflict.resolved_by = resolved_by.map(str::to_string);
        conflict.resolved_at = Some(Utc::now());
        info!(%id, action = action.as_str(), "conflict resolved by user");
        Ok(&self.conflicts[index])
    }

    /// Resolve without human input. Callers decide which conflicts qualify,
    /// typically through an [`AutoResolvePolicy`](crate::AutoResolvePolicy).
    pub fn auto_resolve(
        &mut self,
        id: ConflictId,
        action: ResolutionAction,
        details: Option<serde_json::Value>,
        reason: &str,
    ) -> Result<&MappingConflict> {
        let index = self.open_index(id, ResolutionStatus::AutoResolved)?;
        let reason = required_note(reason, "auto-resolution reason")?;
        let conflict = &mut self.conflicts[index];
        conflict.resolution_status = ResolutionStatus::AutoResolved;
        conflict.resolution_action = Some(action);
        conflict.resolution_details = details;
        conflict.user_notes = Some(reason);
        conflict.resolved_at = Some(Utc::now());
        info!(%id, action = action.as_str(), "conflict auto-resolved");
        Ok(&self.conflicts[index])
    }

    /// Defer a conflict explicitly.
    pub fn ignore(&mut self, id: ConflictId, reason: &str) -> Result<&MappingConflict> {
        let index = self.open_index(id, ResolutionStatus::Ignored)?;
        let reason = required_note(reason, "ignore reason")?;
        let conflict = &mut self.conflicts[index];
        conflict.resolution_status = ResolutionStatus::Ignored;
        conflict.user_notes = Some(reason);
        conflict.resolved_at = Some(Utc::now());
        info!(%id, "conflict ignored");
        Ok(&self.conflicts[index])
    }

    fn next_id(&self) -> Result<ConflictId> {
        match self.conflicts.iter().map(|c| c.id).max() {
            None => Ok(ConflictId::new(1)),
            Some(last) => last.checked_next().ok_or_else(|| {
                ReconError::InvalidInput(format!("conflict ids exhausted after {last}"))
            }),
        }
    }

    fn open_index(&self, id: ConflictId, to: ResolutionStatus) -> Result<usize> {
        let index = self
            .conflicts
            .iter()
            .position(|c| c.id == id)
            .ok_or(ReconError::ConflictNotFound(id))?;
        let status = self.conflicts[index].resolution_status;
        if status.is_terminal() {
            return Err(ReconError::InvalidTransition {
                entity: "conflict",
                from: status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(index)
    }
}

fn required_note(note: &str, what: &str) -> Result<String> {
    let trimmed = note.trim();
    if trimmed.is_empty() {
        return Err(ReconError::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use recon_model::{ConflictType, FieldRef};

    use super::*;

    fn duplicate(field: &str) -> NewConflict {
        NewConflict::new(
            ConflictType::DuplicateMapping,
            ConflictSeverity::Error,
            format!("two mappings target {field}"),
        )
        .with_target(FieldRef::field("Item", field))
    }

    #[test]
    fn ids_are_sequential() {
        let mut ledger = ConflictLedger::new();
        let first = ledger.open_conflict(duplicate("A")).unwrap().id;
        let second = ledger.open_conflict(duplicate("B")).unwrap().id;
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);
    }

    #[test]
    fn same_problem_is_not_opened_twice() {
        let mut ledger = ConflictLedger::new();
        let first = ledger.open_conflict(duplicate("Code")).unwrap().id;
        let again = ledger.open_conflict(duplicate("code")).unwrap().id;
        assert_eq!(first, again);
        assert_eq!(ledger.len(), 1);

        ledger.ignore(first, "handled in phase two").unwrap();
        let reopened = ledger.open_conflict(duplicate("Code")).unwrap().id;
        assert_ne!(reopened, first);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn blank_notes_rejected_without_state_change() {
        let mut ledger = ConflictLedger::new();
        let id = ledger.open_conflict(duplicate("Code")).unwrap().id;
        let err = ledger
            .resolve_conflict(id, "skip_field", None, "   ")
            .unwrap_err();
        assert!(matches!(err, ReconError::InvalidInput(_)));
        assert!(ledger.get(id).is_some_and(MappingConflict::is_unresolved));
    }

    #[test]
    fn exhausted_ids_are_an_error() {
        let mut ledger = ConflictLedger::new();
        ledger.open_conflict(duplicate("Code")).unwrap();
        let mut value = serde_json::to_value(&ledger).unwrap();
        value["conflicts"][0]["id"] = serde_json::json!(u64::MAX);
        let mut ledger: ConflictLedger = serde_json::from_value(value).unwrap();

        let err = ledger.open_conflict(duplicate("Sku")).unwrap_err();
        assert!(matches!(err, ReconError::InvalidInput(ref m) if m.contains("exhausted")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn duplicate_ids_are_rejected_on_load() {
        let mut ledger = ConflictLedger::new();
        ledger.open_conflict(duplicate("Code")).unwrap();
        ledger.open_conflict(duplicate("Sku")).unwrap();
        let mut value = serde_json::to_value(&ledger).unwrap();
        value["conflicts"][1]["id"] = serde_json::json!(1);

        let err = serde_json::from_value::<ConflictLedger>(value).unwrap_err();
        assert!(err.to_string().contains("duplicate conflict id 1"), "{err}");
    }
}
