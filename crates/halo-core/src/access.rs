//! Per-region access modes declared by tasks.
//!
//! A task declares, for every field it touches, how it accesses each of
//! the three region classes of its color: exclusive, shared and ghost.
//! The synchronization layer derives its read/write phases from these
//! declarations before the task runs.

use crate::id::FieldId;

/// How a task accesses one region class of a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Not accessed.
    #[default]
    None,
    /// Read only.
    Read,
    /// Write only (previous contents are discarded).
    Write,
    /// Read and write.
    ReadWrite,
}

impl AccessMode {
    /// Whether this mode reads existing data.
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Whether this mode modifies data.
    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    /// The weakest mode covering both `self` and `other`.
    pub fn merge(self, other: Self) -> Self {
        match (self.reads() || other.reads(), self.writes() || other.writes()) {
            (false, false) => Self::None,
            (true, false) => Self::Read,
            (false, true) => Self::Write,
            (true, true) => Self::ReadWrite,
        }
    }
}

/// Access modes for the exclusive, shared and ghost regions of one field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Privileges {
    /// Access to cells no other color sees.
    pub exclusive: AccessMode,
    /// Access to owned cells mirrored by neighbors.
    pub shared: AccessMode,
    /// Access to the local mirror of neighbors' shared cells.
    pub ghost: AccessMode,
}

impl Privileges {
    /// Build privileges from the three per-region modes.
    pub fn new(exclusive: AccessMode, shared: AccessMode, ghost: AccessMode) -> Self {
        Self {
            exclusive,
            shared,
            ghost,
        }
    }

    /// Read every region, including ghosts. The usual stencil input.
    pub fn read_all() -> Self {
        Self::new(AccessMode::Read, AccessMode::Read, AccessMode::Read)
    }

    /// Read-write on owned cells, ghosts untouched. The usual stencil output.
    pub fn write_owned() -> Self {
        Self::new(AccessMode::ReadWrite, AccessMode::ReadWrite, AccessMode::None)
    }

    /// Combine two declarations on the same field region by region.
    pub fn merge(self, other: Self) -> Self {
        Self::new(
            self.exclusive.merge(other.exclusive),
            self.shared.merge(other.shared),
            self.ghost.merge(other.ghost),
        )
    }

    /// Whether the task touches ghost data at all.
    pub fn touches_ghost(&self) -> bool {
        self.ghost != AccessMode::None
    }

    /// Whether the task modifies the shared region.
    pub fn writes_shared(&self) -> bool {
        self.shared.writes()
    }
}

/// A task's declared access to one field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldAccess {
    /// The accessed field.
    pub field: FieldId,
    /// Per-region access modes.
    pub privileges: Privileges,
}

impl FieldAccess {
    /// Declare an access.
    pub fn new(field: FieldId, privileges: Privileges) -> Self {
        Self { field, privileges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_read_write_flags() {
        assert!(!AccessMode::None.reads());
        assert!(!AccessMode::None.writes());
        assert!(AccessMode::Read.reads());
        assert!(!AccessMode::Read.writes());
        assert!(!AccessMode::Write.reads());
        assert!(AccessMode::Write.writes());
        assert!(AccessMode::ReadWrite.reads());
        assert!(AccessMode::ReadWrite.writes());
    }

    #[test]
    fn merge_keeps_every_read_and_write() {
        use AccessMode::*;
        assert_eq!(None.merge(None), None);
        assert_eq!(None.merge(Read), Read);
        assert_eq!(Read.merge(Read), Read);
        assert_eq!(Write.merge(Read), ReadWrite);
        assert_eq!(Read.merge(Write), ReadWrite);
        assert_eq!(Write.merge(None), Write);
        assert_eq!(ReadWrite.merge(Read), ReadWrite);
    }

    #[test]
    fn merged_output_and_input_read_ghosts_and_write_shared() {
        let p = Privileges::write_owned().merge(Privileges::read_all());
        assert_eq!(
            p,
            Privileges::new(AccessMode::ReadWrite, AccessMode::ReadWrite, AccessMode::Read)
        );
        assert!(p.writes_shared());
        assert!(p.ghost.reads());
        assert_eq!(p.merge(p), p);
    }

    #[test]
    fn stencil_presets() {
        let input = Privileges::read_all();
        assert!(input.touches_ghost());
        assert!(!input.writes_shared());

        let output = Privileges::write_owned();
        assert!(!output.touches_ghost());
        assert!(output.writes_shared());
    }

    #[test]
    fn default_is_no_access() {
        let p = Privileges::default();
        assert_eq!(p.exclusive, AccessMode::None);
        assert_eq!(p.shared, AccessMode::None);
        assert_eq!(p.ghost, AccessMode::None);
    }
}
