//! Per-type serial numbers.
//!
//! Within a project type serial numbers form a dense `1..=N` sequence. New
//! projects take `max + 1`; after a deletion the remaining projects are
//! renumbered by their current order. The caller is responsible for holding
//! the per-type lock while computing and applying these.

use serde::Serialize;

use crate::project::ProjectType;
use crate::types::DbId;

/// Serial for the next project of a type, given the current maximum.
pub fn next_serial(current_max: Option<i32>) -> i32 {
    current_max.map_or(1, |max| max + 1)
}

/// A serial number to write back during renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialAssignment {
    pub project_id: DbId,
    pub serial_number: i32,
}

/// Compute the renumbering for projects of one type.
///
/// `ordered` must be sorted by current serial ascending. Each project gets
/// its 1-based position; only assignments that change a value are returned.
pub fn renumber(ordered: &[(DbId, i32)]) -> Vec<SerialAssignment> {
    ordered
        .iter()
        .zip(1..)
        .filter(|((_, current), position)| current != position)
        .map(|((project_id, _), position)| SerialAssignment {
            project_id: *project_id,
            serial_number: position,
        })
        .collect()
}

/// True when `serials`, in any order, are exactly `1..=len`.
pub fn is_dense(serials: &[i32]) -> bool {
    let mut sorted = serials.to_vec();
    sorted.sort_unstable();
    sorted.iter().zip(1..).all(|(s, expected)| *s == expected)
}

/// Wire form of a project's serial: exactly one of the two fields is set,
/// chosen by project type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialNumbers {
    pub category_serial_number: Option<i32>,
    pub minor_repair_serial_number: Option<i32>,
}

impl SerialNumbers {
    pub fn for_type(project_type: ProjectType, serial_number: i32) -> Self {
        match project_type {
            ProjectType::Category => Self {
                category_serial_number: Some(serial_number),
                minor_repair_serial_number: None,
            },
            ProjectType::MinorRepair => Self {
                category_serial_number: None,
                minor_repair_serial_number: Some(serial_number),
            },
        }
    }
}
