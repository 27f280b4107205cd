//! Reference vocabularies (allocated units, construction units, allocation
//! waves). Projects refer to them by name only.

/// Maximum length of a vocabulary entry name.
pub const MAX_NAME_LENGTH: usize = 200;

/// The three independent vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    AllocatedUnit,
    ConstructionUnit,
    AllocationWave,
}

impl ReferenceKind {
    /// Backing table name. Only ever interpolated from this closed set.
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::AllocatedUnit => "allocated_units",
            ReferenceKind::ConstructionUnit => "construction_units",
            ReferenceKind::AllocationWave => "allocation_waves",
        }
    }

    /// Entity name used in error messages.
    pub fn entity(self) -> &'static str {
        match self {
            ReferenceKind::AllocatedUnit => "AllocatedUnit",
            ReferenceKind::ConstructionUnit => "ConstructionUnit",
            ReferenceKind::AllocationWave => "AllocationWave",
        }
    }
}

/// Trim and validate a vocabulary entry name.
pub fn normalize_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("name is required".to_string());
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        ));
    }
    Ok(trimmed.to_string())
}
