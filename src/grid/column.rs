//! Column definitions and column splitting.

use std::fmt;
use std::ops::{Deref, DerefMut};

use super::entity::{Chain, EntityDefinition};
use super::repository::VirtualCellRepository;
use super::ColumnId;
use crate::error::{GridError, Result};

/// A column of the virtual grid.
#[derive(Debug, Clone, Default)]
pub struct ColumnDefinition {
    entity: EntityDefinition,
}

impl ColumnDefinition {
    pub fn with_size(size: i32) -> Self {
        Self {
            entity: EntityDefinition::with_size(size),
        }
    }

    pub fn filler(size: i32) -> Self {
        Self {
            entity: EntityDefinition::with_size(size).filler(),
        }
    }

    pub fn padding(size: i32) -> Self {
        Self {
            entity: EntityDefinition::with_size(size).padding(),
        }
    }
}

impl Deref for ColumnDefinition {
    type Target = EntityDefinition;

    fn deref(&self) -> &EntityDefinition {
        &self.entity
    }
}

impl DerefMut for ColumnDefinition {
    fn deref_mut(&mut self) -> &mut EntityDefinition {
        &mut self.entity
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[X={}][Width={}] controls={} floating={}",
            self.offset(),
            self.size,
            self.objects.len(),
            self.floating_objects.len()
        )
    }
}

impl Chain<ColumnDefinition> {
    /// Split a column in two at `at` pixels from its left edge.
    ///
    /// The new right part is linked directly after `id` and every cell whose
    /// span reached across the split point grows by one column. Returns the
    /// new column.
    pub fn split(
        &mut self,
        id: ColumnId,
        at: i32,
        cells: &mut VirtualCellRepository,
    ) -> Result<ColumnId> {
        let (size, is_filler, is_padding) = {
            let column = self.node(id)?;
            (column.size, column.is_filler, column.is_padding)
        };
        if at <= 0 || at >= size {
            return Err(GridError::SplitOutOfRange { at, size });
        }

        self.node_mut(id)?.size = at;
        let mut right = ColumnDefinition::with_size(size - at);
        right.is_filler = is_filler;
        right.is_padding = is_padding;
        let right = self.insert_after(id, right)?;

        // A cell k columns to the left crosses the split point when it
        // spans more than k columns.
        let mut reach: u32 = 1;
        let mut current = Some(id);
        while let Some(column_id) = current {
            for &cell_id in &self.node(column_id)?.objects {
                let cell = cells.cell_mut(cell_id)?;
                if cell.column_span >= reach {
                    cell.column_span += 1;
                }
            }
            reach += 1;
            current = self.previous(column_id);
        }

        Ok(right)
    }
}
