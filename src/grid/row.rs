use std::fmt;
use std::ops::{Deref, DerefMut};

use super::entity::EntityDefinition;

/// A row of the virtual grid, tagged with the band it belongs to.
#[derive(Debug, Clone, Default)]
pub struct RowDefinition {
    entity: EntityDefinition,
    pub band_name: Option<String>,
}

impl RowDefinition {
    pub fn with_size(size: i32) -> Self {
        Self {
            entity: EntityDefinition::with_size(size),
            band_name: None,
        }
    }

    pub fn in_band(mut self, band: impl Into<String>) -> Self {
        self.band_name = Some(band.into());
        self
    }

    pub fn band(&self) -> Option<&str> {
        self.band_name.as_deref()
    }

    pub fn belongs_to(&self, band: &str) -> bool {
        self.band_name.as_deref() == Some(band)
    }
}

impl Deref for RowDefinition {
    type Target = EntityDefinition;

    fn deref(&self) -> &EntityDefinition {
        &self.entity
    }
}

impl DerefMut for RowDefinition {
    fn deref_mut(&mut self) -> &mut EntityDefinition {
        &mut self.entity
    }
}

impl fmt::Display for RowDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Y={}][Height={}][Band={}] controls={} floating={}",
            self.offset(),
            self.size,
            self.band().unwrap_or("-"),
            self.objects.len(),
            self.floating_objects.len()
        )?;
        if self.is_filler {
            f.write_str(" filler")?;
        }
        if self.is_padding {
            f.write_str(" padding")?;
        }
        Ok(())
    }
}
