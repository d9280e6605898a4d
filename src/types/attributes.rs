use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Kind of a bound control, used by writers to pick a renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlKind {
    #[default]
    Text,
    Compute,
    Button,
    Checkbox,
    RadioButton,
    Picture,
    Line,
    Shape,
    /// Rich text, graphs, crosstabs and similar controls laid out externally
    External,
}

/// Per-control data bound for one input row.
///
/// Two attribute sets compare equal when everything a writer would render
/// is the same; the emitter relies on this for group-break detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlAttributes {
    #[serde(default)]
    pub kind: ControlKind,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub floating: bool,
    /// Display value, already formatted by the data source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn default_visible() -> bool {
    true
}

impl Default for ControlAttributes {
    fn default() -> Self {
        Self {
            kind: ControlKind::Text,
            visible: true,
            floating: false,
            text: None,
        }
    }
}

impl ControlAttributes {
    /// Visible text attributes with the given value.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Control name to attributes, for one input row.
pub type AttributeMap = HashMap<String, ControlAttributes>;
