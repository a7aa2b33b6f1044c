//! Immutable item definitions.
//!
//! The catalog is loaded once and only ever replaced wholesale: readers take
//! a snapshot through [`ArcSwap`] and keep using it even if a reload swaps a
//! new table in underneath them. Loaded rooms hold `Arc<ItemDefinition>`s
//! resolved at load time, so a reload affects rooms loaded afterwards.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Closed set of furniture behaviors, selected by a definition's tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    #[default]
    Default,
    Dice,
    Bottle,
    Wheel,
    Switch,
    Gate,
    Teleport,
    OneWayGate,
    Vendor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemFlags {
    pub can_stand_on: bool,
    pub can_sit_on: bool,
    pub can_lay_on: bool,
    pub can_stack_on: bool,
}

fn default_dimension() -> u8 {
    1
}

fn default_modes() -> u8 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: u32,
    pub sprite: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_dimension")]
    pub length: u8,
    #[serde(default = "default_dimension")]
    pub width: u8,
    #[serde(default)]
    pub stack_height: f64,
    #[serde(default)]
    pub colour: String,
    #[serde(default)]
    pub flags: ItemFlags,
    #[serde(default)]
    pub interaction: InteractionType,
    /// State count for switches and gates.
    #[serde(default = "default_modes")]
    pub modes: u8,
    /// Drinks handed out by vendors.
    #[serde(default)]
    pub vend_items: Vec<String>,
}

#[derive(Debug)]
pub struct ItemCatalog {
    definitions: ArcSwap<HashMap<u32, Arc<ItemDefinition>>>,
}

impl ItemCatalog {
    pub fn new(definitions: Vec<ItemDefinition>) -> Self {
        Self {
            definitions: ArcSwap::from_pointee(Self::index(definitions)),
        }
    }

    fn index(definitions: Vec<ItemDefinition>) -> HashMap<u32, Arc<ItemDefinition>> {
        definitions
            .into_iter()
            .map(|definition| (definition.id, Arc::new(definition)))
            .collect()
    }

    pub fn get(&self, id: u32) -> Option<Arc<ItemDefinition>> {
        self.definitions.load().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.definitions.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.load().is_empty()
    }

    /// Publishes a new table. In-flight readers finish on the old one.
    pub fn replace(&self, definitions: Vec<ItemDefinition>) {
        let table = Self::index(definitions);
        info!("📚 Item catalog swapped ({} definitions)", table.len());
        self.definitions.store(Arc::new(table));
    }
}
