//! Session data types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Identifier of a chat message as returned by the transport
pub type MessageId = i64;

/// Working state of a single menu, stored in `Data.menus[<menu id>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuData {
    /// Last message this menu rendered into, `None` until first render
    #[serde(default)]
    pub message_id: Option<MessageId>,
    /// Pagination cursor
    #[serde(default)]
    pub page: u32,
    /// Menu specific working value ("tmp data")
    #[serde(default)]
    pub data: Value,
}

impl MenuData {
    pub fn new(data: Value) -> Self {
        Self {
            message_id: None,
            page: 0,
            data,
        }
    }
}

/// Full persisted payload of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Data {
    /// One entry per menu activated this session, keyed by menu id
    #[serde(default)]
    pub menus: BTreeMap<String, MenuData>,
    /// Stack of visited menu ids, most recent last
    #[serde(default)]
    pub history: Vec<String>,
    /// Values committed by a finished ("done") menu flow
    #[serde(default)]
    pub saved_data: BTreeMap<String, Value>,
}

impl Data {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the menu on top of the history stack
    pub fn current_menu(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }

    /// Id of the menu right below the top of the history stack
    pub fn previous_menu(&self) -> Option<&str> {
        let len = self.history.len();
        if len < 2 {
            return None;
        }
        self.history.get(len - 2).map(String::as_str)
    }

    pub fn menu(&self, id: &str) -> Option<&MenuData> {
        self.menus.get(id)
    }

    pub fn menu_mut(&mut self, id: &str) -> Option<&mut MenuData> {
        self.menus.get_mut(id)
    }

    /// The in-progress value of a menu, `Null` if the menu was never activated
    pub fn tmp_data(&self, id: &str) -> &Value {
        self.menus.get(id).map_or(&Value::Null, |menu| &menu.data)
    }

    /// The committed value of a menu, if its flow ever finished
    pub fn saved(&self, id: &str) -> Option<&Value> {
        self.saved_data.get(id)
    }

    /// Copy the menu's tmp data into `saved_data`.
    ///
    /// Returns `false` if the menu has no tmp entry.
    pub fn commit(&mut self, id: &str) -> bool {
        match self.menus.get(id) {
            Some(menu) => {
                self.saved_data.insert(id.to_string(), menu.data.clone());
                true
            }
            None => false,
        }
    }

    /// Drop the menu's tmp entry, returning it
    pub fn discard(&mut self, id: &str) -> Option<MenuData> {
        self.menus.remove(id)
    }

    /// Apply the save policy of a history step to one menu.
    ///
    /// `Some(true)` commits then discards, `Some(false)` discards,
    /// `None` leaves the tmp data untouched.
    pub fn apply_save(&mut self, id: &str, save: Option<bool>) {
        match save {
            Some(true) => {
                self.commit(id);
                self.discard(id);
            }
            Some(false) => {
                self.discard(id);
            }
            None => {}
        }
    }
}
