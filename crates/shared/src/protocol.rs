use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{EntityId, Level};

/// Element of a read-endpoint response, in backend order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    pub id: EntityId,
    pub name: String,
}

/// Success body of a create endpoint. The backend also includes a
/// human-readable confirmation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedItem {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A create request for one hierarchy level. The JSON body shape follows
/// the level descriptor: `name`, plus the parent id under the level's
/// `parent_field` for non-root levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateItemRequest {
    pub level: Level,
    pub name: String,
    pub parent_id: Option<EntityId>,
}

impl CreateItemRequest {
    pub fn body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("name".to_string(), Value::String(self.name.clone()));
        if let (Some(field), Some(parent_id)) =
            (self.level.descriptor().parent_field, self.parent_id)
        {
            body.insert(field.to_string(), Value::from(parent_id.0));
        }
        body
    }
}
