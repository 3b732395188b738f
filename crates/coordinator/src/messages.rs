//! Runtime messages sent by the prompt and the settings page.

use serde::{Deserialize, Serialize};
use snauth_core_types::TabId;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeMessage {
    #[serde(rename_all = "camelCase")]
    UseAdminLogin { tab_id: TabId },
    #[serde(rename = "useOAuth", rename_all = "camelCase")]
    UseOAuth { tab_id: TabId },
    UpdateInstances { instances: Vec<String> },
}
