use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct KeysQuery {
    pub domain: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct KeyRequest {
    pub domain: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct KeyRequestResult {
    pub requested: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct StatusRequest {
    pub key: String,
    pub zone: String,
    pub endpoint: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct EndpointResult {
    pub endpoint: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(super) enum Operation {
    Add,
    Delete,
    #[serde(rename = "delete_rrset")]
    DeleteRRset,
    DeleteName,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(super) struct UpdateOperation {
    pub op: Operation,
    pub rr: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(super) struct UpdateRequest {
    pub key: String,
    pub zone: String,
    pub endpoint: String,
    #[serde(default = "signed_by_default")]
    pub signed: bool,
    pub operations: Vec<UpdateOperation>,
}

fn signed_by_default() -> bool {
    true
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct UpdateResult {
    pub zone: String,
    pub operations: usize,
    pub signed: bool,
}
