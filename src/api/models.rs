use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/chat/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub project_id: String,
}

/// A connected repository as listed by `GET /api/v1/projects/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub repo_url: String,
    /// Set by the create endpoint, e.g. "Project already exists"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Kind of a file-system entry in the structure graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Folder => write!(f, "folder"),
            NodeKind::File => write!(f, "file"),
        }
    }
}

/// A node of `GET /api/v1/projects/{id}/structure`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "fileType", default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

impl ApiNode {
    pub fn folder(id: &str, name: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: NodeKind::Folder,
            name: name.to_string(),
            path: path.to_string(),
            file_type: None,
        }
    }

    /// A file node; the file type is derived from the name's extension.
    pub fn file(id: &str, name: &str, path: &str) -> Self {
        let file_type = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .filter(|ext| !ext.is_empty());
        Self {
            id: id.to_string(),
            kind: NodeKind::File,
            name: name.to_string(),
            path: path.to_string(),
            file_type,
        }
    }
}

/// A directed parent → child link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiLink {
    pub source: String,
    pub target: String,
}

impl ApiLink {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

/// Response of the structure endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructureResponse {
    #[serde(default)]
    pub nodes: Vec<ApiNode>,
    #[serde(default)]
    pub links: Vec<ApiLink>,
}
