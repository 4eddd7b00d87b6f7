//! Filters accepted by the listing endpoints

use crate::query::QueryParams;

/// Filter for `GET /graphs`
#[derive(Debug, Clone, PartialEq)]
pub struct GraphFilter {
    pub limit: u32,
    pub offset: u32,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl Default for GraphFilter {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            category: None,
            tags: Vec::new(),
        }
    }
}

impl GraphFilter {
    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .push("limit", self.limit)
            .push("offset", self.offset)
            .push_opt("category", self.category.clone())
            .push_list("tags", self.tags.clone())
    }
}

/// Filter for `GET /workflows`
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowFilter {
    pub limit: u32,
    pub offset: u32,
    pub status: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub search: Option<String>,
}

impl Default for WorkflowFilter {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            status: "active".to_string(),
            category: None,
            tags: Vec::new(),
            search: None,
        }
    }
}

impl WorkflowFilter {
    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .push("limit", self.limit)
            .push("offset", self.offset)
            .push("status", self.status.clone())
            .push_opt("category", self.category.clone())
            .push_list("tags", self.tags.clone())
            .push_opt("search", self.search.clone())
    }
}

/// Filter for `GET /executions`
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionFilter {
    pub limit: u32,
    pub workflow_slug: Option<String>,
    pub status: Option<String>,
}

impl Default for ExecutionFilter {
    fn default() -> Self {
        Self {
            limit: 50,
            workflow_slug: None,
            status: None,
        }
    }
}

impl ExecutionFilter {
    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .push("limit", self.limit)
            .push_opt("workflow_slug", self.workflow_slug.clone())
            .push_opt("status", self.status.clone())
    }
}

/// Filter for `GET /executions/{id}/events`
#[derive(Debug, Clone, PartialEq)]
pub struct EventFilter {
    pub limit: u32,
    pub offset: u32,
    pub event_type: Option<String>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            event_type: None,
        }
    }
}

impl EventFilter {
    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .push("limit", self.limit)
            .push("offset", self.offset)
            .push_opt("event_type", self.event_type.clone())
    }
}

/// Filter for `GET /workflows/checkpoints`
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointFilter {
    pub limit: u32,
    pub offset: u32,
    pub workflow_slug: Option<String>,
    pub execution_id: Option<String>,
}

impl Default for CheckpointFilter {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            workflow_slug: None,
            execution_id: None,
        }
    }
}

impl CheckpointFilter {
    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .push("limit", self.limit)
            .push("offset", self.offset)
            .push_opt("workflow_slug", self.workflow_slug.clone())
            .push_opt("execution_id", self.execution_id.clone())
    }
}

/// Filter for `GET /service/workspaces/{name}/files`
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceFileFilter {
    pub workspace: String,
    pub limit: u32,
    pub directory: Option<String>,
    pub extension: Option<String>,
}

impl Default for WorkspaceFileFilter {
    fn default() -> Self {
        Self {
            workspace: "default".to_string(),
            limit: 100,
            directory: None,
            extension: None,
        }
    }
}

impl WorkspaceFileFilter {
    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .push("limit", self.limit)
            .push_opt("directory", self.directory.clone())
            .push_opt("extension", self.extension.clone())
    }
}

/// Window for `GET /workflows/{slug}/analytics`
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsQuery {
    pub granularity: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Default for AnalyticsQuery {
    fn default() -> Self {
        Self {
            granularity: "day".to_string(),
            start_date: None,
            end_date: None,
        }
    }
}

impl AnalyticsQuery {
    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .push("granularity", self.granularity.clone())
            .push_opt("start_date", self.start_date.clone())
            .push_opt("end_date", self.end_date.clone())
    }
}

/// Filter for `GET /metrics/step-executions`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepMetricsFilter {
    pub workflow_slug: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl StepMetricsFilter {
    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .push_opt("workflow_slug", self.workflow_slug.clone())
            .push_opt("start_date", self.start_date.clone())
            .push_opt("end_date", self.end_date.clone())
    }
}
