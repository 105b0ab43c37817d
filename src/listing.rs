use crate::app::EntityView;
use crate::domain::entity_class::EntityClass;
use crate::domain::state::StateId;
use crate::entity_id::normalize_entity_id;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityListFilter {
    pub include_all: bool,
    pub class: Option<EntityClass>,
    pub parent_id: Option<String>,
    pub status: Option<String>,
    pub query: Option<String>,
}

/// Entities sitting in a final state are hidden unless the caller asks for
/// everything or filters on a status explicitly.
pub fn apply_filters(entities: Vec<EntityView>, filter: &EntityListFilter) -> Vec<EntityView> {
    let normalized = NormalizedFilter::from(filter);
    if normalized.has_no_user_filters() && normalized.include_all {
        return entities;
    }

    entities
        .into_iter()
        .filter(|view| matches_filter(view, &normalized))
        .collect()
}

#[derive(Debug, Clone, Default)]
struct NormalizedFilter {
    include_all: bool,
    class: Option<EntityClass>,
    parent_id: Option<String>,
    status: Option<StateId>,
    status_text: Option<String>,
    query: Option<String>,
}

impl NormalizedFilter {
    fn has_no_user_filters(&self) -> bool {
        self.class.is_none()
            && self.parent_id.is_none()
            && self.status.is_none()
            && self.query.is_none()
    }
}

impl From<&EntityListFilter> for NormalizedFilter {
    fn from(value: &EntityListFilter) -> Self {
        Self {
            include_all: value.include_all,
            class: value.class,
            parent_id: value.parent_id.as_deref().and_then(normalize_entity_id),
            status: value.status.as_deref().and_then(StateId::parse),
            status_text: normalize_scalar(value.status.as_deref()),
            query: normalize_scalar(value.query.as_deref()),
        }
    }
}

fn matches_filter(view: &EntityView, filter: &NormalizedFilter) -> bool {
    if view.terminal && !filter.include_all && filter.status.is_none() {
        return false;
    }

    if let Some(class) = filter.class {
        if view.entity.class != class {
            return false;
        }
    }

    if let Some(parent_id) = filter.parent_id.as_deref() {
        if view.entity.parent_id.as_deref() != Some(parent_id) {
            return false;
        }
    }

    if let Some(status) = filter.status.as_ref() {
        let label = view.status_label.to_lowercase();
        if view.entity.status != *status && filter.status_text.as_deref() != Some(label.as_str())
        {
            return false;
        }
    }

    if let Some(query) = filter.query.as_deref() {
        return matches_query(view, query);
    }

    true
}

fn matches_query(view: &EntityView, query: &str) -> bool {
    view.entity.id.to_lowercase().contains(query)
        || view.entity.title.to_lowercase().contains(query)
        || view.status_label.to_lowercase().contains(query)
}

fn normalize_scalar(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[cfg(test)]
#[path = "listing_tests_ext.rs"]
mod tests;
