//! Shared HTTP adapter state.
//!
//! Handlers receive this via `actix_web::web::Data` so they depend only on
//! driving ports and can be tested with mocks.

use std::sync::Arc;

use crate::domain::ports::{StudyGroupCommand, StudyGroupQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub study_groups: Arc<dyn StudyGroupCommand>,
    pub study_groups_query: Arc<dyn StudyGroupQuery>,
}

impl HttpState {
    pub fn new(
        study_groups: Arc<dyn StudyGroupCommand>,
        study_groups_query: Arc<dyn StudyGroupQuery>,
    ) -> Self {
        Self {
            study_groups,
            study_groups_query,
        }
    }
}
