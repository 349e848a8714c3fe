//! In-process adapters used when no database is configured, and by tests.

mod in_memory_study_group_repository;

pub use in_memory_study_group_repository::InMemoryStudyGroupRepository;
