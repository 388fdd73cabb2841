pub mod repository;
pub mod sqlite;

pub use repository::{
    CachedLesson, InMemoryRepository, LessonCacheRepository, ProgressRepository, Storage,
    StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
