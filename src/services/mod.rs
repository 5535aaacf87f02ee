pub mod lesson_service;

pub use lesson_service::LessonService;
