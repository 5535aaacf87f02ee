pub mod lesson;
pub mod normalize;
pub mod status;
pub(crate) mod wire;

pub use lesson::{Lesson, LessonId, LessonTemplate, ScheduleSnapshot};
pub use normalize::{LessonCandidate, LessonLike, NaturalKey};
pub use status::{DisplayState, LessonStatus};
