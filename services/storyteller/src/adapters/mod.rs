pub mod auth;
pub mod db;
pub mod story_llm;

pub use auth::PgAuthProvider;
pub use db::DbAdapter;
pub use story_llm::OpenAiStoryAdapter;
