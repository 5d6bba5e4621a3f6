pub mod auth;
pub mod domain;
pub mod error;
pub mod generation;
pub mod ports;
pub mod stories;

pub use domain::{
    GeneratedStory, Identity, MissingField, NewStory, SerializedStoredStory, SerializedStory,
    StoredStory, StoryParameters, StoryRecord,
};
pub use error::{AuthError, AuthErrorCode, GenerationFailure, PersistenceFailure, PersistenceOp};
pub use generation::StoryOutcome;
pub use ports::{
    AuthProvider, AuthProviderError, PortError, PortResult, ProviderResult, StoryModel,
    StoryRequest, StoryStore,
};
