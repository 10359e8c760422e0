pub mod content;
pub mod response;
pub mod safety;

pub use content::{Content, ContentRole, Part, SystemInstruction};
pub use response::{
    strip_model_prefix, Candidate, CandidateContent, GenerateContentBody,
    GenerateContentResponse, ModelInfo, ModelListResponse, PromptFeedback, ResponsePart,
};
pub use safety::{SafetyPreset, SafetySetting, HARM_CATEGORIES};
