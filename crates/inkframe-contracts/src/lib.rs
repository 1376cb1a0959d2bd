pub mod aspect;
pub mod cast;
pub mod codec;
pub mod error;
pub mod models;
pub mod operation;
pub mod results;
pub mod schema;

pub use aspect::{lookup_profile, AspectRatio, AspectRatioProfile};
pub use cast::{CastMember, Character, ColorMode, Page};
pub use codec::{EncodedImage, InlineImage};
pub use error::{PayloadFault, StudioError, StudioResult};
pub use operation::{Operation, ResponseMode};
pub use results::{AnalysisResult, GeneratedContent, Panel, StorySuggestion};
pub use schema::{FieldSpec, FieldType, ObjectSchema};
