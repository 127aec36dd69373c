pub mod loader;
pub mod merge;
pub mod path;
pub mod resolve;
pub mod schema;
pub mod settings;

pub use loader::load_document;
pub use merge::merge;
pub use path::{ListIndex, PathDisplay, PathSpec, Segment, MAX_LIST_INDEX};
pub use resolve::ReferenceResolver;
pub use schema::{default_provider, FileSchemaProvider, SchemaProvider, StaticSchemaProvider};
pub use settings::{EngineSettings, PathSyntax, ResolverOptions, SchemaLocations};
